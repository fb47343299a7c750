//! Network namespaces (`spec.md` §4.8 "Namespace model"): each owns its
//! own interface table and routing table.

use {
    crate::{
        error::{Error, Result},
        interface::{Interface, Kind},
        route::RoutingTable,
    },
    std::collections::HashMap,
};

/// Name of the namespace created automatically and never deletable.
pub const DEFAULT: &str = "default";

/// One network namespace: an interface table plus a routing table.
pub struct Namespace
{
    pub interfaces: HashMap<String, Interface>,
    pub routes: RoutingTable,
}

impl Namespace
{
    fn empty() -> Self
    {
        Self { interfaces: HashMap::new(), routes: RoutingTable::new() }
    }

    fn with_loopback(name: &str) -> Self
    {
        let mut ns = Self::empty();
        let lo = Interface::loopback(name);
        ns.interfaces.insert(lo.name.clone(), lo);
        ns
    }
}

/// The whole namespace table, always containing at least [`DEFAULT`]
/// (`spec.md` §4.8: "The stack owns at least a `default` namespace").
pub struct Namespaces
{
    table: HashMap<String, Namespace>,
}

impl Namespaces
{
    pub fn new() -> Self
    {
        let mut table = HashMap::new();
        table.insert(DEFAULT.to_string(), Namespace::with_loopback(DEFAULT));
        Self { table }
    }

    pub fn add(&mut self, name: &str) -> Result<()>
    {
        if self.table.contains_key(name) {
            return Err(Error::NamespaceExists(name.to_string()));
        }
        self.table.insert(name.to_string(), Namespace::with_loopback(name));
        log::debug!("netns add {name}");
        Ok(())
    }

    pub fn del(&mut self, name: &str) -> Result<()>
    {
        if name == DEFAULT {
            return Err(Error::CannotDeleteDefault);
        }
        self.table.remove(name).ok_or_else(|| Error::NoSuchNamespace(name.to_string()))?;
        log::debug!("netns del {name}");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Namespace>
    {
        self.table.get(name).ok_or_else(|| Error::NoSuchNamespace(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Namespace>
    {
        self.table.get_mut(name).ok_or_else(|| Error::NoSuchNamespace(name.to_string()))
    }

    pub fn names(&self) -> Vec<String>
    {
        let mut names: Vec<String> = self.table.keys().cloned().collect();
        names.sort();
        names
    }

    /// Create a `veth` pair in the default namespace (`spec.md` §4.8:
    /// "created in the default namespace").
    pub fn add_veth_pair(&mut self, a: &str, b: &str) -> Result<()>
    {
        let default = self.table.get_mut(DEFAULT).expect("default namespace always exists");
        if default.interfaces.contains_key(a) {
            return Err(Error::InterfaceExists(a.to_string()));
        }
        if default.interfaces.contains_key(b) {
            return Err(Error::InterfaceExists(b.to_string()));
        }
        default.interfaces.insert(a.to_string(), Interface::veth(a, b, DEFAULT));
        default.interfaces.insert(b.to_string(), Interface::veth(b, a, DEFAULT));
        Ok(())
    }

    /// `link set NAME netns NS`: move one half of a veth pair into
    /// another namespace. Moving one half does not move its peer
    /// (`spec.md` §4.8: "Moving half of the pair only moves that half").
    pub fn move_interface(&mut self, iface_name: &str, from_ns: &str, to_ns: &str) -> Result<()>
    {
        if !self.table.contains_key(to_ns) {
            return Err(Error::NoSuchNamespace(to_ns.to_string()));
        }
        let from = self.get_mut(from_ns)?;
        let mut iface = from.interfaces.remove(iface_name).ok_or_else(|| Error::NoSuchInterface(iface_name.to_string()))?;
        iface.namespace = to_ns.to_string();
        self.table.get_mut(to_ns).expect("checked above").interfaces.insert(iface_name.to_string(), iface);
        Ok(())
    }

    /// `link set NAME master BR`: attach an interface as a bridge port.
    pub fn attach_to_bridge(&mut self, ns: &str, iface_name: &str, bridge_name: &str) -> Result<()>
    {
        let namespace = self.get_mut(ns)?;
        if !namespace.interfaces.contains_key(iface_name) {
            return Err(Error::NoSuchInterface(iface_name.to_string()));
        }
        let bridge = namespace.interfaces.get_mut(bridge_name).ok_or_else(|| Error::NoSuchInterface(bridge_name.to_string()))?;
        let Kind::Bridge { ports, .. } = &mut bridge.kind else { return Err(Error::NotABridge(bridge_name.to_string())) };
        if !ports.iter().any(|p| p == iface_name) {
            ports.push(iface_name.to_string());
        }
        Ok(())
    }
}

impl Default for Namespaces
{
    fn default() -> Self
    {
        Self::new()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_namespace_exists_with_loopback()
    {
        let namespaces = Namespaces::new();
        let default = namespaces.get(DEFAULT).unwrap();
        assert!(default.interfaces.contains_key("lo"));
    }

    #[test]
    fn cannot_delete_default_namespace()
    {
        let mut namespaces = Namespaces::new();
        assert_eq!(namespaces.del(DEFAULT), Err(Error::CannotDeleteDefault));
    }

    #[test]
    fn adding_duplicate_namespace_fails()
    {
        let mut namespaces = Namespaces::new();
        namespaces.add("ns1").unwrap();
        assert_eq!(namespaces.add("ns1"), Err(Error::NamespaceExists("ns1".to_string())));
    }

    #[test]
    fn moving_one_veth_half_leaves_its_peer_behind()
    {
        let mut namespaces = Namespaces::new();
        namespaces.add("ns1").unwrap();
        namespaces.add_veth_pair("veth0", "veth1").unwrap();
        namespaces.move_interface("veth0", DEFAULT, "ns1").unwrap();
        assert!(namespaces.get("ns1").unwrap().interfaces.contains_key("veth0"));
        assert!(namespaces.get(DEFAULT).unwrap().interfaces.contains_key("veth1"));
        assert!(!namespaces.get(DEFAULT).unwrap().interfaces.contains_key("veth0"));
    }

    #[test]
    fn attaching_to_non_bridge_fails()
    {
        let mut namespaces = Namespaces::new();
        assert_eq!(namespaces.attach_to_bridge(DEFAULT, "lo", "lo"), Err(Error::NotABridge("lo".to_string())));
    }
}
