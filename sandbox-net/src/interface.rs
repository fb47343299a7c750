//! Network interfaces: loopback, veth pairs, bridges, and opaque tunnels
//! (`spec.md` §4.8 "Interfaces"), modeled as a tagged enum per the
//! "one of a few shapes known up front" rule (`spec.md` §9) rather than a
//! trait-object hierarchy.

use std::collections::HashMap;

/// A MAC address, six raw bytes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MacAddr(pub [u8; 6]);

impl std::fmt::Display for MacAddr
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Cumulative interface counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats
{
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// What kind of interface this is (`spec.md` §4.8).
#[derive(Clone, Debug)]
pub enum Kind
{
    /// The loopback interface every namespace starts with.
    Loopback,
    /// One half of a `veth` pair; `peer` names the other half.
    Veth
    {
        peer: String,
    },
    /// A software switch: a MAC-learning forwarding table over its
    /// member ports.
    Bridge
    {
        ports: Vec<String>,
        /// Source-address-learned MAC → port name.
        forwarding_table: HashMap<MacAddr, String>,
    },
    /// An opaque transport; concrete implementations are out of scope
    /// (`spec.md` §4.8), but it exposes the same interface abstraction.
    Tunnel,
}

/// One network interface (`spec.md` §3.1).
#[derive(Clone, Debug)]
pub struct Interface
{
    pub name: String,
    pub kind: Kind,
    pub up: bool,
    pub mtu: u32,
    pub addresses: Vec<crate::addr::Cidr>,
    pub stats: Stats,
    /// The namespace this interface currently lives in.
    pub namespace: String,
}

impl Interface
{
    pub fn loopback(namespace: impl Into<String>) -> Self
    {
        Self {
            name: "lo".to_string(),
            kind: Kind::Loopback,
            up: true,
            mtu: 65536,
            addresses: vec![crate::addr::Cidr { addr: crate::addr::Ipv4Addr::LOOPBACK, prefix_len: 8 }],
            stats: Stats::default(),
            namespace: namespace.into(),
        }
    }

    pub fn veth(name: impl Into<String>, peer: impl Into<String>, namespace: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            kind: Kind::Veth { peer: peer.into() },
            up: false,
            mtu: 1500,
            addresses: Vec::new(),
            stats: Stats::default(),
            namespace: namespace.into(),
        }
    }

    pub fn bridge(name: impl Into<String>, namespace: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            kind: Kind::Bridge { ports: Vec::new(), forwarding_table: HashMap::new() },
            up: false,
            mtu: 1500,
            addresses: Vec::new(),
            stats: Stats::default(),
            namespace: namespace.into(),
        }
    }

    pub fn tunnel(name: impl Into<String>, namespace: impl Into<String>) -> Self
    {
        Self { name: name.into(), kind: Kind::Tunnel, up: false, mtu: 1500, addresses: Vec::new(), stats: Stats::default(), namespace: namespace.into() }
    }

    /// Record a learned source MAC on a bridge, and resolve the egress
    /// port set for a frame with the given destination MAC: the single
    /// learned port if known, otherwise every other port (`spec.md` §4.8
    /// "egress to an unknown destination floods all ports except the
    /// source").
    pub fn bridge_forward(&mut self, source: MacAddr, source_port: &str, dest: MacAddr) -> Vec<String>
    {
        let Kind::Bridge { ports, forwarding_table } = &mut self.kind else { return Vec::new() };
        forwarding_table.insert(source, source_port.to_string());
        match forwarding_table.get(&dest) {
            Some(port) => vec![port.clone()],
            None => ports.iter().filter(|p| p.as_str() != source_port).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn bridge_learns_source_and_floods_unknown_destination()
    {
        let mut bridge = Interface::bridge("br0", "default");
        let Kind::Bridge { ports, .. } = &mut bridge.kind else { unreachable!() };
        ports.extend(["p1".to_string(), "p2".to_string(), "p3".to_string()]);
        let source = MacAddr([1, 1, 1, 1, 1, 1]);
        let dest = MacAddr([2, 2, 2, 2, 2, 2]);
        let egress = bridge.bridge_forward(source, "p1", dest);
        assert_eq!(egress, vec!["p2", "p3"]);
    }

    #[test]
    fn bridge_forwards_to_learned_port_once_seen()
    {
        let mut bridge = Interface::bridge("br0", "default");
        let Kind::Bridge { ports, .. } = &mut bridge.kind else { unreachable!() };
        ports.extend(["p1".to_string(), "p2".to_string()]);
        let a = MacAddr([1; 6]);
        let b = MacAddr([2; 6]);
        bridge.bridge_forward(b, "p2", a); // learn b on p2
        let egress = bridge.bridge_forward(a, "p1", b);
        assert_eq!(egress, vec!["p2"]);
    }
}
