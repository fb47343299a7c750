//! Per-namespace routing table and longest-prefix lookup (`spec.md` §4.8
//! "Routing lookup").

use crate::{
    addr::{Cidr, Ipv4Addr},
    error::{Error, Result},
};

/// One routing table entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route
{
    pub destination: Cidr,
    pub metric: u32,
    pub interface: String,
}

/// A namespace's routing table.
#[derive(Clone, Debug, Default)]
pub struct RoutingTable
{
    routes: Vec<Route>,
}

impl RoutingTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn add(&mut self, route: Route)
    {
        self.routes.push(route);
    }

    pub fn remove(&mut self, destination: Cidr, interface: &str)
    {
        self.routes.retain(|r| !(r.destination == destination && r.interface == interface));
    }

    pub fn routes(&self) -> &[Route]
    {
        &self.routes
    }

    /// Select the route whose destination CIDR contains `dest`, breaking
    /// ties by longest prefix then lowest metric (`spec.md` §4.8).
    pub fn lookup(&self, dest: Ipv4Addr) -> Result<&Route>
    {
        self.routes
            .iter()
            .filter(|r| r.destination.contains(dest))
            .min_by_key(|r| (u8::MAX - r.destination.prefix_len, r.metric))
            .ok_or(Error::NoRouteToHost)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn route(dest: &str, metric: u32, iface: &str) -> Route
    {
        Route { destination: Cidr::parse(dest).unwrap(), metric, interface: iface.to_string() }
    }

    #[test]
    fn longest_prefix_wins_over_metric()
    {
        let mut table = RoutingTable::new();
        table.add(route("10.0.0.0/8", 1, "eth-wide"));
        table.add(route("10.0.0.0/24", 100, "eth-narrow"));
        let dest = Ipv4Addr::parse("10.0.0.5").unwrap();
        assert_eq!(table.lookup(dest).unwrap().interface, "eth-narrow");
    }

    #[test]
    fn metric_breaks_ties_between_equal_prefixes()
    {
        let mut table = RoutingTable::new();
        table.add(route("10.0.0.0/24", 50, "eth-a"));
        table.add(route("10.0.0.0/24", 10, "eth-b"));
        let dest = Ipv4Addr::parse("10.0.0.5").unwrap();
        assert_eq!(table.lookup(dest).unwrap().interface, "eth-b");
    }

    #[test]
    fn falls_back_to_default_route()
    {
        let mut table = RoutingTable::new();
        table.add(route("0.0.0.0/0", 1, "eth-default"));
        let dest = Ipv4Addr::parse("93.184.216.34").unwrap();
        assert_eq!(table.lookup(dest).unwrap().interface, "eth-default");
    }

    #[test]
    fn no_match_and_no_default_fails()
    {
        let table = RoutingTable::new();
        let dest = Ipv4Addr::parse("8.8.8.8").unwrap();
        assert_eq!(table.lookup(dest), Err(Error::NoRouteToHost));
    }
}
