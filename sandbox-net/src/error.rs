//! Network stack error taxonomy (`spec.md` §4.8).

use crate::addr::Ipv4Addr;

/// Errors raised by namespace, interface, route, and port-registry
/// operations.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error
{
    /// No namespace is registered under this name.
    #[error("no such namespace: {0}")]
    NoSuchNamespace(String),
    /// A namespace with this name already exists.
    #[error("namespace already exists: {0}")]
    NamespaceExists(String),
    /// The default namespace cannot be deleted (`spec.md` §4.8).
    #[error("cannot delete the default namespace")]
    CannotDeleteDefault,
    /// No interface is registered under this name.
    #[error("no such interface: {0}")]
    NoSuchInterface(String),
    /// An interface with this name already exists.
    #[error("interface already exists: {0}")]
    InterfaceExists(String),
    /// The named interface is not a bridge.
    #[error("{0} is not a bridge")]
    NotABridge(String),
    /// Routing lookup found no matching route and no default route
    /// (`spec.md` §4.8 "Routing lookup").
    #[error("No route to host")]
    NoRouteToHost,
    /// A packet addressed to `destination` could not be delivered, in the
    /// network-simulation sense (interface down, etc).
    #[error("unreachable: {destination}")]
    Unreachable
    {
        /// The undeliverable destination.
        destination: Ipv4Addr,
    },
}

/// Result type for `sandbox-net` operations.
pub type Result<T> = std::result::Result<T, Error>;
