//! Network stack: namespaces, interfaces, routing, and a virtual HTTP
//! port registry (`spec.md` §4.8).
//!
//! Concrete packet transport is out of scope (`spec.md` §1's Non-goals);
//! this models the control plane precisely enough to test routing
//! decisions, bridge learning, and namespace/interface lifecycle, plus a
//! virtual HTTP layer real enough for a sandboxed shell script to `curl
//! localhost:PORT` against a handler it registered.

pub use self::{addr::*, error::*, interface::*, namespace::*, port::*, route::*};

mod addr;
mod error;
mod interface;
mod namespace;
mod port;
mod route;
