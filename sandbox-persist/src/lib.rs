//! Snapshot and restore for a [`sandbox_vfs::Vfs`] subtree, with in-memory
//! and durable named backends (`spec.md` §4.9, §6.4).

pub use self::{
    backend::{DurableBackend, InMemoryBackend, PersistBackend},
    error::{Error, Result},
    snapshot::{Entry, Snapshot},
};

mod backend;
mod error;
mod snapshot;
