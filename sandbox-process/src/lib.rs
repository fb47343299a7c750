//! Process registry and job table.
//!
//! Mirrors `spec.md` §4.7: PID allocation, status transitions, job IDs,
//! and cooperative cancellation. Ownership follows the "arena + index"
//! pattern from `spec.md` §9: the [`Registry`] owns every [`Process`]; the
//! shell and its commands hold PIDs, never process references.

pub use self::{cancel::*, job::*, process::*, registry::*};

mod cancel;
mod job;
mod process;
mod registry;
