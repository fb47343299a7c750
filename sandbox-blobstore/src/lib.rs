//! Hash-indexed, content-addressed byte storage.
//!
//! A [`BlobStore`] maps a content hash to the bytes that hash. A
//! [`ContentStore`] wraps a blob store and transparently chunks values at
//! or above [`CHUNK_THRESHOLD`], matching `spec.md` §4.2.

pub use self::{backend::*, content::*};

mod backend;
mod content;

/// Values at or above this size are split into chunks by [`ContentStore`].
pub const CHUNK_THRESHOLD: usize = 1024 * 1024;

/// Size of each chunk written by [`ContentStore`] for large values.
pub const CHUNK_SIZE: usize = 256 * 1024;
