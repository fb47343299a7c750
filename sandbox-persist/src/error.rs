//! Persistence error taxonomy (`spec.md` §4.9).

#[derive(Debug, thiserror::Error)]
pub enum Error
{
    /// No snapshot is stored under this name.
    #[error("no snapshot named {0}")]
    NotFound(String),
    /// The VFS rejected an operation while walking or restoring a tree.
    #[error(transparent)]
    Vfs(#[from] sandbox_vfs::Error),
    /// The durable backend's on-disk representation could not be read or
    /// written.
    #[error("persistence I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored snapshot's JSON representation was corrupt.
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
