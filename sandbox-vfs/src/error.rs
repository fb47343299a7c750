/// VFS error taxonomy (`spec.md` §4.1).
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error
{
    /// No such file or directory.
    #[error("no such file or directory")]
    Enoent,
    /// File or directory already exists.
    #[error("file exists")]
    Eexist,
    /// Expected a file but found a directory.
    #[error("is a directory")]
    Eisdir,
    /// Expected a directory but found a file.
    #[error("not a directory")]
    Enotdir,
    /// Directory is not empty.
    #[error("directory not empty")]
    Enotempty,
    /// Permission denied.
    #[error("permission denied")]
    Eacces,
    /// Provider is read-only.
    #[error("read-only file system")]
    Erofs,
    /// Rename attempted across two different mount providers.
    #[error("invalid cross-device link")]
    Exdev,
}

/// Result type for VFS operations.
pub type Result<T> = std::result::Result<T, Error>;
