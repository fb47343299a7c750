use {
    crate::{
        error::{Error, Result},
        inode::{FileContent, Stat},
    },
    std::{
        fs,
        path::{Path, PathBuf},
        time::SystemTime,
    },
};

/// Host-filesystem-backed mount provider (`spec.md` §3.1, §4.1).
///
/// Every path this provider is given is relative to its mount prefix and
/// already normalized by the owning [`Vfs`][`crate::Vfs`]. As defense in
/// depth, this provider independently re-verifies that the translated
/// host path does not escape [`root`][Self::root] (`spec.md` §4.1
/// Sandboxing).
pub struct NativeProvider
{
    root: PathBuf,
    read_only: bool,
}

impl NativeProvider
{
    /// Create a provider rooted at `root` on the host filesystem.
    pub fn new(root: impl Into<PathBuf>, read_only: bool) -> Self
    {
        Self { root: root.into(), read_only }
    }

    fn host_path(&self, relative: &str) -> Result<PathBuf>
    {
        let relative = relative.trim_start_matches('/');
        if relative.split('/').any(|s| s == ".." || s == ".") {
            return Err(Error::Eacces);
        }
        Ok(self.root.join(relative))
    }

    fn check_writable(&self) -> Result<()>
    {
        if self.read_only { Err(Error::Erofs) } else { Ok(()) }
    }

    pub fn exists(&self, relative: &str) -> Result<bool>
    {
        Ok(self.host_path(relative)?.exists())
    }

    pub fn stat(&self, relative: &str) -> Result<Stat>
    {
        let path = self.host_path(relative)?;
        let meta = fs::metadata(&path).map_err(map_io_error)?;
        Ok(Stat {
            is_dir: meta.is_dir(),
            mode: mode_of(&meta),
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            ctime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: meta.len(),
        })
    }

    pub fn readdir(&self, relative: &str) -> Result<Vec<String>>
    {
        let path = self.host_path(relative)?;
        let entries = fs::read_dir(&path).map_err(map_io_error)?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(map_io_error)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    pub fn read_file(&self, relative: &str) -> Result<Vec<u8>>
    {
        fs::read(self.host_path(relative)?).map_err(map_io_error)
    }

    pub fn write_file(&self, relative: &str, content: &FileContent) -> Result<()>
    {
        self.check_writable()?;
        let bytes = match content {
            FileContent::Inline(bytes) => bytes.clone(),
            FileContent::Blob(_) => return Err(Error::Eacces),
        };
        fs::write(self.host_path(relative)?, bytes).map_err(map_io_error)
    }

    pub fn append_file(&self, relative: &str, extra: &[u8]) -> Result<()>
    {
        use std::io::Write;
        self.check_writable()?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.host_path(relative)?)
            .map_err(map_io_error)?;
        file.write_all(extra).map_err(map_io_error)
    }

    pub fn unlink(&self, relative: &str) -> Result<()>
    {
        self.check_writable()?;
        fs::remove_file(self.host_path(relative)?).map_err(map_io_error)
    }

    pub fn mkdir(&self, relative: &str, recursive: bool) -> Result<()>
    {
        self.check_writable()?;
        let path = self.host_path(relative)?;
        if recursive {
            fs::create_dir_all(path).map_err(map_io_error)
        } else {
            fs::create_dir(path).map_err(map_io_error)
        }
    }

    pub fn rmdir(&self, relative: &str) -> Result<()>
    {
        self.check_writable()?;
        fs::remove_dir(self.host_path(relative)?).map_err(map_io_error)
    }

    pub fn rmdir_recursive(&self, relative: &str) -> Result<()>
    {
        self.check_writable()?;
        fs::remove_dir_all(self.host_path(relative)?).map_err(map_io_error)
    }

    pub fn rename(&self, from_relative: &str, to_relative: &str) -> Result<()>
    {
        self.check_writable()?;
        fs::rename(self.host_path(from_relative)?, self.host_path(to_relative)?).map_err(map_io_error)
    }

    /// Path on the host this provider is rooted at, for diagnostics.
    pub fn root(&self) -> &Path
    {
        &self.root
    }

    /// Whether this provider rejects mutating operations.
    pub fn is_read_only(&self) -> bool
    {
        self.read_only
    }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32
{
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32
{
    if meta.permissions().readonly() { 0o555 } else { 0o755 }
}

fn map_io_error(err: std::io::Error) -> Error
{
    use std::io::ErrorKind::*;
    match err.kind() {
        NotFound => Error::Enoent,
        AlreadyExists => Error::Eexist,
        PermissionDenied => Error::Eacces,
        _ => Error::Eacces,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn escaping_path_is_rejected()
    {
        let dir = tempfile::tempdir().unwrap();
        let provider = NativeProvider::new(dir.path(), false);
        assert_eq!(provider.exists("../../etc/passwd"), Err(Error::Eacces));
    }

    #[test]
    fn read_only_rejects_writes()
    {
        let dir = tempfile::tempdir().unwrap();
        let provider = NativeProvider::new(dir.path(), true);
        assert_eq!(
            provider.write_file("a.txt", &FileContent::Inline(b"x".to_vec())),
            Err(Error::Erofs),
        );
    }

    #[test]
    fn round_trip_write_read()
    {
        let dir = tempfile::tempdir().unwrap();
        let provider = NativeProvider::new(dir.path(), false);
        provider.write_file("a.txt", &FileContent::Inline(b"hi".to_vec())).unwrap();
        assert_eq!(provider.read_file("a.txt").unwrap(), b"hi");
    }
}
