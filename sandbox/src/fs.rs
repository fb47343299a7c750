//! `sandbox.fs` (`spec.md` §4.10: "async wrappers over the VFS").
//!
//! This workspace has no async runtime (SPEC_FULL.md §5, §10): the VFS is
//! already synchronous end to end (`spec.md` §5 "VFS... all its
//! operations are synchronous and atomic"), so "async wrapper" here means
//! a thin, embedder-convenient method set over [`sandbox_vfs::Vfs`] rather
//! than a `Future`-returning API — the same posture SPEC_FULL.md §10.4
//! takes for the shell front-end not depending on a terminal/async crate
//! it has no use for.

use {crate::error::Result, sandbox_vfs::Vfs, std::sync::Arc};

pub struct Fs
{
    vfs: Arc<Vfs>,
}

impl Fs
{
    pub(crate) fn new(vfs: Arc<Vfs>) -> Self
    {
        Self { vfs }
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>>
    {
        Ok(self.vfs.read_file(path)?)
    }

    pub fn read_to_string(&self, path: &str) -> Result<String>
    {
        Ok(self.vfs.read_file_string(path)?)
    }

    pub fn write(&self, path: &str, contents: &[u8]) -> Result<()>
    {
        Ok(self.vfs.write_file(path, contents)?)
    }

    pub fn exists(&self, path: &str) -> bool
    {
        self.vfs.exists(path)
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<String>>
    {
        Ok(self.vfs.readdir(path)?)
    }

    pub fn mkdir(&self, path: &str, recursive: bool) -> Result<()>
    {
        Ok(self.vfs.mkdir(path, recursive)?)
    }

    pub fn remove(&self, path: &str) -> Result<()>
    {
        Ok(self.vfs.unlink(path)?)
    }
}
