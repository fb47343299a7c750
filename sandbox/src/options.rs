//! Configuration surface for [`crate::create`] (`spec.md` §4.10).
//!
//! There is no external config file format to parse (SPEC_FULL.md §10.3):
//! the `CreateOptions` struct built with `Default`-then-field-assignment is
//! the whole configuration story, the same way the teacher's CLI binary
//! takes no external config and is driven purely by its own arguments.

use std::collections::HashMap;

/// One entry of `options.mounts` (`spec.md` §4.10).
#[derive(Clone, Debug)]
pub struct MountSpec
{
    pub virtual_path: String,
    pub host_path: String,
    pub read_only: bool,
}

/// Options accepted by [`crate::create`].
#[derive(Clone, Debug, Default)]
pub struct CreateOptions
{
    pub cwd: Option<String>,
    pub env: HashMap<String, String>,
    /// Initial file contents, written into the VFS before the session
    /// becomes visible to the embedder.
    pub files: HashMap<String, Vec<u8>>,
    pub mounts: Vec<MountSpec>,
}

impl CreateOptions
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self
    {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self
    {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self
    {
        self.files.insert(path.into(), contents.into());
        self
    }

    pub fn mount(mut self, virtual_path: impl Into<String>, host_path: impl Into<String>, read_only: bool) -> Self
    {
        self.mounts.push(MountSpec { virtual_path: virtual_path.into(), host_path: host_path.into(), read_only });
        self
    }
}
