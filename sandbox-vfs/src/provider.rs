use crate::{
    error::{Error, Result},
    inode::{FileContent, Stat},
    native::NativeProvider,
    tree::InMemoryTree,
    virtual_provider::VirtualProvider,
};

/// A mount provider (`spec.md` §3.1): one of a fixed set of variants,
/// dispatched by tag rather than through an open trait hierarchy
/// (`spec.md` §9).
pub enum Provider
{
    /// The built-in in-memory inode tree.
    InMemory(InMemoryTree),
    /// Host-filesystem-backed.
    Native(NativeProvider),
    /// Read-only synthetic tree.
    Virtual(VirtualProvider),
}

impl Provider
{
    pub fn exists(&self, relative: &str) -> bool
    {
        match self {
            Provider::InMemory(tree) => tree.exists(relative),
            Provider::Native(native) => native.exists(relative).unwrap_or(false),
            Provider::Virtual(virt) => virt.exists(relative),
        }
    }

    pub fn stat(&self, relative: &str) -> Result<Stat>
    {
        match self {
            Provider::InMemory(tree) => tree.get(relative).map(|n| n.stat()),
            Provider::Native(native) => native.stat(relative),
            Provider::Virtual(virt) => virt.stat(relative),
        }
    }

    pub fn readdir(&self, relative: &str) -> Result<Vec<String>>
    {
        match self {
            Provider::InMemory(tree) => tree.readdir(relative),
            Provider::Native(native) => native.readdir(relative),
            Provider::Virtual(virt) => virt.readdir(relative),
        }
    }

    pub fn read_file(&self, relative: &str) -> Result<Vec<u8>>
    {
        match self {
            Provider::InMemory(tree) => match tree.read_file_raw(relative)? {
                FileContent::Inline(bytes) => Ok(bytes),
                FileContent::Blob(_) => Err(Error::Eacces),
            },
            Provider::Native(native) => native.read_file(relative),
            Provider::Virtual(virt) => virt.read_file(relative),
        }
    }

    /// A file's content as stored, without resolving a blob reference.
    /// Only [`Provider::InMemory`] ever stores a blob reference; the other
    /// variants always return [`FileContent::Inline`].
    pub fn read_file_raw(&self, relative: &str) -> Result<FileContent>
    {
        match self {
            Provider::InMemory(tree) => tree.read_file_raw(relative),
            Provider::Native(native) => native.read_file(relative).map(FileContent::Inline),
            Provider::Virtual(virt) => virt.read_file(relative).map(FileContent::Inline),
        }
    }

    pub fn write_file(&mut self, relative: &str, content: FileContent, size: u64, mode: u32) -> Result<()>
    {
        match self {
            Provider::InMemory(tree) => tree.write_file(relative, content, size, mode),
            Provider::Native(native) => native.write_file(relative, &content),
            Provider::Virtual(_) => Err(Error::Erofs),
        }
    }

    pub fn append_file(&mut self, relative: &str, extra: &[u8], mode: u32) -> Result<()>
    {
        match self {
            Provider::InMemory(tree) => tree.append_file(relative, extra, mode),
            Provider::Native(native) => native.append_file(relative, extra),
            Provider::Virtual(_) => Err(Error::Erofs),
        }
    }

    pub fn unlink(&mut self, relative: &str) -> Result<()>
    {
        match self {
            Provider::InMemory(tree) => tree.unlink(relative),
            Provider::Native(native) => native.unlink(relative),
            Provider::Virtual(_) => Err(Error::Erofs),
        }
    }

    pub fn mkdir(&mut self, relative: &str, recursive: bool) -> Result<()>
    {
        match self {
            Provider::InMemory(tree) => tree.mkdir(relative, recursive),
            Provider::Native(native) => native.mkdir(relative, recursive),
            Provider::Virtual(_) => Err(Error::Erofs),
        }
    }

    pub fn rmdir(&mut self, relative: &str) -> Result<()>
    {
        match self {
            Provider::InMemory(tree) => tree.rmdir(relative),
            Provider::Native(native) => native.rmdir(relative),
            Provider::Virtual(_) => Err(Error::Erofs),
        }
    }

    pub fn rmdir_recursive(&mut self, relative: &str) -> Result<()>
    {
        match self {
            Provider::InMemory(tree) => tree.rmdir_recursive(relative),
            Provider::Native(native) => native.rmdir_recursive(relative),
            Provider::Virtual(_) => Err(Error::Erofs),
        }
    }

    /// Rename within this single provider.
    pub fn rename(&mut self, from_relative: &str, to_relative: &str) -> Result<()>
    {
        match self {
            Provider::InMemory(tree) => tree.rename(from_relative, to_relative),
            Provider::Native(native) => native.rename(from_relative, to_relative),
            Provider::Virtual(_) => Err(Error::Erofs),
        }
    }

    pub fn is_read_only(&self) -> bool
    {
        match self {
            Provider::InMemory(_) => false,
            Provider::Native(native) => native.is_read_only(),
            Provider::Virtual(_) => true,
        }
    }
}
