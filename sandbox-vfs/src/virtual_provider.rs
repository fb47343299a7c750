use crate::{
    error::{Error, Result},
    inode::Stat,
    tree::InMemoryTree,
};

/// Read-only synthetic mount provider (`spec.md` §3.1).
///
/// Backs synthetic trees such as `/proc`-like endpoints. Its content is
/// produced by a generator closure invoked on every access, so the
/// snapshot can reflect live state without the VFS needing to know
/// anything about where that state comes from.
pub struct VirtualProvider
{
    generate: Box<dyn Fn() -> InMemoryTree + Send + Sync>,
}

impl VirtualProvider
{
    /// Create a provider whose content is produced by `generate` on every
    /// access.
    pub fn new(generate: impl Fn() -> InMemoryTree + Send + Sync + 'static) -> Self
    {
        Self { generate: Box::new(generate) }
    }

    pub fn exists(&self, relative: &str) -> bool
    {
        (self.generate)().exists(relative)
    }

    pub fn stat(&self, relative: &str) -> Result<Stat>
    {
        (self.generate)().get(relative).map(|n| n.stat())
    }

    pub fn readdir(&self, relative: &str) -> Result<Vec<String>>
    {
        (self.generate)().readdir(relative)
    }

    pub fn read_file(&self, relative: &str) -> Result<Vec<u8>>
    {
        use crate::inode::{FileContent, INode};
        match (self.generate)().get(relative)? {
            INode::File { content: FileContent::Inline(bytes), .. } => Ok(bytes.clone()),
            INode::File { .. } => Err(Error::Eacces),
            INode::Directory { .. } => Err(Error::Eisdir),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::inode::FileContent;

    #[test]
    fn generator_is_invoked_live()
    {
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter2 = counter.clone();
        let provider = VirtualProvider::new(move || {
            let n = counter2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let mut tree = InMemoryTree::new();
            let bytes = n.to_string().into_bytes();
            let size = bytes.len() as u64;
            tree.write_file("/count", FileContent::Inline(bytes), size, 0o444).unwrap();
            tree
        });
        assert_eq!(provider.read_file("/count").unwrap(), b"0");
        assert_eq!(provider.read_file("/count").unwrap(), b"1");
    }
}
