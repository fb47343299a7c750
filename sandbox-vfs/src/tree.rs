use {
    crate::{
        error::{Error, Result},
        inode::{FileContent, INode},
    },
    indexmap::IndexMap,
};

/// An in-memory inode tree, rooted at some directory.
///
/// Used both as the VFS's built-in root tree and as the implementation of
/// [`Provider::InMemory`][`crate::provider::Provider::InMemory`] mounts.
/// All paths passed to its methods are normalized and are interpreted
/// relative to this tree's own root (a mount's prefix has already been
/// stripped by the time a path reaches here).
pub struct InMemoryTree
{
    root: INode,
}

fn segments(path: &str) -> Vec<&str>
{
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl InMemoryTree
{
    /// Create an empty tree.
    pub fn new() -> Self
    {
        Self { root: INode::new_dir(0o755) }
    }

    /// Look up a node by path.
    pub fn get(&self, path: &str) -> Result<&INode>
    {
        self.get_segments(&segments(path))
    }

    fn get_segments(&self, segments: &[&str]) -> Result<&INode>
    {
        let mut node = &self.root;
        for segment in segments {
            let children = node.children().ok_or(Error::Enotdir)?;
            node = children.get(*segment).ok_or(Error::Enoent)?;
        }
        Ok(node)
    }

    /// Whether a node exists at `path`.
    pub fn exists(&self, path: &str) -> bool
    {
        self.get(path).is_ok()
    }

    /// List the names of a directory's children.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>>
    {
        let node = self.get(path)?;
        let children = node.children().ok_or(Error::Enotdir)?;
        Ok(children.keys().cloned().collect())
    }

    /// Create a directory at `path`. If `recursive`, missing ancestors
    /// are created as needed; otherwise the parent must already exist.
    pub fn mkdir(&mut self, path: &str, recursive: bool) -> Result<()>
    {
        let segments = segments(path);
        if segments.is_empty() {
            return Err(Error::Eexist);
        }
        let mut node = &mut self.root;
        for (i, segment) in segments.iter().enumerate() {
            let is_last = i == segments.len() - 1;
            let children = node.children_mut().ok_or(Error::Enotdir)?;
            if !children.contains_key(*segment) {
                if !is_last && !recursive {
                    return Err(Error::Enoent);
                }
                children.insert((*segment).to_owned(), INode::new_dir(0o755));
            } else if is_last && !recursive {
                return Err(Error::Eexist);
            }
            node = children.get_mut(*segment).unwrap();
        }
        if !node.is_dir() {
            return Err(Error::Enotdir);
        }
        Ok(())
    }

    /// Insert or overwrite a file's content at `path`. The parent
    /// directory must already exist. `size` is the true byte length of
    /// the file regardless of storage representation — a blob-backed
    /// file's length isn't recoverable from `content` alone, so the
    /// caller must pass it through from before chunking.
    pub fn write_file(&mut self, path: &str, content: FileContent, size: u64, mode: u32) -> Result<()>
    {
        let segments = segments(path);
        let (parent, name) = split_last(&segments)?;
        let parent_dir = self.get_parent_children_mut(parent)?;
        if let Some(existing) = parent_dir.get(name) {
            if existing.is_dir() {
                return Err(Error::Eisdir);
            }
        }
        let now = std::time::SystemTime::now();
        parent_dir.insert(name.to_owned(), INode::File { content, size, mode, mtime: now, ctime: now });
        Ok(())
    }

    /// Append bytes to an existing inline file, or create it.
    pub fn append_file(&mut self, path: &str, extra: &[u8], mode: u32) -> Result<()>
    {
        let segments = segments(path);
        let (parent, name) = split_last(&segments)?;
        let parent_dir = self.get_parent_children_mut(parent)?;
        match parent_dir.get_mut(name) {
            Some(INode::File { content: FileContent::Inline(bytes), size, mtime, ctime, .. }) => {
                bytes.extend_from_slice(extra);
                *size = bytes.len() as u64;
                let now = std::time::SystemTime::now();
                *mtime = now;
                *ctime = now;
            },
            Some(INode::File { .. }) => return Err(Error::Eisdir), // blob-backed: not append-able in place
            Some(INode::Directory { .. }) => return Err(Error::Eisdir),
            None => {
                let now = std::time::SystemTime::now();
                parent_dir.insert(name.to_owned(), INode::File {
                    content: FileContent::Inline(extra.to_vec()),
                    size: extra.len() as u64,
                    mode, mtime: now, ctime: now,
                });
            },
        }
        Ok(())
    }

    /// Remove a file.
    pub fn unlink(&mut self, path: &str) -> Result<()>
    {
        let segments = segments(path);
        let (parent, name) = split_last(&segments)?;
        let parent_dir = self.get_parent_children_mut(parent)?;
        match parent_dir.get(name) {
            None => Err(Error::Enoent),
            Some(n) if n.is_dir() => Err(Error::Eisdir),
            Some(_) => { parent_dir.shift_remove(name); Ok(()) },
        }
    }

    /// Remove an empty directory.
    pub fn rmdir(&mut self, path: &str) -> Result<()>
    {
        let segments = segments(path);
        let (parent, name) = split_last(&segments)?;
        let parent_dir = self.get_parent_children_mut(parent)?;
        match parent_dir.get(name) {
            None => Err(Error::Enoent),
            Some(n) if !n.is_dir() => Err(Error::Enotdir),
            Some(n) if !n.children().unwrap().is_empty() => Err(Error::Enotempty),
            Some(_) => { parent_dir.shift_remove(name); Ok(()) },
        }
    }

    /// Remove a directory and everything beneath it.
    pub fn rmdir_recursive(&mut self, path: &str) -> Result<()>
    {
        let segments = segments(path);
        let (parent, name) = split_last(&segments)?;
        let parent_dir = self.get_parent_children_mut(parent)?;
        match parent_dir.get(name) {
            None => Err(Error::Enoent),
            Some(n) if !n.is_dir() => Err(Error::Enotdir),
            Some(_) => { parent_dir.shift_remove(name); Ok(()) },
        }
    }

    /// Remove and return the node at `path`, for use by cross-tree
    /// operations (the VFS layer implements cross-mount copy/rename by
    /// calling [`take`][Self::take] on the source and
    /// [`insert_node`][Self::insert_node] on the destination).
    pub fn take(&mut self, path: &str) -> Result<INode>
    {
        let segments = segments(path);
        let (parent, name) = split_last(&segments)?;
        let parent_dir = self.get_parent_children_mut(parent)?;
        parent_dir.shift_remove(name).ok_or(Error::Enoent)
    }

    /// Clone the node at `path` without removing it (used by cross-mount
    /// `copyFile`, which must leave the source intact).
    pub fn clone_node(&self, path: &str) -> Result<INode>
    {
        self.get(path).cloned()
    }

    /// A file's content as stored (inline bytes or a blob reference),
    /// without resolving a blob reference to bytes. Blob resolution is the
    /// caller's concern (the [`Vfs`][crate::Vfs] holds the content store).
    pub fn read_file_raw(&self, path: &str) -> Result<FileContent>
    {
        match self.get(path)? {
            INode::File { content, .. } => Ok(content.clone()),
            INode::Directory { .. } => Err(Error::Eisdir),
        }
    }

    /// Insert a whole node (file or directory subtree) at `path`,
    /// overwriting whatever file was there; fails if a directory already
    /// occupies `path`.
    pub fn insert_node(&mut self, path: &str, node: INode) -> Result<()>
    {
        let segments = segments(path);
        let (parent, name) = split_last(&segments)?;
        let parent_dir = self.get_parent_children_mut(parent)?;
        if let Some(existing) = parent_dir.get(name) {
            if existing.is_dir() {
                return Err(Error::Eisdir);
            }
        }
        parent_dir.insert(name.to_owned(), node);
        Ok(())
    }

    /// Rename within this tree.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()>
    {
        let node = self.take(from)?;
        if self.exists(to) {
            // Overwriting: remove the destination first so insert_node's
            // "directory occupied" check only fires for genuine type
            // mismatches, not the normal overwrite case.
            let dest_is_dir = self.get(to)?.is_dir();
            if dest_is_dir != node.is_dir() {
                // Restore the source before failing.
                let _ = self.insert_node(from, node);
                return if dest_is_dir { Err(Error::Eisdir) } else { Err(Error::Enotdir) };
            }
            let _ = self.take(to);
        }
        if let Err(e) = self.insert_node(to, node.clone()) {
            let _ = self.insert_node(from, node);
            return Err(e);
        }
        Ok(())
    }

    fn get_parent_children_mut(&mut self, parent_segments: &[&str]) -> Result<&mut IndexMap<String, INode>>
    {
        let mut node = &mut self.root;
        for segment in parent_segments {
            let children = node.children_mut().ok_or(Error::Enotdir)?;
            node = children.get_mut(*segment).ok_or(Error::Enoent)?;
        }
        node.children_mut().ok_or(Error::Enotdir)
    }
}

impl Default for InMemoryTree
{
    fn default() -> Self
    {
        Self::new()
    }
}

fn split_last<'a>(segments: &'a [&'a str]) -> Result<(&'a [&'a str], &'a str)>
{
    match segments.split_last() {
        Some((name, parent)) => Ok((parent, name)),
        None => Err(Error::Eisdir), // the root itself
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn mkdir_and_write_and_read()
    {
        let mut tree = InMemoryTree::new();
        tree.mkdir("/a/b", true).unwrap();
        tree.write_file("/a/b/c.txt", FileContent::Inline(b"hi".to_vec()), 2, 0o644).unwrap();
        assert!(tree.exists("/a/b/c.txt"));
        assert_eq!(tree.readdir("/a/b").unwrap(), vec!["c.txt".to_owned()]);
    }

    #[test]
    fn mkdir_non_recursive_requires_existing_parent()
    {
        let mut tree = InMemoryTree::new();
        assert_eq!(tree.mkdir("/a/b", false), Err(Error::Enoent));
        tree.mkdir("/a", false).unwrap();
        tree.mkdir("/a/b", false).unwrap();
    }

    #[test]
    fn rmdir_requires_empty()
    {
        let mut tree = InMemoryTree::new();
        tree.mkdir("/a", false).unwrap();
        tree.write_file("/a/f", FileContent::Inline(vec![]), 0, 0o644).unwrap();
        assert_eq!(tree.rmdir("/a"), Err(Error::Enotempty));
        tree.unlink("/a/f").unwrap();
        tree.rmdir("/a").unwrap();
        assert!(!tree.exists("/a"));
    }

    #[test]
    fn rename_overwrites_same_type()
    {
        let mut tree = InMemoryTree::new();
        tree.write_file("/a", FileContent::Inline(b"1".to_vec()), 1, 0o644).unwrap();
        tree.write_file("/b", FileContent::Inline(b"2".to_vec()), 1, 0o644).unwrap();
        tree.rename("/a", "/b").unwrap();
        assert!(!tree.exists("/a"));
        match tree.get("/b").unwrap() {
            INode::File { content: FileContent::Inline(bytes), .. } => assert_eq!(bytes, b"1"),
            _ => panic!("expected file"),
        }
    }
}
