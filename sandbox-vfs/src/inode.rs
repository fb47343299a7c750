use {
    indexmap::IndexMap,
    sandbox_util::hash::Hash,
    std::time::SystemTime,
};

/// The content of a regular file: either stored inline or as a reference
/// into a content store (`spec.md` §3.1).
#[derive(Clone, Debug)]
pub enum FileContent
{
    /// Bytes stored directly in the inode.
    Inline(Vec<u8>),
    /// A content-addressed reference; chunking (if any) is an internal
    /// concern of the content store, not visible here.
    Blob(Hash),
}

/// A node in the VFS inode tree: either a file or a directory
/// (`spec.md` §3.1).
#[derive(Clone, Debug)]
pub enum INode
{
    /// A regular file.
    File
    {
        /// File contents.
        content: FileContent,
        /// Byte size of the file's contents.
        size: u64,
        /// Permission bits (mode 0o000..0o777), POSIX-style.
        mode: u32,
        /// Last modification time.
        mtime: SystemTime,
        /// Last status-change time.
        ctime: SystemTime,
    },
    /// A directory.
    ///
    /// Children are kept in an order-preserving map: insertion order is
    /// irrelevant to correctness (`spec.md` §3.1) but preserving it makes
    /// `readdir` output deterministic given a fixed history of writes,
    /// which is pleasant for tests and for injected virtual entries.
    Directory
    {
        /// Child nodes, keyed by basename.
        children: IndexMap<String, INode>,
        /// Permission bits.
        mode: u32,
        /// Last modification time.
        mtime: SystemTime,
        /// Last status-change time.
        ctime: SystemTime,
    },
}

impl INode
{
    /// Construct an empty directory with the given mode.
    pub fn new_dir(mode: u32) -> Self
    {
        let now = SystemTime::now();
        INode::Directory { children: IndexMap::new(), mode, mtime: now, ctime: now }
    }

    /// Construct a file with inline content.
    pub fn new_file(content: Vec<u8>, mode: u32) -> Self
    {
        let now = SystemTime::now();
        let size = content.len() as u64;
        INode::File { content: FileContent::Inline(content), size, mode, mtime: now, ctime: now }
    }

    /// Whether this node is a directory.
    pub fn is_dir(&self) -> bool
    {
        matches!(self, INode::Directory { .. })
    }

    /// This node's children, if it is a directory.
    pub fn children(&self) -> Option<&IndexMap<String, INode>>
    {
        match self {
            INode::Directory { children, .. } => Some(children),
            INode::File { .. } => None,
        }
    }

    /// Mutable access to this node's children, if it is a directory.
    pub fn children_mut(&mut self) -> Option<&mut IndexMap<String, INode>>
    {
        match self {
            INode::Directory { children, .. } => Some(children),
            INode::File { .. } => None,
        }
    }

    /// Mark this node as modified now, bumping `mtime` and `ctime`.
    pub fn touch(&mut self)
    {
        let now = SystemTime::now();
        match self {
            INode::File { mtime, ctime, .. } | INode::Directory { mtime, ctime, .. } => {
                *mtime = now;
                *ctime = now;
            },
        }
    }

    /// `stat`-equivalent metadata snapshot.
    pub fn stat(&self) -> Stat
    {
        match self {
            INode::File { size, mode, mtime, ctime, .. } => Stat {
                is_dir: false,
                mode: *mode,
                mtime: *mtime,
                ctime: *ctime,
                size: *size,
            },
            INode::Directory { mode, mtime, ctime, .. } => Stat {
                is_dir: true,
                mode: *mode,
                mtime: *mtime,
                ctime: *ctime,
                size: 0,
            },
        }
    }
}

/// Metadata snapshot returned by `stat` (`spec.md` §4.1).
#[derive(Clone, Copy, Debug)]
pub struct Stat
{
    /// Whether the node is a directory.
    pub is_dir: bool,
    /// Permission bits.
    pub mode: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last status-change time.
    pub ctime: SystemTime,
    /// Byte size (`0` for directories, and for blob-backed files whose
    /// size is not tracked in the inode itself — callers needing the
    /// exact size of a blob-backed file should read it).
    pub size: u64,
}
