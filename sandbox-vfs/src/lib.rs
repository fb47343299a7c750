//! Virtual file system (`spec.md` §3.1, §4.1).
//!
//! [`Vfs`] owns the built-in in-memory inode tree, an ordered mount table,
//! and a watch registry. Every operation is synchronous and, per mount,
//! atomic: a single call either fully succeeds or leaves no trace.

#![warn(missing_docs)]

pub use self::{error::*, inode::*, provider::*};

pub mod native;
pub mod virtual_provider;

mod error;
mod inode;
mod provider;
mod tree;

use {
    sandbox_blobstore::{BlobStore, ContentStore, InMemoryBlobStore, CHUNK_THRESHOLD},
    sandbox_util::path,
    std::sync::{
        atomic::{AtomicU64, Ordering::SeqCst},
        Mutex,
    },
    tree::InMemoryTree,
};

/// A mount-table entry (`spec.md` §3.1).
pub struct Mount
{
    /// The path prefix this mount owns.
    pub prefix: String,
    /// The provider implementing operations under `prefix`.
    pub provider: Provider,
    /// Whether this mount rejects mutating operations regardless of what
    /// its provider would otherwise allow.
    pub read_only: bool,
}

impl Mount
{
    fn is_read_only(&self) -> bool
    {
        self.read_only || self.provider.is_read_only()
    }
}

/// The kind of change a [`WatchEvent`] reports (`spec.md` §4.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WatchKind
{
    /// A new file or directory was created by a write.
    Create,
    /// An existing file's content changed.
    Write,
    /// A file was removed.
    Unlink,
    /// A directory was created.
    Mkdir,
    /// A directory was removed.
    Rmdir,
    /// A file or directory was renamed or moved.
    Rename,
}

/// An event delivered to watchers after a mutating operation commits
/// (`spec.md` §4.1, §5).
#[derive(Clone, Debug)]
pub struct WatchEvent
{
    /// What kind of change occurred.
    pub kind: WatchKind,
    /// The path affected (the destination, for a rename).
    pub path: String,
    /// The path's prior location, for a rename.
    pub old_path: Option<String>,
}

/// Identifies a registered watcher, for use with [`Vfs::unwatch`].
///
/// Watchers are owned by the [`Vfs`]; this id is the only handle callers
/// hold, following the arena-and-index ownership pattern (`spec.md` §9) so
/// that watchers never hold a back-reference to the VFS that owns them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WatchId(u64);

struct Watcher
{
    id: WatchId,
    prefix: String,
    listener: Box<dyn Fn(&WatchEvent) + Send + Sync>,
}

struct State<B: BlobStore>
{
    root: InMemoryTree,
    mounts: Vec<Mount>,
    watchers: Vec<Watcher>,
    content: ContentStore<B>,
}

/// The virtual file system (`spec.md` §3.1, §4.1).
///
/// Generic over its blob-store backend so a session can swap in a durable
/// backend for [`sandbox-persist`][sandbox_blobstore]; the in-memory
/// backend is the default.
pub struct Vfs<B: BlobStore = InMemoryBlobStore>
{
    state: Mutex<State<B>>,
    next_watch_id: AtomicU64,
}

impl Vfs<InMemoryBlobStore>
{
    /// Create an empty VFS backed by an in-memory blob store.
    pub fn new() -> Self
    {
        Self::with_blob_store(InMemoryBlobStore::new())
    }
}

impl Default for Vfs<InMemoryBlobStore>
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<B: BlobStore> Vfs<B>
{
    /// Create an empty VFS backed by the given blob store.
    pub fn with_blob_store(blobs: B) -> Self
    {
        Self {
            state: Mutex::new(State {
                root: InMemoryTree::new(),
                mounts: Vec::new(),
                watchers: Vec::new(),
                content: ContentStore::new(blobs),
            }),
            next_watch_id: AtomicU64::new(1),
        }
    }

    /// Whether a node exists at `path`.
    pub fn exists(&self, path: &str) -> bool
    {
        self.stat(path).is_ok()
    }

    /// Metadata for the node at `path`.
    pub fn stat(&self, path: &str) -> Result<Stat>
    {
        let path = path::normalize(path);
        let state = self.state.lock().unwrap();
        match state.find_owning_mount(&path) {
            Some((mount, relative)) => mount.provider.stat(&relative),
            None => state.root.get(&path).map(|n| n.stat()),
        }
    }

    /// List the names of a directory's children, including any synthetic
    /// entries injected for deep mounts (`spec.md` §4.1 "readdir injection
    /// for deep mounts").
    pub fn readdir(&self, path: &str) -> Result<Vec<String>>
    {
        let path = path::normalize(path);
        let state = self.state.lock().unwrap();
        let mut names = match state.find_owning_mount(&path) {
            Some((mount, relative)) => mount.provider.readdir(&relative)?,
            None => state.root.readdir(&path)?,
        };
        let mut seen: std::collections::HashSet<String> = names.iter().cloned().collect();
        for mount in &state.mounts {
            if let Some(segment) = injected_segment(&path, &mount.prefix) {
                if seen.insert(segment.clone()) {
                    names.push(segment);
                }
            }
        }
        Ok(names)
    }

    /// Read a file's full contents as bytes.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>>
    {
        let path = path::normalize(path);
        let state = self.state.lock().unwrap();
        let raw = match state.find_owning_mount(&path) {
            Some((mount, relative)) => mount.provider.read_file_raw(&relative)?,
            None => state.root.read_file_raw(&path)?,
        };
        state.resolve_content(raw)
    }

    /// Read a file's full contents, decoded as UTF-8 (lossily).
    pub fn read_file_string(&self, path: &str) -> Result<String>
    {
        Ok(String::from_utf8_lossy(&self.read_file(path)?).into_owned())
    }

    /// Create or truncate-overwrite a file.
    pub fn write_file(&self, path: &str, bytes: &[u8]) -> Result<()>
    {
        let path = path::normalize(path);
        let mut state = self.state.lock().unwrap();
        let existed = state.exists_locked(&path);
        state.write_file_locked(&path, bytes)?;
        drop(state);
        self.emit(if existed { WatchKind::Write } else { WatchKind::Create }, path, None);
        Ok(())
    }

    /// Append bytes to a file, creating it if missing.
    pub fn append_file(&self, path: &str, extra: &[u8]) -> Result<()>
    {
        let path = path::normalize(path);
        let mut state = self.state.lock().unwrap();
        let existed = state.exists_locked(&path);
        match state.find_owning_mount_mut(&path) {
            Some((mount, relative)) => {
                if mount.is_read_only() { return Err(Error::Erofs); }
                mount.provider.append_file(&relative, extra, 0o644)?;
            },
            None => state.root.append_file(&path, extra, 0o644)?,
        }
        drop(state);
        self.emit(if existed { WatchKind::Write } else { WatchKind::Create }, path, None);
        Ok(())
    }

    /// Remove a file.
    pub fn unlink(&self, path: &str) -> Result<()>
    {
        let path = path::normalize(path);
        let mut state = self.state.lock().unwrap();
        match state.find_owning_mount_mut(&path) {
            Some((mount, relative)) => {
                if mount.is_read_only() { return Err(Error::Erofs); }
                mount.provider.unlink(&relative)?;
            },
            None => state.root.unlink(&path)?,
        }
        drop(state);
        self.emit(WatchKind::Unlink, path, None);
        Ok(())
    }

    /// Create a directory. If `recursive`, missing ancestors are created.
    pub fn mkdir(&self, path: &str, recursive: bool) -> Result<()>
    {
        let path = path::normalize(path);
        let mut state = self.state.lock().unwrap();
        match state.find_owning_mount_mut(&path) {
            Some((mount, relative)) => {
                if mount.is_read_only() { return Err(Error::Erofs); }
                mount.provider.mkdir(&relative, recursive)?;
            },
            None => state.root.mkdir(&path, recursive)?,
        }
        drop(state);
        self.emit(WatchKind::Mkdir, path, None);
        Ok(())
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &str) -> Result<()>
    {
        let path = path::normalize(path);
        let mut state = self.state.lock().unwrap();
        match state.find_owning_mount_mut(&path) {
            Some((mount, relative)) => {
                if mount.is_read_only() { return Err(Error::Erofs); }
                mount.provider.rmdir(&relative)?;
            },
            None => state.root.rmdir(&path)?,
        }
        drop(state);
        self.emit(WatchKind::Rmdir, path, None);
        Ok(())
    }

    /// Remove a directory and everything beneath it.
    pub fn rmdir_recursive(&self, path: &str) -> Result<()>
    {
        let path = path::normalize(path);
        let mut state = self.state.lock().unwrap();
        match state.find_owning_mount_mut(&path) {
            Some((mount, relative)) => {
                if mount.is_read_only() { return Err(Error::Erofs); }
                mount.provider.rmdir_recursive(&relative)?;
            },
            None => state.root.rmdir_recursive(&path)?,
        }
        drop(state);
        self.emit(WatchKind::Rmdir, path, None);
        Ok(())
    }

    /// Rename (or move) a file or directory.
    ///
    /// Renaming across two different mounts (or between a mount and the
    /// built-in tree) fails with [`Error::Exdev`] (`spec.md` §4.1).
    pub fn rename(&self, from: &str, to: &str) -> Result<()>
    {
        let from = path::normalize(from);
        let to = path::normalize(to);
        let mut state = self.state.lock().unwrap();
        let from_owner = state.owning_mount_prefix(&from);
        let to_owner = state.owning_mount_prefix(&to);
        if from_owner != to_owner {
            return Err(Error::Exdev);
        }
        match state.find_owning_mount_mut(&from) {
            Some((mount, from_relative)) => {
                if mount.is_read_only() { return Err(Error::Erofs); }
                let to_relative = strip_prefix(&to, &mount.prefix);
                mount.provider.rename(&from_relative, &to_relative)?;
            },
            None => state.root.rename(&from, &to)?,
        }
        drop(state);
        self.emit(WatchKind::Rename, to, Some(from));
        Ok(())
    }

    /// Copy a file's contents from `from` to `to`. Valid across mounts,
    /// unlike [`rename`][Self::rename].
    pub fn copy_file(&self, from: &str, to: &str) -> Result<()>
    {
        let bytes = self.read_file(from)?;
        self.write_file(to, &bytes)
    }

    /// Mount a provider at `prefix`. Re-mounting an existing prefix
    /// replaces it atomically.
    pub fn mount(&self, prefix: &str, provider: Provider, read_only: bool)
    {
        let prefix = path::normalize(prefix);
        let mut state = self.state.lock().unwrap();
        state.mounts.retain(|m| m.prefix != prefix);
        state.mounts.push(Mount { prefix, provider, read_only });
        state.mounts.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    }

    /// Remove the mount at `prefix`, if any. Idempotent.
    pub fn unmount(&self, prefix: &str)
    {
        let prefix = path::normalize(prefix);
        self.state.lock().unwrap().mounts.retain(|m| m.prefix != prefix);
    }

    /// Register a listener for every mutating event whose path (or, for a
    /// rename, whose old path) falls under `path_prefix`.
    ///
    /// Delivery is synchronous and ordered per-listener. A watcher
    /// registered while another listener's callback is running does not
    /// receive the event currently being dispatched (`spec.md` §4.1).
    pub fn watch(&self, path_prefix: &str, listener: impl Fn(&WatchEvent) + Send + Sync + 'static) -> WatchId
    {
        let prefix = path::normalize(path_prefix);
        let id = WatchId(self.next_watch_id.fetch_add(1, SeqCst));
        self.state.lock().unwrap().watchers.push(Watcher { id, prefix, listener: Box::new(listener) });
        id
    }

    /// Unregister a watcher by id. Best-effort: unknown ids are ignored
    /// (`spec.md` §9's Open Question treats watcher bookkeeping as
    /// best-effort).
    pub fn unwatch(&self, id: WatchId)
    {
        self.state.lock().unwrap().watchers.retain(|w| w.id != id);
    }

    /// Dispatch a watch event to every listener whose prefix matches,
    /// holding the registry lock for the whole dispatch. This also
    /// guarantees that a watcher registered mid-dispatch (necessarily
    /// from another thread, since a listener calling back into the `Vfs`
    /// would deadlock on this same lock) cannot observe the in-flight
    /// event, matching `spec.md` §4.1.
    fn emit(&self, kind: WatchKind, path: String, old_path: Option<String>)
    {
        let event = WatchEvent { kind, path, old_path };
        let state = self.state.lock().unwrap();
        for watcher in &state.watchers {
            let matches = path::is_prefix(&watcher.prefix, &event.path)
                || event.old_path.as_deref().is_some_and(|p| path::is_prefix(&watcher.prefix, p));
            if matches {
                (watcher.listener)(&event);
            }
        }
    }
}

impl<B: BlobStore> State<B>
{
    fn exists_locked(&self, path: &str) -> bool
    {
        match self.find_owning_mount(path) {
            Some((mount, relative)) => mount.provider.exists(&relative),
            None => self.root.exists(path),
        }
    }

    /// The mount owning `path`, if any, and `path` translated to be
    /// relative to that mount's root.
    fn find_owning_mount(&self, path: &str) -> Option<(&Mount, String)>
    {
        self.mounts.iter()
            .find(|m| path::is_prefix(&m.prefix, path))
            .map(|m| (m, strip_prefix(path, &m.prefix)))
    }

    fn find_owning_mount_mut(&mut self, path: &str) -> Option<(&mut Mount, String)>
    {
        let prefix = self.owning_mount_prefix(path)?;
        let relative = strip_prefix(path, &prefix);
        let mount = self.mounts.iter_mut().find(|m| m.prefix == prefix)?;
        Some((mount, relative))
    }

    fn owning_mount_prefix(&self, path: &str) -> Option<String>
    {
        self.mounts.iter().find(|m| path::is_prefix(&m.prefix, path)).map(|m| m.prefix.clone())
    }

    fn write_file_locked(&mut self, path: &str, bytes: &[u8]) -> Result<()>
    {
        let size = bytes.len() as u64;
        let plan = self.mounts.iter()
            .find(|m| path::is_prefix(&m.prefix, path))
            .map(|m| (m.prefix.clone(), m.is_read_only(), matches!(m.provider, Provider::InMemory(_))));
        match plan {
            Some((_, true, _)) => Err(Error::Erofs),
            Some((prefix, false, is_in_memory)) => {
                let content = if is_in_memory { self.content.store(bytes) } else { FileContent::Inline(bytes.to_vec()) };
                let relative = strip_prefix(path, &prefix);
                let mount = self.mounts.iter_mut().find(|m| m.prefix == prefix).unwrap();
                mount.provider.write_file(&relative, content, size, 0o644)
            },
            None => {
                let content = self.content.store(bytes);
                self.root.write_file(path, content, size, 0o644)
            },
        }
    }

    fn resolve_content(&self, raw: FileContent) -> Result<Vec<u8>>
    {
        match raw {
            FileContent::Inline(bytes) => Ok(bytes),
            FileContent::Blob(hash) => self.content.get(hash).map_err(|err| {
                log::error!("blob content for {hash} failed to resolve: {err}");
                Error::Eacces
            }),
        }
    }
}

trait ContentStoreExt
{
    fn store(&self, bytes: &[u8]) -> FileContent;
}

impl<B: BlobStore> ContentStoreExt for ContentStore<B>
{
    /// Store `bytes`, choosing a blob reference over inline storage once
    /// the value reaches the content store's chunking threshold
    /// (`spec.md` §3.1, §4.2).
    fn store(&self, bytes: &[u8]) -> FileContent
    {
        if bytes.len() >= CHUNK_THRESHOLD {
            FileContent::Blob(self.put(bytes))
        } else {
            FileContent::Inline(bytes.to_vec())
        }
    }
}

fn strip_prefix(path: &str, prefix: &str) -> String
{
    if prefix == "/" {
        path.to_owned()
    } else if path == prefix {
        "/".to_owned()
    } else {
        path[prefix.len()..].to_owned()
    }
}

/// If `prefix` names a mount strictly below `path`, the single path
/// segment of `prefix` that comes immediately after `path`
/// (`spec.md` §4.1 "readdir injection for deep mounts").
fn injected_segment(path: &str, prefix: &str) -> Option<String>
{
    let remainder = if path == "/" {
        prefix.strip_prefix('/')
    } else {
        prefix.strip_prefix(path)?.strip_prefix('/')
    }?;
    if remainder.is_empty() {
        return None;
    }
    Some(remainder.split('/').next().unwrap().to_owned())
}

#[cfg(test)]
mod tests
{
    use {super::*, crate::virtual_provider::VirtualProvider, std::sync::{atomic::AtomicUsize, Arc}};

    #[test]
    fn basic_write_read_roundtrip()
    {
        let vfs = Vfs::new();
        vfs.mkdir("/a/b", true).unwrap();
        vfs.write_file("/a/b/c.txt", b"hi").unwrap();
        assert_eq!(vfs.read_file("/a/b/c.txt").unwrap(), b"hi");
        assert_eq!(vfs.read_file_string("/a/b/c.txt").unwrap(), "hi");
    }

    #[test]
    fn large_write_is_blob_backed_and_round_trips()
    {
        let vfs = Vfs::new();
        let big = vec![9u8; CHUNK_THRESHOLD + 17];
        vfs.write_file("/big", &big).unwrap();
        assert_eq!(vfs.read_file("/big").unwrap(), big);
    }

    #[test]
    fn readdir_injects_deep_mount_segment()
    {
        let vfs = Vfs::new();
        vfs.mount("/mnt/data", Provider::InMemory(InMemoryTree::new()), false);
        assert_eq!(vfs.readdir("/").unwrap(), vec!["mnt".to_owned()]);
        assert_eq!(vfs.readdir("/mnt").unwrap(), vec!["data".to_owned()]);
    }

    #[test]
    fn readdir_injection_dedups_against_real_child()
    {
        let vfs = Vfs::new();
        vfs.mkdir("/mnt", false).unwrap();
        vfs.mount("/mnt/data", Provider::InMemory(InMemoryTree::new()), false);
        let names = vfs.readdir("/mnt").unwrap();
        assert_eq!(names.iter().filter(|n| *n == "data").count(), 1);
    }

    #[test]
    fn rename_across_mounts_fails_with_exdev()
    {
        let vfs = Vfs::new();
        vfs.mount("/mnt", Provider::InMemory(InMemoryTree::new()), false);
        vfs.write_file("/mnt/a", b"x").unwrap();
        assert_eq!(vfs.rename("/mnt/a", "/b"), Err(Error::Exdev));
    }

    #[test]
    fn copy_across_mounts_succeeds()
    {
        let vfs = Vfs::new();
        vfs.mount("/mnt", Provider::InMemory(InMemoryTree::new()), false);
        vfs.write_file("/mnt/a", b"x").unwrap();
        vfs.copy_file("/mnt/a", "/b").unwrap();
        assert_eq!(vfs.read_file("/b").unwrap(), b"x");
    }

    #[test]
    fn read_only_mount_rejects_writes()
    {
        let vfs = Vfs::new();
        vfs.mount("/ro", Provider::InMemory(InMemoryTree::new()), true);
        assert_eq!(vfs.write_file("/ro/a", b"x"), Err(Error::Erofs));
    }

    #[test]
    fn virtual_mount_is_always_read_only()
    {
        let vfs = Vfs::new();
        vfs.mount("/proc", Provider::Virtual(VirtualProvider::new(InMemoryTree::new)), false);
        assert_eq!(vfs.write_file("/proc/x", b"x"), Err(Error::Erofs));
    }

    #[test]
    fn remount_replaces_atomically()
    {
        let vfs = Vfs::new();
        vfs.mount("/mnt", Provider::InMemory(InMemoryTree::new()), false);
        vfs.write_file("/mnt/a", b"x").unwrap();
        vfs.mount("/mnt", Provider::InMemory(InMemoryTree::new()), false);
        assert!(!vfs.exists("/mnt/a"));
    }

    #[test]
    fn unmount_is_idempotent()
    {
        let vfs = Vfs::new();
        vfs.unmount("/never-mounted");
        vfs.mount("/mnt", Provider::InMemory(InMemoryTree::new()), false);
        vfs.unmount("/mnt");
        vfs.unmount("/mnt");
    }

    #[test]
    fn watchers_see_events_in_prefix_and_not_reentrantly()
    {
        let vfs = Vfs::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        vfs.watch("/a", move |_event| {
            count2.fetch_add(1, SeqCst);
        });
        vfs.mkdir("/a", false).unwrap();
        vfs.write_file("/a/f", b"x").unwrap();
        vfs.write_file("/b/f", b"x").unwrap_or(());
        assert_eq!(count.load(SeqCst), 2);
    }

    #[test]
    fn unwatch_stops_delivery()
    {
        let vfs = Vfs::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let id = vfs.watch("/", move |_event| {
            count2.fetch_add(1, SeqCst);
        });
        vfs.mkdir("/a", false).unwrap();
        vfs.unwatch(id);
        vfs.mkdir("/b", false).unwrap();
        assert_eq!(count.load(SeqCst), 1);
    }
}
