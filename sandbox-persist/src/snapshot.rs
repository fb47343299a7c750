//! Serializing and restoring a VFS subtree (`spec.md` §4.9).
//!
//! A [`Snapshot`] is built by walking the live [`Vfs`] through its public
//! operations (`readdir`/`stat`/`read_file`), rather than reaching into
//! its internal inode tree or blob store directly — the resulting
//! structure is a plain, serializable mirror of "every reachable file and
//! directory under a root path", which is what `spec.md` §4.9 calls
//! "the inode tree and all reachable blob hashes" once blob content is
//! inlined instead of addressed by hash.

use {
    crate::error::Result,
    sandbox_vfs::Vfs,
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

/// One node of a snapshotted tree. `BTreeMap` keeps children in
/// deterministic, lexicographic order for reproducible serialization.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Entry
{
    File(Vec<u8>),
    Dir(BTreeMap<String, Entry>),
}

/// A point-in-time copy of everything under a VFS root path.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Snapshot
{
    pub root: Entry,
}

impl Snapshot
{
    /// Walk `path` (and everything beneath it) in `vfs` into a
    /// [`Snapshot`] (`spec.md` §4.9 "`save(name)` serializes the inode
    /// tree").
    pub fn capture(vfs: &Vfs, path: &str) -> Result<Self>
    {
        Ok(Snapshot { root: capture_entry(vfs, path)? })
    }

    /// Write this snapshot's contents into `vfs` under `path`, atomically
    /// (`spec.md` §4.9 "`load(name)` restores them atomically: either
    /// the full snapshot appears or the VFS remains as before").
    ///
    /// Built under a staging path first, then swapped into place with a
    /// single [`Vfs::rename`], since the VFS itself offers no multi-op
    /// transaction (`spec.md` §5 "No cross-command transaction
    /// abstraction"): an error or panic partway through `write_entry`
    /// leaves `path` untouched, with the staging tree cleaned up by the
    /// scope guard below. Once `rename` has moved staging into `path`,
    /// the guard's cleanup finds nothing left there and is a no-op.
    pub fn restore(&self, vfs: &Vfs, path: &str) -> Result<()>
    {
        use scope_exit::scope_exit;

        let staging = format!("{}.__persist_staging__", path.trim_end_matches('/'));
        if vfs.exists(&staging) {
            remove_any(vfs, &staging)?;
        }

        scope_exit! { let _ = remove_any(vfs, &staging); }
        write_entry(vfs, &staging, &self.root)?;

        if vfs.exists(path) {
            remove_any(vfs, path)?;
        }
        vfs.rename(&staging, path)?;
        Ok(())
    }
}

/// Remove whatever is at `path`, file or directory, since a stale
/// staging tree or the restore target may be either.
fn remove_any(vfs: &Vfs, path: &str) -> sandbox_vfs::Result<()>
{
    if vfs.stat(path)?.is_dir {
        vfs.rmdir_recursive(path)
    } else {
        vfs.unlink(path)
    }
}

fn capture_entry(vfs: &Vfs, path: &str) -> Result<Entry>
{
    let stat = vfs.stat(path)?;
    if !stat.is_dir {
        return Ok(Entry::File(vfs.read_file(path)?));
    }
    let mut children = BTreeMap::new();
    for name in vfs.readdir(path)? {
        let child_path = sandbox_util::path::join(path, &name);
        children.insert(name, capture_entry(vfs, &child_path)?);
    }
    Ok(Entry::Dir(children))
}

fn write_entry(vfs: &Vfs, path: &str, entry: &Entry) -> sandbox_vfs::Result<()>
{
    match entry {
        Entry::File(bytes) => vfs.write_file(path, bytes),
        Entry::Dir(children) => {
            vfs.mkdir(path, true)?;
            for (name, child) in children {
                write_entry(vfs, &sandbox_util::path::join(path, name), child)?;
            }
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn round_trips_a_directory_tree()
    {
        let vfs = Vfs::new();
        vfs.mkdir("/project/src", true).unwrap();
        vfs.write_file("/project/src/main.rs", b"fn main() {}").unwrap();
        vfs.write_file("/project/README.md", b"hello").unwrap();

        let snapshot = Snapshot::capture(&vfs, "/project").unwrap();

        let restored = Vfs::new();
        snapshot.restore(&restored, "/project").unwrap();
        assert_eq!(restored.read_file_string("/project/src/main.rs").unwrap(), "fn main() {}");
        assert_eq!(restored.read_file_string("/project/README.md").unwrap(), "hello");
    }

    #[test]
    fn restore_replaces_rather_than_merges_existing_contents()
    {
        let vfs = Vfs::new();
        vfs.write_file("/f.txt", b"one").unwrap();
        let snapshot = Snapshot::capture(&vfs, "/f.txt").unwrap();

        let target = Vfs::new();
        target.write_file("/f.txt", b"stale").unwrap();
        snapshot.restore(&target, "/f.txt").unwrap();
        assert_eq!(target.read_file_string("/f.txt").unwrap(), "one");
    }

    #[test]
    fn snapshot_serializes_to_json_and_back()
    {
        let vfs = Vfs::new();
        vfs.write_file("/a.txt", b"data").unwrap();
        let snapshot = Snapshot::capture(&vfs, "/a.txt").unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
