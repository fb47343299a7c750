//! Named snapshot storage (`spec.md` §4.9, §6.4): an in-memory backend for
//! tests and ephemeral sessions, and a durable backend that writes real
//! host-filesystem directories, grounded in the teacher's
//! `snowflake-core/src/state/mod.rs` use of `serde_json` plus a real
//! on-disk state directory.

use {
    crate::{
        error::{Error, Result},
        snapshot::Snapshot,
    },
    std::{
        collections::HashMap,
        fs,
        path::{Path, PathBuf},
        sync::Mutex,
    },
};

/// Stores and retrieves [`Snapshot`]s by name.
pub trait PersistBackend: Send + Sync
{
    fn save(&self, name: &str, snapshot: &Snapshot) -> Result<()>;
    fn load(&self, name: &str) -> Result<Snapshot>;
    fn delete(&self, name: &str) -> Result<()>;
    fn names(&self) -> Vec<String>;
}

/// Keeps snapshots purely in process memory; nothing touches the real
/// disk (`spec.md` §4.9's "in-memory" persistence mode — a session that
/// never calls `save` leaves no trace on the host).
#[derive(Default)]
pub struct InMemoryBackend
{
    snapshots: Mutex<HashMap<String, Snapshot>>,
}

impl InMemoryBackend
{
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl PersistBackend for InMemoryBackend
{
    fn save(&self, name: &str, snapshot: &Snapshot) -> Result<()>
    {
        self.snapshots.lock().unwrap().insert(name.to_string(), snapshot.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Snapshot>
    {
        self.snapshots.lock().unwrap().get(name).cloned().ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn delete(&self, name: &str) -> Result<()>
    {
        self.snapshots.lock().unwrap().remove(name).map(|_| ()).ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn names(&self) -> Vec<String>
    {
        let mut names: Vec<String> = self.snapshots.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Stores each snapshot as a single JSON file under a host directory
/// (`spec.md` §4.9's "durable" persistence mode, surviving process
/// restarts). One file per name rather than one subtree per name, since a
/// [`Snapshot`] already inlines its entire tree.
pub struct DurableBackend
{
    root: PathBuf,
}

impl DurableBackend
{
    /// `root` is created if it doesn't already exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self>
    {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> PathBuf
    {
        self.root.join(format!("{name}.json"))
    }
}

impl PersistBackend for DurableBackend
{
    fn save(&self, name: &str, snapshot: &Snapshot) -> Result<()>
    {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let final_path = self.path_for(name);
        let staging_path = self.root.join(format!("{name}.json.tmp"));
        fs::write(&staging_path, json)?;
        fs::rename(&staging_path, &final_path)?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Snapshot>
    {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(Error::NotFound(name.to_string()));
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn delete(&self, name: &str) -> Result<()>
    {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(Error::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    fn names(&self) -> Vec<String>
    {
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| file_stem_if_snapshot(&entry.path()))
            .collect();
        names.sort();
        names
    }
}

fn file_stem_if_snapshot(path: &Path) -> Option<String>
{
    if path.extension()?.to_str()? != "json" {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn in_memory_backend_round_trips_a_saved_snapshot()
    {
        let backend = InMemoryBackend::new();
        let snapshot = Snapshot::capture(&sandbox_vfs::Vfs::new(), "/").unwrap();
        backend.save("checkpoint", &snapshot).unwrap();
        assert_eq!(backend.load("checkpoint").unwrap(), snapshot);
    }

    #[test]
    fn in_memory_backend_missing_name_is_not_found()
    {
        let backend = InMemoryBackend::new();
        assert!(matches!(backend.load("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn durable_backend_persists_across_instances()
    {
        let dir = tempfile::tempdir().unwrap();
        let vfs = sandbox_vfs::Vfs::new();
        vfs.write_file("/a.txt", b"hi").unwrap();
        let snapshot = Snapshot::capture(&vfs, "/a.txt").unwrap();

        {
            let backend = DurableBackend::new(dir.path()).unwrap();
            backend.save("a", &snapshot).unwrap();
        }
        let reopened = DurableBackend::new(dir.path()).unwrap();
        assert_eq!(reopened.load("a").unwrap(), snapshot);
        assert_eq!(reopened.names(), vec!["a".to_string()]);
    }

    #[test]
    fn durable_backend_delete_removes_the_file()
    {
        let dir = tempfile::tempdir().unwrap();
        let backend = DurableBackend::new(dir.path()).unwrap();
        let snapshot = Snapshot::capture(&sandbox_vfs::Vfs::new(), "/").unwrap();
        backend.save("a", &snapshot).unwrap();
        backend.delete("a").unwrap();
        assert!(matches!(backend.load("a"), Err(Error::NotFound(_))));
    }
}
