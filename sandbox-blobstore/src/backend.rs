use {
    sandbox_util::hash::{hash_bytes, Hash},
    std::{collections::HashMap, sync::RwLock},
};

/// Error returned by a [`BlobStore`].
#[derive(Debug, thiserror::Error)]
pub enum Error
{
    /// No blob is stored under the requested hash.
    #[error("no blob stored for hash {0}")]
    NotFound(Hash),
}

/// Result type for [`BlobStore`] operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pluggable backend for content-addressed byte storage.
///
/// Implementations must satisfy the blob-store invariant from `spec.md`
/// §3.2: `hash(bytes) == key` for every stored pair. [`put`][Self::put]
/// must be idempotent: calling it twice with the same bytes returns the
/// same hash and does not double-write.
pub trait BlobStore: Send + Sync
{
    /// Store `bytes`, returning its content hash.
    fn put(&self, bytes: &[u8]) -> Hash;

    /// Fetch the bytes stored under `hash`.
    fn get(&self, hash: Hash) -> Result<Vec<u8>>;

    /// Whether a blob is stored under `hash`.
    fn has(&self, hash: Hash) -> bool;
}

/// The built-in in-memory [`BlobStore`].
#[derive(Default)]
pub struct InMemoryBlobStore
{
    blobs: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl InMemoryBlobStore
{
    /// Create an empty store.
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl BlobStore for InMemoryBlobStore
{
    fn put(&self, bytes: &[u8]) -> Hash
    {
        let hash = hash_bytes(bytes);
        let mut blobs = self.blobs.write().unwrap();
        blobs.entry(hash).or_insert_with(|| bytes.to_vec());
        hash
    }

    fn get(&self, hash: Hash) -> Result<Vec<u8>>
    {
        self.blobs.read().unwrap().get(&hash).cloned().ok_or(Error::NotFound(hash))
    }

    fn has(&self, hash: Hash) -> bool
    {
        self.blobs.read().unwrap().contains_key(&hash)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn put_is_idempotent()
    {
        let store = InMemoryBlobStore::new();
        let h1 = store.put(b"hello");
        let h2 = store.put(b"hello");
        assert_eq!(h1, h2);
        assert_eq!(store.get(h1).unwrap(), b"hello");
    }

    #[test]
    fn missing_hash_errors()
    {
        let store = InMemoryBlobStore::new();
        assert!(!store.has(Hash([0; 32])));
        assert!(matches!(store.get(Hash([0; 32])), Err(Error::NotFound(_))));
    }

    proptest::proptest! {
        #[test]
        fn hash_matches_key(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
            let store = InMemoryBlobStore::new();
            let hash = store.put(&bytes);
            proptest::prop_assert_eq!(hash_bytes(&bytes), hash);
            proptest::prop_assert_eq!(store.get(hash).unwrap(), bytes);
        }
    }
}
