use {
    super::{BlobStore, CHUNK_SIZE, CHUNK_THRESHOLD},
    sandbox_util::hash::Hash,
};

/// Error returned by a [`ContentStore`].
#[derive(Debug, thiserror::Error)]
pub enum Error
{
    /// The underlying blob store failed.
    #[error(transparent)]
    Blob(#[from] super::backend::Error),

    /// A stored manifest's declared `total_size` did not match the sum of
    /// its chunk sizes. This is an internal invariant violation (`spec.md`
    /// §9's Open Question): it is logged before being surfaced.
    #[error("chunk manifest for {hash} declares size {declared} but chunks sum to {actual}")]
    ManifestSizeMismatch { hash: Hash, declared: u64, actual: u64 },
}

/// Result type for [`ContentStore`] operations.
pub type Result<T> = std::result::Result<T, Error>;

// A tag byte distinguishes a raw value from a chunk manifest, so that
// `get` knows how to interpret whatever bytes come back from the
// underlying blob store without needing side-channel bookkeeping. The
// hash returned to callers is computed over the *tagged* bytes; this is
// private to `ContentStore` and has no effect on the blob-store
// invariant `hash(bytes) == key`, which still holds one level down.
const TAG_RAW: u8 = 0;
const TAG_MANIFEST: u8 = 1;

/// Wraps a [`BlobStore`], chunking large values.
///
/// Values below [`CHUNK_THRESHOLD`] are stored directly. Values at or
/// above it are split into [`CHUNK_SIZE`] chunks, each stored separately,
/// with a manifest blob recording the ordered chunk hashes and the
/// original size.
pub struct ContentStore<B>
{
    blobs: B,
}

impl<B: BlobStore> ContentStore<B>
{
    /// Wrap a blob store.
    pub fn new(blobs: B) -> Self
    {
        Self { blobs }
    }

    /// Store `bytes`, returning a hash that [`get`][Self::get] can later
    /// use to retrieve the exact same bytes.
    ///
    /// Idempotent: calling `put` twice with the same bytes returns the
    /// same hash (`spec.md` §4.2's idempotence requirement), because it
    /// delegates to [`BlobStore::put`], which is itself idempotent.
    pub fn put(&self, bytes: &[u8]) -> Hash
    {
        if bytes.len() < CHUNK_THRESHOLD {
            self.put_tagged(TAG_RAW, bytes)
        } else {
            let mut chunk_hashes = Vec::new();
            for chunk in bytes.chunks(CHUNK_SIZE) {
                chunk_hashes.push(self.put_tagged(TAG_RAW, chunk));
            }
            let manifest = encode_manifest(bytes.len() as u64, &chunk_hashes);
            self.put_tagged(TAG_MANIFEST, &manifest)
        }
    }

    /// Retrieve the original bytes stored under `hash`.
    ///
    /// If `hash` names a chunk manifest, its chunks are fetched and
    /// concatenated in order.
    pub fn get(&self, hash: Hash) -> Result<Vec<u8>>
    {
        let tagged = self.blobs.get(hash)?;
        let (tag, body) = tagged.split_first().ok_or(super::backend::Error::NotFound(hash))?;
        match *tag {
            TAG_MANIFEST => {
                let (total_size, chunk_hashes) = decode_manifest(body);
                let mut out = Vec::with_capacity(total_size as usize);
                for chunk_hash in chunk_hashes {
                    out.extend_from_slice(&self.blobs.get(chunk_hash)?);
                }
                if out.len() as u64 != total_size {
                    log::error!(
                        "chunk manifest size mismatch for {hash}: declared {total_size}, got {}",
                        out.len(),
                    );
                    return Err(Error::ManifestSizeMismatch {
                        hash,
                        declared: total_size,
                        actual: out.len() as u64,
                    });
                }
                Ok(out)
            },
            TAG_RAW => Ok(body.to_vec()),
            _ => unreachable!("only TAG_RAW and TAG_MANIFEST are ever written"),
        }
    }

    /// Whether a value is stored under `hash`.
    pub fn has(&self, hash: Hash) -> bool
    {
        self.blobs.has(hash)
    }

    fn put_tagged(&self, tag: u8, body: &[u8]) -> Hash
    {
        let mut tagged = Vec::with_capacity(body.len() + 1);
        tagged.push(tag);
        tagged.extend_from_slice(body);
        self.blobs.put(&tagged)
    }
}

fn encode_manifest(total_size: u64, chunk_hashes: &[Hash]) -> Vec<u8>
{
    let mut out = Vec::with_capacity(8 + chunk_hashes.len() * 32);
    out.extend_from_slice(&total_size.to_le_bytes());
    for hash in chunk_hashes {
        out.extend_from_slice(&hash.0);
    }
    out
}

fn decode_manifest(body: &[u8]) -> (u64, Vec<Hash>)
{
    let total_size = u64::from_le_bytes(body[0..8].try_into().unwrap());
    let mut chunk_hashes = Vec::new();
    let mut i = 8;
    while i + 32 <= body.len() {
        let mut h = [0u8; 32];
        h.copy_from_slice(&body[i..i + 32]);
        chunk_hashes.push(Hash(h));
        i += 32;
    }
    (total_size, chunk_hashes)
}

#[cfg(test)]
mod tests
{
    use {super::*, crate::InMemoryBlobStore};

    #[test]
    fn small_value_round_trips()
    {
        let cs = ContentStore::new(InMemoryBlobStore::new());
        let hash = cs.put(b"hello world");
        assert_eq!(cs.get(hash).unwrap(), b"hello world");
    }

    #[test]
    fn large_value_is_chunked_and_round_trips()
    {
        let cs = ContentStore::new(InMemoryBlobStore::new());
        let big: Vec<u8> = (0..(CHUNK_THRESHOLD + CHUNK_SIZE * 2 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        let hash = cs.put(&big);
        let got = cs.get(hash).unwrap();
        assert_eq!(got, big);
    }

    #[test]
    fn put_is_idempotent()
    {
        let cs = ContentStore::new(InMemoryBlobStore::new());
        let big = vec![7u8; CHUNK_THRESHOLD + 1];
        let h1 = cs.put(&big);
        let h2 = cs.put(&big);
        assert_eq!(h1, h2);
    }

    proptest::proptest! {
        #[test]
        fn round_trip(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..4096)) {
            let cs = ContentStore::new(InMemoryBlobStore::new());
            let hash = cs.put(&bytes);
            proptest::prop_assert_eq!(cs.get(hash).unwrap(), bytes);
        }
    }
}
