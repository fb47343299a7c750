use super::{Blake3, Hash};

/// Convenient methods for writing values to a [`Blake3`] hasher.
///
/// Named differently from [`std::hash::Hash`] so that changing a value's
/// shape causes a type error at the call site instead of silently hashing
/// something else.
#[allow(missing_docs)]
impl Blake3
{
    pub fn put_bool(&mut self, value: bool) -> &mut Self
    {
        self.put_u8(value as u8)
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self
    {
        self.update(&[value])
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self
    {
        self.update(&value.to_le_bytes())
    }

    pub fn put_usize(&mut self, value: usize) -> &mut Self
    {
        self.put_u64(value as u64)
    }

    pub fn put_hash(&mut self, hash: Hash) -> &mut Self
    {
        self.update(&hash.0)
    }

    pub fn put_bytes(&mut self, value: &[u8]) -> &mut Self
    {
        self.put_usize(value.len()).update(value)
    }

    pub fn put_str(&mut self, value: &str) -> &mut Self
    {
        self.put_bytes(value.as_bytes())
    }

    pub fn put_slice<F, T>(&mut self, value: &[T], mut f: F) -> &mut Self
        where F: for<'a> FnMut(&'a mut Self, &T) -> &'a mut Self
    {
        self.put_usize(value.len());
        for value in value {
            f(self, value);
        }
        self
    }
}
