//! Length-prefixed incremental key builder

use crate::observer::{KeyObserver, KeyValue, TracingObserver};
use crate::{CacheKey, Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;

/// Single-use accumulator that turns an ordered sequence of typed values into
/// a [`CacheKey`].
///
/// Each `put_*` call feeds the digest two writes: the value's byte length as a
/// little-endian `u64`, then the value's bytes. [`build`](Self::build) takes
/// the builder by value.
pub struct CacheKeyBuilder<H = Sha256> {
    hasher: H,
    observer: Box<dyn KeyObserver + Send>,
}

impl CacheKeyBuilder<Sha256> {
    /// Create a SHA-256 backed builder that traces appended values.
    #[must_use]
    pub fn new() -> Self {
        Self::with_digest()
    }
}

impl Default for CacheKeyBuilder<Sha256> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Digest> CacheKeyBuilder<H> {
    /// Create a builder backed by the digest algorithm `H`.
    #[must_use]
    pub fn with_digest() -> Self {
        Self {
            hasher: H::new(),
            observer: Box::new(TracingObserver),
        }
    }

    /// Replace the diagnostic observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl KeyObserver + Send + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Append a single byte.
    pub fn put_byte(&mut self, b: u8) -> &mut Self {
        self.append(&[b], KeyValue::Byte(b))
    }

    /// Append a 32-bit integer.
    pub fn put_int(&mut self, i: i32) -> &mut Self {
        self.append(&i.to_le_bytes(), KeyValue::Int(i))
    }

    /// Append a 64-bit integer.
    pub fn put_long(&mut self, l: i64) -> &mut Self {
        self.append(&l.to_le_bytes(), KeyValue::Long(l))
    }

    /// Append a 64-bit float by its IEEE 754 bit pattern.
    pub fn put_double(&mut self, d: f64) -> &mut Self {
        self.append(&d.to_bits().to_le_bytes(), KeyValue::Double(d))
    }

    /// Append a boolean as a single `0` or `1` byte.
    pub fn put_boolean(&mut self, b: bool) -> &mut Self {
        self.append(&[u8::from(b)], KeyValue::Boolean(b))
    }

    /// Append a byte slice.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.append(bytes, KeyValue::Bytes(bytes))
    }

    /// Append `len` bytes of `bytes` starting at `offset`.
    ///
    /// Fails without touching the digest if the range does not fit the
    /// buffer.
    pub fn put_bytes_range(
        &mut self,
        bytes: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<&mut Self> {
        let slice = offset
            .checked_add(len)
            .and_then(|end| bytes.get(offset..end))
            .ok_or_else(|| Error::invalid_range(offset, len, bytes.len()))?;
        Ok(self.put_bytes(slice))
    }

    /// Append a string as its UTF-8 bytes.
    pub fn put_string(&mut self, s: &str) -> &mut Self {
        self.append(s.as_bytes(), KeyValue::String(s))
    }

    /// Finalize the digest into a key.
    #[must_use]
    pub fn build(self) -> CacheKey {
        let Self {
            hasher,
            mut observer,
        } = self;
        let key = CacheKey::from_digest(hasher.finalize().to_vec());
        observer.finished(&key);
        key
    }

    fn append(&mut self, bytes: &[u8], value: KeyValue<'_>) -> &mut Self {
        // usize -> u64 is lossless on every supported target
        let len = bytes.len() as u64;
        self.hasher.update(len.to_le_bytes());
        self.hasher.update(bytes);
        self.observer.appended(&value);
        self
    }
}

impl<H> fmt::Debug for CacheKeyBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKeyBuilder")
            .field("digest", &std::any::type_name::<H>())
            .finish_non_exhaustive()
    }
}
