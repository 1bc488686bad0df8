//! Diagnostic side channel for key construction
//!
//! Observers see every value appended to a builder and the finished key.
//! They never influence the digest: the builder hashes first and notifies
//! afterwards, and observers only receive shared references.

use crate::CacheKey;
use std::fmt;

/// A typed value as it is appended to a cache key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue<'a> {
    /// A single byte
    Byte(u8),
    /// A 32-bit signed integer
    Int(i32),
    /// A 64-bit signed integer
    Long(i64),
    /// A 64-bit float, hashed by its bit pattern
    Double(f64),
    /// A boolean, hashed as one byte
    Boolean(bool),
    /// A byte slice
    Bytes(&'a [u8]),
    /// A string, hashed as UTF-8
    String(&'a str),
}

impl KeyValue<'_> {
    /// Short type name used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for KeyValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Long(l) => write!(f, "{l}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Bytes(bytes) => {
                for (idx, b) in bytes.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Receives notifications while a key is being built.
pub trait KeyObserver {
    /// Called after `value` has been fed to the digest.
    fn appended(&mut self, value: &KeyValue<'_>);

    /// Called once with the finalized key.
    fn finished(&mut self, _key: &CacheKey) {}
}

/// Emits `tracing` events for every appended value. This is the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl KeyObserver for TracingObserver {
    fn appended(&mut self, value: &KeyValue<'_>) {
        tracing::trace!(kind = value.kind(), value = %value, "Appending value to cache key");
    }

    fn finished(&mut self, key: &CacheKey) {
        tracing::debug!(key = %key, "Cache key generated");
    }
}

/// Discards all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl KeyObserver for NoopObserver {
    fn appended(&mut self, _value: &KeyValue<'_>) {}
}
