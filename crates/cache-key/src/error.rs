//! Error types for cache key construction

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Error type for cache key operations
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum Error {
    /// A byte range passed to `put_bytes_range` does not fit the buffer
    #[error("byte range {offset}..{offset}+{len} is out of bounds for a buffer of {buf_len} bytes")]
    #[diagnostic(
        code(restash::cache_key::invalid_range),
        help("offset + len must not exceed the buffer length")
    )]
    InvalidRange {
        /// Requested start offset
        offset: usize,
        /// Requested number of bytes
        len: usize,
        /// Actual length of the buffer
        buf_len: usize,
    },

    /// A string could not be parsed as a hex-encoded cache key
    #[error("invalid cache key '{input}': {reason}")]
    #[diagnostic(code(restash::cache_key::invalid_hex))]
    InvalidHex {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },
}

impl Error {
    /// Create an out-of-bounds range error
    #[must_use]
    pub fn invalid_range(offset: usize, len: usize, buf_len: usize) -> Self {
        Self::InvalidRange {
            offset,
            len,
            buf_len,
        }
    }

    /// Create a hex parse error
    #[must_use]
    pub fn invalid_hex(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHex {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for cache key operations
pub type Result<T> = std::result::Result<T, Error>;
