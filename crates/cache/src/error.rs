//! Error types for the cache crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(restash::cache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "remove_dir_all", "create_dir_all")
        operation: String,
    },

    /// Configuration or validation error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(code(restash::cache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// A packed output archive is malformed or does not match the declared outputs
    #[error("Output archive error: {message}")]
    #[diagnostic(
        code(restash::cache::archive),
        help("The cache entry may be corrupt or produced for different outputs; re-run the task")
    )]
    Archive {
        /// Error message describing the archive issue
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(restash::cache::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },

    /// Cache key error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Key(#[from] restash_cache_key::Error),
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create an archive error
    #[must_use]
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// The path an I/O error refers to, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } => path.as_deref(),
            _ => None,
        }
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_names_operation_and_path() {
        let err = Error::io(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "/build/out",
            "remove_dir_all",
        );
        assert_eq!(err.to_string(), "I/O remove_dir_all failed: /build/out");
        assert_eq!(err.path(), Some(Path::new("/build/out")));
    }

    #[test]
    fn test_io_error_without_path() {
        let err = Error::io_no_path(io::Error::other("boom"), "persist");
        assert_eq!(err.to_string(), "I/O persist failed");
        assert!(err.path().is_none());
    }

    #[test]
    fn test_archive_error_display() {
        let err = Error::archive("unknown output property 'x'");
        assert!(err.to_string().contains("unknown output property"));
    }

    #[test]
    fn test_key_error_is_transparent() {
        let err: Error = restash_cache_key::Error::invalid_hex("zz", "bad").into();
        assert_eq!(err.to_string(), "invalid cache key 'zz': bad");
    }
}
