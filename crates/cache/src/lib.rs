//! Task output caching for restash
//!
//! This crate stores the declared outputs of a unit of work under a
//! [`CacheKey`](restash_cache_key::CacheKey) and restores them later:
//! - [`TarOutputPacker`] writes outputs and origin metadata as a
//!   zstd-compressed tar stream
//! - [`PreparingOutputPacker`] reconciles output locations before any
//!   unpacker writes into them, so stale files never survive a restore
//! - [`LocalBuildCache`] and [`TaskOutputCache`] keep packed entries in a
//!   local directory
//!
//! # Restoring outputs
//!
//! ```no_run
//! use restash_cache::{CacheConfig, OriginMetadata, OutputSpec, TaskOutputCache, TaskOutputs};
//! use restash_cache_key::CacheKeyBuilder;
//!
//! # fn main() -> restash_cache::Result<()> {
//! let mut builder = CacheKeyBuilder::new();
//! builder.put_string(":app:compileJava").put_int(42);
//! let key = builder.build();
//!
//! let outputs: TaskOutputs = vec![OutputSpec::directory("classes", "build/classes")].into();
//! let cache = TaskOutputCache::from_config(&CacheConfig::from_env()?);
//!
//! let mut processor = |origin: OriginMetadata| println!("built by {}", origin.task_path);
//! if cache.load_outputs(&key, &mut processor, &outputs)?.is_none() {
//!     // run the task, then:
//!     # let origin = OriginMetadata::new(":app:compileJava", std::time::Duration::ZERO);
//!     cache.store_outputs(&key, &origin, &outputs)?;
//! }
//! # Ok(())
//! # }
//! ```

// TODO(cache-docs): Add # Errors documentation to all fallible public functions
#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

pub mod config;
mod error;
pub mod fs;
mod origin;
mod output;
pub mod packer;
mod store;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use config::{CacheConfig, CacheInputs};
pub use origin::{OriginMetadata, OriginMetadataProcessor, build_invocation_id};
pub use output::{OutputSpec, OutputType, TaskOutputs};
pub use packer::{OutputPacker, PreparingOutputPacker, TarOutputPacker};
pub use store::{LocalBuildCache, TaskOutputCache};
