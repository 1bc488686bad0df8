//! Cache key construction for restash
//!
//! A [`CacheKeyBuilder`] turns an ordered sequence of primitive values into a
//! single fixed-size [`CacheKey`]. Every value is fed to the underlying digest
//! as a length prefix followed by its raw bytes, so adjacent values can never
//! run together: `"ab", "c"` and `"a", "bc"` hash differently.
//!
//! # Example
//!
//! ```
//! use restash_cache_key::CacheKeyBuilder;
//!
//! let mut builder = CacheKeyBuilder::new();
//! builder
//!     .put_string("compileJava")
//!     .put_int(17)
//!     .put_boolean(true);
//! let key = builder.build();
//! assert_eq!(key.to_hex().len(), 64);
//! ```
//!
//! `build` consumes the builder, so appending to or finalizing an already
//! finalized builder does not compile.

mod builder;
mod error;
mod key;
mod observer;

pub use builder::CacheKeyBuilder;
pub use error::{Error, Result};
pub use key::CacheKey;
pub use observer::{KeyObserver, KeyValue, NoopObserver, TracingObserver};
