//! Command implementations
//!
//! Each command returns its result; printing happens in `main`.

pub mod key;
pub mod outputs;
