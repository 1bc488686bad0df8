//! `restash key`

use restash_cache_key::{CacheKey, CacheKeyBuilder};
use std::str::FromStr;

/// One typed value on the command line, written as `TYPE:VALUE`
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg {
    Byte(u8),
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    /// Hex-encoded bytes
    Bytes(Vec<u8>),
    Str(String),
}

impl FromStr for KeyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("'{s}' must look like TYPE:VALUE"))?;
        let invalid = |e: &dyn std::fmt::Display| format!("invalid {kind} value '{value}': {e}");
        match kind {
            "byte" => value.parse().map(Self::Byte).map_err(|e| invalid(&e)),
            "int" => value.parse().map(Self::Int).map_err(|e| invalid(&e)),
            "long" => value.parse().map(Self::Long).map_err(|e| invalid(&e)),
            "double" => value.parse().map(Self::Double).map_err(|e| invalid(&e)),
            "bool" => value.parse().map(Self::Boolean).map_err(|e| invalid(&e)),
            "bytes" => hex::decode(value).map(Self::Bytes).map_err(|e| invalid(&e)),
            "str" => Ok(Self::Str(value.to_string())),
            other => Err(format!(
                "unknown value type '{other}' (expected byte, int, long, double, bool, bytes or str)"
            )),
        }
    }
}

/// Feed `values` to a fresh builder in order and return the key
#[must_use]
pub fn execute_key(values: &[KeyArg]) -> CacheKey {
    let mut builder = CacheKeyBuilder::new();
    for value in values {
        match value {
            KeyArg::Byte(b) => builder.put_byte(*b),
            KeyArg::Int(i) => builder.put_int(*i),
            KeyArg::Long(l) => builder.put_long(*l),
            KeyArg::Double(d) => builder.put_double(*d),
            KeyArg::Boolean(b) => builder.put_boolean(*b),
            KeyArg::Bytes(bytes) => builder.put_bytes(bytes),
            KeyArg::Str(s) => builder.put_string(s),
        };
    }
    builder.build()
}
