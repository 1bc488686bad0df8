//! Provenance of a cache entry

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;

static BUILD_INVOCATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Identifier shared by every entry produced by this process.
pub fn build_invocation_id() -> Uuid {
    *BUILD_INVOCATION_ID.get_or_init(Uuid::new_v4)
}

/// When and by what a cache entry was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMetadata {
    /// Path of the task that produced the outputs
    pub task_path: String,
    /// Build invocation that produced the outputs
    pub build_invocation_id: Uuid,
    /// Version of restash that created the entry
    pub tool_version: String,
    /// Operating system of the producing machine
    pub operating_system: String,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// How long the task took to execute
    pub execution_time_ms: u64,
}

impl OriginMetadata {
    /// Describe outputs just produced by `task_path` in this process
    #[must_use]
    pub fn new(task_path: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            task_path: task_path.into(),
            build_invocation_id: build_invocation_id(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            operating_system: std::env::consts::OS.to_string(),
            created_at: Utc::now(),
            execution_time_ms: u64::try_from(execution_time.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Receives the origin metadata of an entry while it is unpacked
pub trait OriginMetadataProcessor {
    /// Handle the metadata read from a cache entry
    fn process(&mut self, metadata: OriginMetadata) -> Result<()>;
}

impl<F> OriginMetadataProcessor for F
where
    F: FnMut(OriginMetadata),
{
    fn process(&mut self, metadata: OriginMetadata) -> Result<()> {
        self(metadata);
        Ok(())
    }
}
