//! `restash prepare`, `restash pack` and `restash unpack`

use crate::cli::CliError;
use restash_cache::packer::prepare_outputs;
use restash_cache::{
    CacheConfig, CacheInputs, OriginMetadata, OutputSpec, TaskOutputCache, TaskOutputs,
};
use restash_cache_key::CacheKey;
use std::path::PathBuf;
use std::time::Duration;

/// Result of a successful restore
#[derive(Debug)]
pub struct Restored {
    pub entries: usize,
    pub origin: Option<OriginMetadata>,
}

/// Resolve cache settings; `--cache-dir` takes the place of `RESTASH_CACHE_DIR`
pub fn resolve_config(cache_dir: Option<PathBuf>) -> Result<CacheConfig, CliError> {
    let mut inputs = CacheInputs::from_env();
    if cache_dir.is_some() {
        inputs.cache_dir_override = cache_dir;
    }
    Ok(CacheConfig::from_inputs(inputs)?)
}

/// Reconcile output locations without restoring anything
pub fn execute_prepare(outputs: Vec<OutputSpec>) -> Result<usize, CliError> {
    let outputs = TaskOutputs::from(outputs);
    prepare_outputs(&outputs)?;
    Ok(outputs.len())
}

/// Pack outputs into the cache under `key`
pub fn execute_pack(
    config: &CacheConfig,
    key: &CacheKey,
    task: &str,
    execution_time: Duration,
    outputs: Vec<OutputSpec>,
) -> Result<usize, CliError> {
    let outputs = TaskOutputs::from(outputs);
    let origin = OriginMetadata::new(task, execution_time);
    let cache = TaskOutputCache::from_config(config);
    Ok(cache.store_outputs(key, &origin, &outputs)?)
}

/// Restore outputs stored under `key`; `None` is a cache miss
pub fn execute_unpack(
    config: &CacheConfig,
    key: &CacheKey,
    outputs: Vec<OutputSpec>,
) -> Result<Option<Restored>, CliError> {
    let outputs = TaskOutputs::from(outputs);
    let cache = TaskOutputCache::from_config(config);

    let mut origin = None;
    let mut processor = |metadata: OriginMetadata| origin = Some(metadata);
    let entries = cache.load_outputs(key, &mut processor, &outputs)?;

    Ok(entries.map(|entries| Restored { entries, origin }))
}
