//! Local build cache: packed task outputs stored under their cache key

use crate::config::CacheConfig;
use crate::origin::{OriginMetadata, OriginMetadataProcessor};
use crate::output::TaskOutputs;
use crate::packer::{OutputPacker, PreparingOutputPacker, TarOutputPacker};
use crate::{Error, Result};
use restash_cache_key::CacheKey;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A flat directory of cache entries, one file per key
#[derive(Debug, Clone)]
pub struct LocalBuildCache {
    root: PathBuf,
}

impl LocalBuildCache {
    /// Use `root` as the entry directory; it is created on first store
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use the configured cache root
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.root)
    }

    /// Entry directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the entry for `key` lives
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.to_hex())
    }

    /// Whether an entry for `key` is present
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_file()
    }

    /// Open the entry for `key` and hand it to `reader`.
    ///
    /// Returns `Ok(None)` when there is no entry.
    pub fn load<T>(
        &self,
        key: &CacheKey,
        reader: impl FnOnce(&mut dyn Read) -> Result<T>,
    ) -> Result<Option<T>> {
        let path = self.entry_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(%key, "Cache miss");
                return Ok(None);
            }
            Err(e) => return Err(Error::io(e, &path, "open")),
        };
        tracing::debug!(%key, path = %path.display(), "Cache hit");
        let mut buffered = BufReader::new(file);
        reader(&mut buffered).map(Some)
    }

    /// Write the entry for `key` through `writer`.
    ///
    /// The entry only appears once `writer` has succeeded; a failure leaves
    /// any previous entry untouched.
    pub fn store(
        &self,
        key: &CacheKey,
        writer: impl FnOnce(&mut dyn Write) -> Result<()>,
    ) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;
        let mut temp =
            NamedTempFile::new_in(&self.root).map_err(|e| Error::io(e, &self.root, "create_temp"))?;
        {
            let mut buffered = BufWriter::new(temp.as_file_mut());
            writer(&mut buffered)?;
            buffered
                .flush()
                .map_err(|e| Error::io(e, &self.root, "flush"))?;
        }

        let path = self.entry_path(key);
        temp.persist(&path)
            .map_err(|e| Error::io(e.error, &path, "persist"))?;
        tracing::debug!(%key, path = %path.display(), "Stored cache entry");
        Ok(())
    }
}

/// Stores and restores task outputs through a packer
#[derive(Debug)]
pub struct TaskOutputCache<P> {
    store: LocalBuildCache,
    packer: P,
}

impl TaskOutputCache<PreparingOutputPacker<TarOutputPacker>> {
    /// Tar packing with output reconciliation, rooted at the configured cache
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            LocalBuildCache::from_config(config),
            PreparingOutputPacker::new(TarOutputPacker::with_compression_level(
                config.compression_level,
            )),
        )
    }
}

impl<P: OutputPacker> TaskOutputCache<P> {
    /// Combine a store with a packer
    #[must_use]
    pub fn new(store: LocalBuildCache, packer: P) -> Self {
        Self { store, packer }
    }

    /// The underlying store
    #[must_use]
    pub fn store(&self) -> &LocalBuildCache {
        &self.store
    }

    /// The packer used for both directions
    #[must_use]
    pub fn packer(&self) -> &P {
        &self.packer
    }

    /// Pack `outputs` and store them under `key`; returns the number of entries packed
    pub fn store_outputs(
        &self,
        key: &CacheKey,
        origin: &OriginMetadata,
        outputs: &TaskOutputs,
    ) -> Result<usize> {
        let mut entries = 0usize;
        self.store.store(key, |writer| {
            entries = self.packer.pack(origin, outputs, writer)?;
            Ok(())
        })?;
        tracing::info!(%key, task = %origin.task_path, entries, "Stored task outputs");
        Ok(entries)
    }

    /// Restore `outputs` from the entry for `key`.
    ///
    /// `Ok(None)` is a miss and leaves the filesystem alone. An error means
    /// the cached result was not applied and the outputs may be partially
    /// reconciled; the task has to run.
    pub fn load_outputs(
        &self,
        key: &CacheKey,
        processor: &mut dyn OriginMetadataProcessor,
        outputs: &TaskOutputs,
    ) -> Result<Option<usize>> {
        let restored = self
            .store
            .load(key, |reader| self.packer.unpack(processor, outputs, reader))?;
        if let Some(entries) = restored {
            tracing::info!(%key, entries, "Restored task outputs");
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputSpec;
    use restash_cache_key::CacheKeyBuilder;
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        let mut builder = CacheKeyBuilder::new();
        builder.put_string(name);
        builder.build()
    }

    #[test]
    fn test_load_miss() {
        let temp = TempDir::new().unwrap();
        let cache = LocalBuildCache::new(temp.path().join("cache"));
        let k = key("missing");

        assert!(!cache.contains(&k));
        let loaded = cache.load(&k, |_| Ok(())).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_store_then_load() {
        let temp = TempDir::new().unwrap();
        let cache = LocalBuildCache::new(temp.path().join("cache"));
        let k = key("entry");

        cache
            .store(&k, |w| w.write_all(b"payload").map_err(|e| Error::io_no_path(e, "write")))
            .unwrap();

        assert!(cache.contains(&k));
        assert_eq!(cache.entry_path(&k), temp.path().join("cache").join(k.to_hex()));
        let loaded = cache
            .load(&k, |r| {
                let mut s = String::new();
                r.read_to_string(&mut s)
                    .map_err(|e| Error::io_no_path(e, "read"))?;
                Ok(s)
            })
            .unwrap();
        assert_eq!(loaded.as_deref(), Some("payload"));
    }

    #[test]
    fn test_failed_writer_leaves_no_entry() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("cache");
        let cache = LocalBuildCache::new(&root);
        let k = key("broken");

        let err = cache
            .store(&k, |w| {
                w.write_all(b"partial").unwrap();
                Err(Error::archive("boom"))
            })
            .unwrap_err();

        assert!(matches!(err, Error::Archive { .. }));
        assert!(!cache.contains(&k));
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_writer_keeps_previous_entry() {
        let temp = TempDir::new().unwrap();
        let cache = LocalBuildCache::new(temp.path());
        let k = key("kept");

        cache
            .store(&k, |w| w.write_all(b"old").map_err(|e| Error::io_no_path(e, "write")))
            .unwrap();
        let _ = cache.store(&k, |_| Err(Error::archive("boom")));

        assert_eq!(fs::read(cache.entry_path(&k)).unwrap(), b"old");
    }

    fn workspace(temp: &TempDir) -> TaskOutputs {
        let classes = temp.path().join("build/classes");
        fs::create_dir_all(&classes).unwrap();
        fs::write(classes.join("A.class"), "a").unwrap();
        let log = temp.path().join("build/log.txt");
        fs::write(&log, "log").unwrap();
        vec![
            OutputSpec::directory("classes", classes),
            OutputSpec::file("log", log),
        ]
        .into()
    }

    #[test]
    fn test_task_output_round_trip() {
        let temp = TempDir::new().unwrap();
        let outputs = workspace(&temp);
        let config = CacheConfig {
            root: temp.path().join("cache"),
            compression_level: 1,
        };
        let cache = TaskOutputCache::from_config(&config);
        let k = key("compile");

        let origin = OriginMetadata::new(":compile", Duration::from_millis(7));
        let stored = cache.store_outputs(&k, &origin, &outputs).unwrap();
        assert_eq!(stored, 3);

        let classes = temp.path().join("build/classes");
        fs::write(classes.join("Stale.class"), "stale").unwrap();
        fs::remove_file(classes.join("A.class")).unwrap();

        let mut origins = Vec::new();
        let mut processor = |meta: OriginMetadata| origins.push(meta);
        let restored = cache.load_outputs(&k, &mut processor, &outputs).unwrap();

        assert_eq!(restored, Some(3));
        assert_eq!(origins, vec![origin]);
        assert!(!classes.join("Stale.class").exists());
        assert_eq!(fs::read_to_string(classes.join("A.class")).unwrap(), "a");
    }

    #[test]
    fn test_task_output_miss_leaves_workspace_alone() {
        let temp = TempDir::new().unwrap();
        let outputs = workspace(&temp);
        let cache = TaskOutputCache::new(
            LocalBuildCache::new(temp.path().join("cache")),
            PreparingOutputPacker::new(TarOutputPacker::new()),
        );
        let stale = temp.path().join("build/classes/Stale.class");
        fs::write(&stale, "stale").unwrap();

        let mut origins = Vec::new();
        let mut processor = |meta: OriginMetadata| origins.push(meta);
        let restored = cache
            .load_outputs(&key("never-stored"), &mut processor, &outputs)
            .unwrap();

        assert_eq!(restored, None);
        assert!(origins.is_empty());
        assert!(stale.exists());
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let temp = TempDir::new().unwrap();
        let outputs = workspace(&temp);
        let store = LocalBuildCache::new(temp.path().join("cache"));
        let k = key("corrupt");
        store
            .store(&k, |w| w.write_all(b"garbage").map_err(|e| Error::io_no_path(e, "write")))
            .unwrap();
        let cache = TaskOutputCache::new(store, TarOutputPacker::new());

        let mut processor = |_: OriginMetadata| {};
        assert!(cache.load_outputs(&k, &mut processor, &outputs).is_err());
    }
}
