//! Cache location and compression settings

use crate::packer::DEFAULT_COMPRESSION_LEVEL;
use crate::{Error, Result};
use dirs::{cache_dir, home_dir};
use std::path::PathBuf;

/// Explicit cache directory override
pub const CACHE_DIR_ENV: &str = "RESTASH_CACHE_DIR";

/// zstd level override
pub const COMPRESSION_LEVEL_ENV: &str = "RESTASH_COMPRESSION_LEVEL";

const MIN_COMPRESSION_LEVEL: i32 = 1;
const MAX_COMPRESSION_LEVEL: i32 = 22;

/// Resolved cache settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding cache entries
    pub root: PathBuf,
    /// zstd level used when packing
    pub compression_level: i32,
}

/// Everything the resolver reads from the environment
#[derive(Debug, Clone, Default)]
pub struct CacheInputs {
    /// `RESTASH_CACHE_DIR`
    pub cache_dir_override: Option<PathBuf>,
    /// `XDG_CACHE_HOME`
    pub xdg_cache_home: Option<PathBuf>,
    /// Platform cache directory
    pub os_cache_dir: Option<PathBuf>,
    /// User home directory
    pub home_dir: Option<PathBuf>,
    /// System temporary directory
    pub temp_dir: PathBuf,
    /// `RESTASH_COMPRESSION_LEVEL`
    pub compression_level: Option<String>,
}

impl CacheInputs {
    /// Capture the current process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            cache_dir_override: non_empty_var(CACHE_DIR_ENV).map(PathBuf::from),
            xdg_cache_home: non_empty_var("XDG_CACHE_HOME").map(PathBuf::from),
            os_cache_dir: cache_dir(),
            home_dir: home_dir(),
            temp_dir: std::env::temp_dir(),
            compression_level: non_empty_var(COMPRESSION_LEVEL_ENV),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl CacheConfig {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_inputs(CacheInputs::from_env())
    }

    /// Resolve settings from explicit inputs
    pub fn from_inputs(inputs: CacheInputs) -> Result<Self> {
        let compression_level = parse_compression_level(inputs.compression_level.as_deref())?;
        let root = cache_root_from_inputs(inputs)?;
        tracing::debug!(root = %root.display(), compression_level, "Resolved cache configuration");
        Ok(Self {
            root,
            compression_level,
        })
    }

    /// Replace the resolved root, e.g. from a command-line flag
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

fn parse_compression_level(raw: Option<&str>) -> Result<i32> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_COMPRESSION_LEVEL);
    };
    match raw.trim().parse::<i32>() {
        Ok(level) if (MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&level) => Ok(level),
        _ => Err(Error::configuration(format!(
            "{COMPRESSION_LEVEL_ENV} must be an integer between {MIN_COMPRESSION_LEVEL} and {MAX_COMPRESSION_LEVEL}, got '{raw}'"
        ))),
    }
}

fn cache_root_from_inputs(inputs: CacheInputs) -> Result<PathBuf> {
    // Resolution order (first writable wins):
    // 1) RESTASH_CACHE_DIR (explicit override)
    // 2) XDG_CACHE_HOME/restash
    // 3) OS cache dir/restash
    // 4) ~/.restash/cache
    // 5) TMPDIR/restash/cache (fallback)
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = inputs
        .cache_dir_override
        .filter(|p| !p.as_os_str().is_empty())
    {
        candidates.push(dir);
    }
    if let Some(xdg) = inputs.xdg_cache_home {
        candidates.push(xdg.join("restash"));
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        candidates.push(os_cache.join("restash"));
    }
    if let Some(home) = inputs.home_dir {
        candidates.push(home.join(".restash/cache"));
    }
    candidates.push(inputs.temp_dir.join("restash/cache"));

    for path in candidates {
        // Nix builds point HOME at this nonexistent, unwritable directory
        if path.starts_with("/homeless-shelter") {
            continue;
        }
        // Some CI environments provide read-only cache directories under $HOME.
        if path.exists() {
            if is_writable(&path) {
                return Ok(path);
            }
            tracing::debug!(path = %path.display(), "Cache candidate not writable, skipping");
            continue;
        }
        if std::fs::create_dir_all(&path).is_ok() {
            return Ok(path);
        }
    }
    Err(Error::configuration(
        "Failed to determine a writable cache directory",
    ))
}

fn is_writable(dir: &std::path::Path) -> bool {
    tempfile::NamedTempFile::new_in(dir).is_ok()
}
