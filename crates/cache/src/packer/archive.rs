//! zstd-compressed tar representation of task outputs
//!
//! Layout, in order:
//! - `METADATA`: the entry's [`OriginMetadata`] as JSON
//! - `property-<name>`: a file output
//! - `property-<name>/` then `property-<name>/<relative path>...`: a directory
//!   output and its descendants, sorted by file name
//!
//! Missing file outputs produce no entry. Missing directory outputs produce
//! only their root entry.

use super::OutputPacker;
use crate::origin::{OriginMetadata, OriginMetadataProcessor};
use crate::output::{OutputSpec, OutputType, TaskOutputs};
use crate::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Name of the origin metadata entry
pub const METADATA_ENTRY: &str = "METADATA";

/// zstd level used unless configured otherwise
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

const PROPERTY_PREFIX: &str = "property-";

/// Packs outputs into a zstd-compressed tar stream.
///
/// Unpacking writes entries into place but never deletes anything; wrap it
/// in a [`PreparingOutputPacker`](super::PreparingOutputPacker) so stale
/// content is removed first.
#[derive(Debug, Clone, Copy)]
pub struct TarOutputPacker {
    compression_level: i32,
}

impl Default for TarOutputPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl TarOutputPacker {
    /// Create a packer with the default compression level
    #[must_use]
    pub fn new() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Create a packer with an explicit zstd compression level
    #[must_use]
    pub fn with_compression_level(compression_level: i32) -> Self {
        Self { compression_level }
    }

    /// The configured zstd level
    #[must_use]
    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }
}

impl OutputPacker for TarOutputPacker {
    fn pack(
        &self,
        origin: &OriginMetadata,
        outputs: &TaskOutputs,
        sink: &mut dyn Write,
    ) -> Result<usize> {
        validate_property_names(outputs)?;

        let encoder = zstd::Encoder::new(sink, self.compression_level)
            .map_err(|e| Error::io_no_path(e, "zstd_encoder"))?;
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);

        let metadata = serde_json::to_vec_pretty(origin).map_err(|e| {
            Error::serialization(format!("Failed to serialize origin metadata: {e}"))
        })?;
        append_bytes(&mut builder, METADATA_ENTRY, &metadata)
            .map_err(|e| Error::io_no_path(e, "archive"))?;

        let mut entries = 0usize;
        for spec in outputs {
            let Some(path) = spec.path() else {
                continue;
            };
            entries += pack_output(&mut builder, spec, path)?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| Error::io_no_path(e, "archive_finish"))?;
        encoder
            .finish()
            .map_err(|e| Error::io_no_path(e, "zstd_finish"))?;

        tracing::debug!(entries, outputs = outputs.len(), "Packed task outputs");
        Ok(entries)
    }

    fn unpack(
        &self,
        processor: &mut dyn OriginMetadataProcessor,
        outputs: &TaskOutputs,
        source: &mut dyn Read,
    ) -> Result<usize> {
        let decoder = zstd::Decoder::new(source)
            .map_err(|e| Error::archive(format!("unreadable zstd stream: {e}")))?;
        let mut archive = tar::Archive::new(decoder);

        let mut restored = 0usize;
        let mut saw_metadata = false;
        let entries = archive
            .entries()
            .map_err(|e| Error::archive(format!("unreadable archive: {e}")))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| Error::archive(format!("unreadable entry: {e}")))?;
            let entry_path = entry
                .path()
                .map_err(|e| Error::archive(format!("invalid entry path: {e}")))?
                .into_owned();

            if entry_path == Path::new(METADATA_ENTRY) {
                let mut buf = Vec::new();
                entry
                    .read_to_end(&mut buf)
                    .map_err(|e| Error::archive(format!("unreadable {METADATA_ENTRY}: {e}")))?;
                let metadata: OriginMetadata = serde_json::from_slice(&buf).map_err(|e| {
                    Error::serialization(format!("Failed to parse origin metadata: {e}"))
                })?;
                processor.process(metadata)?;
                saw_metadata = true;
                continue;
            }

            let (spec, relative) = resolve_entry(outputs, &entry_path)?;
            let Some(root) = spec.path() else {
                return Err(Error::archive(format!(
                    "entry '{}' belongs to output '{}' which has no resolved path",
                    entry_path.display(),
                    spec.name
                )));
            };
            let is_dir = entry.header().entry_type().is_dir();

            let target = match (spec.output_type, relative) {
                (OutputType::File, None) if !is_dir => root.to_path_buf(),
                (OutputType::Directory, None) if is_dir => root.to_path_buf(),
                (OutputType::Directory, Some(relative)) => {
                    reject_symlinked_ancestors(root, relative, &entry_path)?;
                    root.join(relative)
                }
                _ => {
                    return Err(Error::archive(format!(
                        "entry '{}' does not match {} output '{}'",
                        entry_path.display(),
                        spec.output_type,
                        spec.name
                    )));
                }
            };

            if is_dir {
                fs::create_dir_all(&target).map_err(|e| Error::io(e, &target, "create_dir_all"))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
                }
                entry
                    .unpack(&target)
                    .map_err(|e| Error::io(e, &target, "unpack"))?;
            }
            tracing::trace!(path = %target.display(), "Restored entry");
            restored += 1;
        }

        if !saw_metadata {
            return Err(Error::archive(format!("missing {METADATA_ENTRY} entry")));
        }

        tracing::debug!(entries = restored, outputs = outputs.len(), "Unpacked task outputs");
        Ok(restored)
    }
}

fn validate_property_names(outputs: &TaskOutputs) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in outputs {
        if spec.name.is_empty() || spec.name.contains('/') || spec.name.contains('\\') {
            return Err(Error::configuration(format!(
                "output property name '{}' must be non-empty and contain no path separators",
                spec.name
            )));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(Error::configuration(format!(
                "output property '{}' is declared more than once",
                spec.name
            )));
        }
    }
    Ok(())
}

fn pack_output<W: Write>(
    builder: &mut tar::Builder<W>,
    spec: &OutputSpec,
    path: &Path,
) -> Result<usize> {
    let root = PathBuf::from(format!("{PROPERTY_PREFIX}{}", spec.name));
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => Some(metadata),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(e, path, "stat")),
    };

    match (spec.output_type, metadata) {
        (OutputType::File, None) => {
            tracing::debug!(
                output = %spec.name,
                path = %path.display(),
                "File output missing, nothing to pack"
            );
            Ok(0)
        }
        (OutputType::File, Some(metadata)) if metadata.is_dir() => Err(Error::configuration(format!(
            "file output '{}' is a directory: {}",
            spec.name,
            path.display()
        ))),
        (OutputType::File, Some(_)) => {
            builder
                .append_path_with_name(path, &root)
                .map_err(|e| Error::io(e, path, "archive"))?;
            Ok(1)
        }
        (OutputType::Directory, None) => {
            append_empty_directory(builder, &root).map_err(|e| Error::io(e, path, "archive"))?;
            Ok(1)
        }
        (OutputType::Directory, Some(metadata)) if !metadata.is_dir() => {
            Err(Error::configuration(format!(
                "directory output '{}' is not a directory: {}",
                spec.name,
                path.display()
            )))
        }
        (OutputType::Directory, Some(_)) => {
            builder
                .append_dir(&root, path)
                .map_err(|e| Error::io(e, path, "archive"))?;
            let mut entries = 1usize;
            for entry in WalkDir::new(path).min_depth(1).sort_by_file_name() {
                let entry = entry.map_err(|e| Error::io(e.into(), path, "walk"))?;
                let relative = entry.path().strip_prefix(path).map_err(|_| {
                    Error::configuration(format!(
                        "path {} is not under output {}",
                        entry.path().display(),
                        path.display()
                    ))
                })?;
                let name = root.join(relative);
                let appended = if entry.file_type().is_dir() {
                    builder.append_dir(&name, entry.path())
                } else {
                    builder.append_path_with_name(entry.path(), &name)
                };
                appended.map_err(|e| Error::io(e, entry.path(), "archive"))?;
                entries += 1;
            }
            Ok(entries)
        }
    }
}

fn append_bytes<W: Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    data: &[u8],
) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    builder.append_data(&mut header, name, data)
}

fn append_empty_directory<W: Write>(builder: &mut tar::Builder<W>, name: &Path) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    builder.append_data(&mut header, name, io::empty())
}

/// Refuse entries whose parent directories, as already restored under
/// `root`, include a symlink: writing through it could land outside the output.
fn reject_symlinked_ancestors(root: &Path, relative: &Path, entry_path: &Path) -> Result<()> {
    let Some(parent) = relative.parent() else {
        return Ok(());
    };
    let mut current = root.to_path_buf();
    for component in parent.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(Error::archive(format!(
                    "entry '{}' would be written through symlink {}",
                    entry_path.display(),
                    current.display()
                )));
            }
            Ok(_) => {}
            // Nothing deeper can exist yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(Error::io(e, &current, "stat")),
        }
    }
    Ok(())
}

/// Map an archive path to its output and the path relative to that output.
fn resolve_entry<'a>(
    outputs: &'a TaskOutputs,
    entry_path: &'a Path,
) -> Result<(&'a OutputSpec, Option<&'a Path>)> {
    let invalid = || Error::archive(format!("unexpected entry '{}'", entry_path.display()));

    let mut components = entry_path.components();
    let first = match components.next() {
        Some(Component::Normal(first)) => first.to_str().ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    let name = first.strip_prefix(PROPERTY_PREFIX).ok_or_else(invalid)?;
    let spec = outputs.get(name).ok_or_else(|| {
        Error::archive(format!(
            "entry '{}' refers to undeclared output property '{name}'",
            entry_path.display()
        ))
    })?;

    let relative = components.as_path();
    if relative.as_os_str().is_empty() {
        return Ok((spec, None));
    }
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(Error::archive(format!(
            "entry '{}' escapes its output directory",
            entry_path.display()
        )));
    }
    Ok((spec, Some(relative)))
}
