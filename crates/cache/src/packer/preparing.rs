//! Restore-time reconciliation of output locations
//!
//! Before a cached result is unpacked, every declared output is brought to a
//! clean, type-correct state:
//!
//! | declared type | afterwards |
//! |---------------|------------|
//! | directory | exists, is a directory, is empty |
//! | file | absent, parent directory exists |
//!
//! Nothing else at the path survives, so a restore never mixes files from
//! two executions.

use super::OutputPacker;
use crate::Result;
use crate::fs::{clean_directory, ensure_directory, exists_no_follow, force_delete};
use crate::origin::{OriginMetadata, OriginMetadataProcessor};
use crate::output::{OutputSpec, OutputType, TaskOutputs};
use std::io::{Read, Write};
use std::path::Path;

/// Prepares output locations before delegating an unpack.
///
/// `pack` is forwarded untouched.
#[derive(Debug, Clone)]
pub struct PreparingOutputPacker<P> {
    delegate: P,
}

impl<P> PreparingOutputPacker<P> {
    /// Wrap `delegate`
    #[must_use]
    pub fn new(delegate: P) -> Self {
        Self { delegate }
    }

    /// The wrapped packer
    #[must_use]
    pub fn delegate(&self) -> &P {
        &self.delegate
    }

    /// Unwrap the inner packer
    #[must_use]
    pub fn into_inner(self) -> P {
        self.delegate
    }
}

impl<P: OutputPacker> OutputPacker for PreparingOutputPacker<P> {
    fn pack(
        &self,
        origin: &OriginMetadata,
        outputs: &TaskOutputs,
        sink: &mut dyn Write,
    ) -> Result<usize> {
        self.delegate.pack(origin, outputs, sink)
    }

    fn unpack(
        &self,
        processor: &mut dyn OriginMetadataProcessor,
        outputs: &TaskOutputs,
        source: &mut dyn Read,
    ) -> Result<usize> {
        prepare_outputs(outputs)?;
        self.delegate.unpack(processor, outputs, source)
    }
}

/// Prepare every output in declared order, stopping at the first failure.
pub fn prepare_outputs(outputs: &TaskOutputs) -> Result<()> {
    let span = tracing::debug_span!("prepare_outputs", count = outputs.len());
    let _guard = span.enter();

    for spec in outputs {
        prepare_output(spec)?;
    }
    Ok(())
}

/// Prepare a single output location. Unresolved outputs are skipped.
pub fn prepare_output(spec: &OutputSpec) -> Result<()> {
    let Some(path) = spec.path() else {
        tracing::trace!(output = %spec.name, "Output has no resolved path, skipping");
        return Ok(());
    };

    match spec.output_type {
        OutputType::Directory => prepare_directory(path)?,
        OutputType::File => prepare_file(path)?,
    }

    tracing::debug!(
        output = %spec.name,
        path = %path.display(),
        kind = %spec.output_type,
        "Prepared output location"
    );
    Ok(())
}

fn prepare_directory(path: &Path) -> Result<()> {
    // A directory created just now is empty already
    if !ensure_directory(path)?.was_created() {
        clean_directory(path)?;
    }
    Ok(())
}

fn prepare_file(path: &Path) -> Result<()> {
    // Relative paths like "out.txt" have an empty parent: the working directory
    let parent_created = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent)?.was_created(),
        _ => false,
    };

    // A fresh parent cannot hold a stale file
    if !parent_created && exists_no_follow(path)? {
        force_delete(path)?;
    }
    Ok(())
}
