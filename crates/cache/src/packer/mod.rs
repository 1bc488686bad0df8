//! Packing task outputs into, and restoring them from, a byte stream
//!
//! [`OutputPacker`] is the seam between the cache and the byte-level
//! representation of outputs. Implementations compose by ownership: a
//! [`PreparingOutputPacker`] wraps the packer that does the actual work,
//! usually a [`TarOutputPacker`].

mod archive;
mod preparing;

pub use archive::{DEFAULT_COMPRESSION_LEVEL, METADATA_ENTRY, TarOutputPacker};
pub use preparing::{PreparingOutputPacker, prepare_output, prepare_outputs};

use crate::Result;
use crate::origin::{OriginMetadata, OriginMetadataProcessor};
use crate::output::TaskOutputs;
use std::io::{Read, Write};

/// Serializes and restores the contents of a task's declared outputs
pub trait OutputPacker {
    /// Write `outputs` and `origin` to `sink`, returning the number of entries written.
    fn pack(
        &self,
        origin: &OriginMetadata,
        outputs: &TaskOutputs,
        sink: &mut dyn Write,
    ) -> Result<usize>;

    /// Restore `outputs` from `source`, handing the stored origin to
    /// `processor`. Returns the number of entries restored.
    fn unpack(
        &self,
        processor: &mut dyn OriginMetadataProcessor,
        outputs: &TaskOutputs,
        source: &mut dyn Read,
    ) -> Result<usize>;
}

impl<T: OutputPacker + ?Sized> OutputPacker for Box<T> {
    fn pack(
        &self,
        origin: &OriginMetadata,
        outputs: &TaskOutputs,
        sink: &mut dyn Write,
    ) -> Result<usize> {
        (**self).pack(origin, outputs, sink)
    }

    fn unpack(
        &self,
        processor: &mut dyn OriginMetadataProcessor,
        outputs: &TaskOutputs,
        source: &mut dyn Read,
    ) -> Result<usize> {
        (**self).unpack(processor, outputs, source)
    }
}
