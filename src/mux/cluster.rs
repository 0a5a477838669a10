//! Cluster element writer

use crate::ebml::{codec, ids};
use crate::error::{Error, Result};
use crate::writer::Writer;

/// A Cluster under construction.
///
/// The header (Cluster id, 8-byte unknown-size placeholder, Timecode child)
/// is written lazily on the first frame; the size field's position is saved
/// so [`Cluster::finalize`] can back-patch it once the payload is complete.
/// On non-seekable sinks the unknown-size sentinel stays in place, which
/// Matroska permits for Cluster elements.
pub struct Cluster {
    timecode: u64,
    position: u64,
    size_position: Option<u64>,
    payload_size: u64,
    blocks_added: u64,
    header_written: bool,
    finalized: bool,
}

impl Cluster {
    /// Create a cluster with the given base timecode (scaled units) at the
    /// byte offset where its header will be written.
    pub fn new(timecode: u64, position: u64) -> Self {
        Cluster {
            timecode,
            position,
            size_position: None,
            payload_size: 0,
            blocks_added: 0,
            header_written: false,
            finalized: false,
        }
    }

    /// Base timecode in scaled units.
    pub fn timecode(&self) -> u64 {
        self.timecode
    }

    /// Byte offset of the Cluster id within the output.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Accumulated payload size in bytes.
    pub fn payload_size(&self) -> u64 {
        self.payload_size
    }

    /// Number of SimpleBlocks written so far.
    pub fn blocks_added(&self) -> u64 {
        self.blocks_added
    }

    /// Whether the cluster has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn write_header<W: Writer>(&mut self, writer: &mut W) -> Result<()> {
        debug_assert!(!self.finalized);
        debug_assert_eq!(writer.position(), self.position);

        codec::write_id(writer, ids::CLUSTER)?;
        self.size_position = Some(writer.position());
        codec::write_vint(writer, codec::UNKNOWN_SIZE, 8)?;

        codec::write_uint_element(writer, ids::TIMECODE, self.timecode)?;
        self.payload_size += codec::uint_element_size(ids::TIMECODE, self.timecode);
        self.header_written = true;
        Ok(())
    }

    /// Append a SimpleBlock with the given relative timecode.
    pub fn add_frame<W: Writer>(
        &mut self,
        writer: &mut W,
        data: &[u8],
        track_number: u64,
        timecode: i16,
        is_key: bool,
    ) -> Result<()> {
        if self.finalized {
            return Err(Error::invalid_state("cluster is finalized"));
        }
        if !self.header_written {
            self.write_header(writer)?;
        }

        let element_size = codec::write_simple_block(writer, data, track_number, timecode, is_key)?;
        self.payload_size += element_size;
        self.blocks_added += 1;
        Ok(())
    }

    /// Back-patch the size field with the accumulated payload size.
    ///
    /// On non-seekable writers the unknown-size sentinel is left in place.
    /// Rejects a second call.
    pub fn finalize<W: Writer>(&mut self, writer: &mut W) -> Result<()> {
        if self.finalized {
            return Err(Error::invalid_state("cluster already finalized"));
        }
        let size_position = self
            .size_position
            .ok_or_else(|| Error::invalid_state("cluster header not written"))?;

        if writer.seekable() {
            let end = writer.position();
            writer.set_position(size_position)?;
            codec::write_vint(writer, self.payload_size, 8)?;
            writer.set_position(end)?;
        }

        self.finalized = true;
        Ok(())
    }
}
