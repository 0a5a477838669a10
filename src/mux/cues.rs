//! Cues seek index

use crate::ebml::{codec, ids};
use crate::error::Result;
use crate::writer::Writer;

/// A single seek index entry: timestamp to cluster position.
#[derive(Debug, Clone)]
pub struct CuePoint {
    time: u64,
    track: u64,
    cluster_pos: u64,
    block_number: u64,
    output_block_number: bool,
}

impl CuePoint {
    /// Create a cue point. `time` is in scaled units, `cluster_pos` the
    /// offset of the Cluster header from the segment payload start, and
    /// `block_number` the 1-based block index within that cluster.
    pub fn new(time: u64, track: u64, cluster_pos: u64, block_number: u64) -> Self {
        debug_assert!(track > 0);
        CuePoint {
            time,
            track,
            cluster_pos,
            block_number,
            output_block_number: true,
        }
    }

    /// Cue time in scaled units.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Track the cue refers to.
    pub fn track(&self) -> u64 {
        self.track
    }

    /// Cluster offset from the segment payload start.
    pub fn cluster_pos(&self) -> u64 {
        self.cluster_pos
    }

    /// Block number within the cluster.
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    fn write_block_number(&self) -> bool {
        self.output_block_number && self.block_number > 1
    }

    fn track_positions_payload_size(&self) -> u64 {
        let mut size = codec::uint_element_size(ids::CUE_TRACK, self.track);
        size += codec::uint_element_size(ids::CUE_CLUSTER_POSITION, self.cluster_pos);
        if self.write_block_number() {
            size += codec::uint_element_size(ids::CUE_BLOCK_NUMBER, self.block_number);
        }
        size
    }

    fn payload_size(&self) -> u64 {
        let positions = self.track_positions_payload_size();
        codec::uint_element_size(ids::CUE_TIME, self.time)
            + codec::master_element_size(ids::CUE_TRACK_POSITIONS, positions)
    }

    /// Serialized size of the whole CuePoint element.
    pub fn size(&self) -> u64 {
        codec::master_element_size(ids::CUE_POINT, self.payload_size())
    }

    /// Write the CuePoint element.
    pub fn write<W: Writer>(&self, writer: &mut W) -> Result<()> {
        let payload_size = self.payload_size();
        codec::write_master_header(writer, ids::CUE_POINT, payload_size)?;
        let payload_position = writer.position();

        codec::write_uint_element(writer, ids::CUE_TIME, self.time)?;

        let positions = self.track_positions_payload_size();
        codec::write_master_header(writer, ids::CUE_TRACK_POSITIONS, positions)?;
        codec::write_uint_element(writer, ids::CUE_TRACK, self.track)?;
        codec::write_uint_element(writer, ids::CUE_CLUSTER_POSITION, self.cluster_pos)?;
        if self.write_block_number() {
            codec::write_uint_element(writer, ids::CUE_BLOCK_NUMBER, self.block_number)?;
        }

        debug_assert_eq!(writer.position() - payload_position, payload_size);
        Ok(())
    }
}

/// Ordered collection of cue points, written as the Cues master element.
pub struct Cues {
    entries: Vec<CuePoint>,
    output_block_number: bool,
}

impl Cues {
    /// Create an empty index.
    pub fn new() -> Self {
        Cues {
            entries: Vec::new(),
            output_block_number: true,
        }
    }

    /// Control whether CueBlockNumber is emitted (when > 1).
    pub fn set_output_block_number(&mut self, output: bool) {
        self.output_block_number = output;
    }

    /// Append a cue point, taking ownership.
    pub fn add_cue(&mut self, mut cue: CuePoint) {
        cue.output_block_number = self.output_block_number;
        self.entries.push(cue);
    }

    /// Cue points in insertion order.
    pub fn entries(&self) -> &[CuePoint] {
        &self.entries
    }

    /// Number of cue points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the Cues master element.
    pub fn write<W: Writer>(&self, writer: &mut W) -> Result<()> {
        let payload_size: u64 = self.entries.iter().map(CuePoint::size).sum();
        codec::write_master_header(writer, ids::CUES, payload_size)?;
        let payload_position = writer.position();

        for cue in &self.entries {
            cue.write(writer)?;
        }

        debug_assert_eq!(writer.position() - payload_position, payload_size);
        Ok(())
    }
}

impl Default for Cues {
    fn default() -> Self {
        Self::new()
    }
}
