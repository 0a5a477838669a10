//! WebM segment muxing
//!
//! The segment muxer accepts encoded VP8 video and Vorbis audio frames in
//! presentation order and lays them out into a valid WebM Segment: track
//! headers, timecoded clusters of SimpleBlocks, the Cues seek index, and
//! the SeekHead placeholder that is back-patched on finalize.

pub mod cluster;
pub mod cues;
pub mod frame;
pub mod info;
pub mod seek_head;
pub mod segment;
pub mod track;

pub use cluster::Cluster;
pub use cues::{CuePoint, Cues};
pub use frame::Frame;
pub use info::SegmentInfo;
pub use seek_head::SeekHead;
pub use segment::{write_ebml_header, Segment, SegmentMode};
pub use track::{
    AudioSettings, Track, TrackSettings, Tracks, UidGenerator, VideoSettings,
};
