//! webmux - a WebM muxing library written in pure Rust
//!
//! webmux writes WebM containers (the Matroska profile restricted to VP8
//! video and Vorbis audio) in a single forward pass, with an optional
//! finalize pass that back-patches sizes, duration, the Cues index, and the
//! SeekHead when the output supports seeking.
//!
//! # Architecture
//!
//! - `ebml`: EBML element serialization and size arithmetic
//! - `writer`: the abstract output sink plus file/stream implementations
//! - `mux`: tracks, clusters, cues, seek head, segment info, and the
//!   `Segment` muxer that orchestrates them
//! - `error`: common error type
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use webmux::{IoWriter, Segment};
//!
//! # fn main() -> webmux::Result<()> {
//! let file = File::create("out.webm")?;
//! let mut writer = IoWriter::new(file);
//! let mut segment = Segment::new(&mut writer);
//! let video = segment.add_video_track(640, 480)?;
//! segment.add_frame(&[0u8; 1], video, 0, true)?;
//! segment.finalize()?;
//! # Ok(())
//! # }
//! ```

pub mod ebml;
pub mod error;
pub mod mux;
pub mod writer;

pub use error::{Error, Result};
pub use mux::{Segment, SegmentMode};
pub use writer::{IoWriter, StreamWriter, Writer};

/// webmux version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
