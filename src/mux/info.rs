//! SegmentInfo element

use crate::ebml::{codec, ids};
use crate::error::Result;
use crate::writer::Writer;

const APP_NAME: &str = concat!("webmux-", env!("CARGO_PKG_VERSION"));

/// Segment-wide metadata: timecode scale, duration, application strings.
///
/// The duration is absent until set. When it is positive at write time the
/// element's byte position is recorded so [`SegmentInfo::finalize`] can
/// back-patch the real value after the last frame is known.
pub struct SegmentInfo {
    timecode_scale: u64,
    duration: Option<f64>,
    duration_position: Option<u64>,
    muxing_app: String,
    writing_app: String,
}

impl SegmentInfo {
    /// Create segment info with the default 1 ms timecode scale.
    pub fn new() -> Self {
        SegmentInfo {
            timecode_scale: 1_000_000,
            duration: None,
            duration_position: None,
            muxing_app: APP_NAME.to_string(),
            writing_app: APP_NAME.to_string(),
        }
    }

    /// Nanoseconds per timecode tick.
    pub fn timecode_scale(&self) -> u64 {
        self.timecode_scale
    }

    /// Set the timecode scale. Must happen before the element is written.
    pub fn set_timecode_scale(&mut self, scale: u64) {
        debug_assert!(scale > 0);
        self.timecode_scale = scale;
    }

    /// Duration in scaled units, if known.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Set the duration in scaled units.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = Some(duration);
    }

    /// Set the writing application string.
    pub fn set_writing_app(&mut self, app: &str) {
        self.writing_app = app.to_string();
    }

    fn duration_reserved(&self) -> bool {
        matches!(self.duration, Some(duration) if duration > 0.0)
    }

    fn payload_size(&self) -> u64 {
        let mut size = codec::uint_element_size(ids::TIMECODE_SCALE, self.timecode_scale);
        if self.duration_reserved() {
            size += codec::float_element_size(ids::DURATION);
        }
        size += codec::string_element_size(ids::MUXING_APP, &self.muxing_app);
        size += codec::string_element_size(ids::WRITING_APP, &self.writing_app);
        size
    }

    /// Write the Info master element, recording the duration position when
    /// a duration is reserved.
    pub fn write<W: Writer>(&mut self, writer: &mut W) -> Result<()> {
        let payload_size = self.payload_size();
        codec::write_master_header(writer, ids::INFO, payload_size)?;
        let payload_position = writer.position();

        codec::write_uint_element(writer, ids::TIMECODE_SCALE, self.timecode_scale)?;
        if self.duration_reserved() {
            self.duration_position = Some(writer.position());
            codec::write_float_element(writer, ids::DURATION, self.duration.unwrap_or(0.0) as f32)?;
        }
        codec::write_string_element(writer, ids::MUXING_APP, &self.muxing_app)?;
        codec::write_string_element(writer, ids::WRITING_APP, &self.writing_app)?;

        debug_assert_eq!(writer.position() - payload_position, payload_size);
        Ok(())
    }

    /// Back-patch the duration element with the current value, if a
    /// position was reserved and the writer can seek.
    pub fn finalize<W: Writer>(&self, writer: &mut W) -> Result<()> {
        if let Some(position) = self.duration_position {
            if writer.seekable() {
                let end = writer.position();
                writer.set_position(position)?;
                codec::write_float_element(
                    writer,
                    ids::DURATION,
                    self.duration.unwrap_or(0.0) as f32,
                )?;
                writer.set_position(end)?;
            }
        }
        Ok(())
    }
}

impl Default for SegmentInfo {
    fn default() -> Self {
        Self::new()
    }
}
