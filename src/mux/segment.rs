//! Segment muxer orchestration

use crate::ebml::{codec, ids};
use crate::error::{Error, Result};
use crate::mux::cluster::Cluster;
use crate::mux::cues::{CuePoint, Cues};
use crate::mux::frame::Frame;
use crate::mux::info::SegmentInfo;
use crate::mux::seek_head::SeekHead;
use crate::mux::track::{Track, Tracks};
use crate::writer::Writer;
use tracing::debug;

/// Output mode of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMode {
    /// Seekable output: sizes, duration, SeekHead and Cues are back-patched
    /// at finalize.
    File,
    /// Forward-only output: reserved size fields keep their unknown-size
    /// sentinels and the seek structures are skipped.
    Live,
}

/// Write the EBML document header for a WebM file.
pub fn write_ebml_header<W: Writer>(writer: &mut W) -> Result<()> {
    let mut size = codec::uint_element_size(ids::EBML_VERSION, 1);
    size += codec::uint_element_size(ids::EBML_READ_VERSION, 1);
    size += codec::uint_element_size(ids::EBML_MAX_ID_LENGTH, 4);
    size += codec::uint_element_size(ids::EBML_MAX_SIZE_LENGTH, 8);
    size += codec::string_element_size(ids::DOC_TYPE, "webm");
    size += codec::uint_element_size(ids::DOC_TYPE_VERSION, 2);
    size += codec::uint_element_size(ids::DOC_TYPE_READ_VERSION, 2);

    codec::write_master_header(writer, ids::EBML, size)?;
    codec::write_uint_element(writer, ids::EBML_VERSION, 1)?;
    codec::write_uint_element(writer, ids::EBML_READ_VERSION, 1)?;
    codec::write_uint_element(writer, ids::EBML_MAX_ID_LENGTH, 4)?;
    codec::write_uint_element(writer, ids::EBML_MAX_SIZE_LENGTH, 8)?;
    codec::write_string_element(writer, ids::DOC_TYPE, "webm")?;
    codec::write_uint_element(writer, ids::DOC_TYPE_VERSION, 2)?;
    codec::write_uint_element(writer, ids::DOC_TYPE_READ_VERSION, 2)?;
    Ok(())
}

/// The segment muxer.
///
/// Frames are accepted in presentation order and laid out into clusters in
/// a single forward pass; in [`SegmentMode::File`] a finalize pass
/// back-patches every reserved size field. The writer is borrowed for the
/// segment's lifetime and never closed.
///
/// When a video track exists, incoming audio frames are held in a queue and
/// flushed at cluster boundaries so the audio straddling a video key-frame
/// lands in the same cluster as that key-frame.
pub struct Segment<'w, W: Writer> {
    writer: &'w mut W,
    tracks: Tracks,
    segment_info: SegmentInfo,
    seek_head: SeekHead,
    cues: Cues,
    clusters: Vec<Cluster>,
    queued_frames: Vec<Frame>,
    mode: SegmentMode,
    size_position: u64,
    payload_position: u64,
    max_cluster_duration: u64,
    max_cluster_size: u64,
    last_timestamp: u64,
    output_cues: bool,
    cues_track: u64,
    has_video: bool,
    header_written: bool,
    new_cluster: bool,
    new_cuepoint: bool,
    finalized: bool,
}

impl<'w, W: Writer> Segment<'w, W> {
    /// Create a segment bound to the given writer, in file mode.
    pub fn new(writer: &'w mut W) -> Self {
        Segment {
            writer,
            tracks: Tracks::new(),
            segment_info: SegmentInfo::new(),
            seek_head: SeekHead::new(),
            cues: Cues::new(),
            clusters: Vec::new(),
            queued_frames: Vec::new(),
            mode: SegmentMode::File,
            size_position: 0,
            payload_position: 0,
            max_cluster_duration: 0,
            max_cluster_size: 0,
            last_timestamp: 0,
            output_cues: true,
            cues_track: 0,
            has_video: false,
            header_written: false,
            new_cluster: true,
            new_cuepoint: false,
            finalized: false,
        }
    }

    /// Add a VP8 video track, returning its track number.
    pub fn add_video_track(&mut self, width: u32, height: u32) -> Result<u64> {
        if self.header_written {
            return Err(Error::invalid_state("tracks cannot be added after the header"));
        }
        let number = self.tracks.add_track(Track::video(width, height))?;
        self.has_video = true;
        Ok(number)
    }

    /// Add a Vorbis audio track, returning its track number.
    pub fn add_audio_track(&mut self, sample_rate: f64, channels: u64) -> Result<u64> {
        if self.header_written {
            return Err(Error::invalid_state("tracks cannot be added after the header"));
        }
        self.tracks.add_track(Track::audio(sample_rate, channels))
    }

    /// Registered tracks.
    pub fn tracks(&self) -> &Tracks {
        &self.tracks
    }

    /// Registered tracks, mutable. Entries must not be changed once the
    /// header has been written.
    pub fn tracks_mut(&mut self) -> &mut Tracks {
        &mut self.tracks
    }

    /// Collected cue points.
    pub fn cues(&self) -> &Cues {
        &self.cues
    }

    /// Greatest timestamp written so far, in nanoseconds.
    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Select file or live output. Must be called before the first frame.
    pub fn set_mode(&mut self, mode: SegmentMode) {
        self.mode = mode;
    }

    /// Enable or disable cue point generation (default on).
    pub fn set_output_cues(&mut self, output_cues: bool) {
        self.output_cues = output_cues;
    }

    /// Enable or disable CueBlockNumber emission on collected cue points
    /// (default on).
    pub fn set_cues_block_number(&mut self, output: bool) {
        self.cues.set_output_block_number(output);
    }

    /// Pin the cues to a specific track.
    pub fn set_cues_track(&mut self, track_number: u64) -> Result<()> {
        if self.tracks.track_by_number(track_number).is_none() {
            return Err(Error::invalid_input(format!(
                "cues track {} does not exist",
                track_number
            )));
        }
        self.cues_track = track_number;
        Ok(())
    }

    /// Open a new cluster once the current one spans this many nanoseconds
    /// (0 disables the rule).
    pub fn set_max_cluster_duration(&mut self, duration_ns: u64) {
        self.max_cluster_duration = duration_ns;
    }

    /// Open a new cluster once the current payload reaches this many bytes
    /// (0 disables the rule).
    pub fn set_max_cluster_size(&mut self, size: u64) {
        self.max_cluster_size = size;
    }

    /// Set the timecode scale (nanoseconds per tick). Rejected once the
    /// header has been written.
    pub fn set_timecode_scale(&mut self, scale: u64) -> Result<()> {
        if self.header_written {
            return Err(Error::invalid_state(
                "timecode scale cannot change after the header",
            ));
        }
        if scale == 0 {
            return Err(Error::invalid_input("timecode scale must be positive"));
        }
        self.segment_info.set_timecode_scale(scale);
        Ok(())
    }

    /// Set the writing application string.
    pub fn set_writing_app(&mut self, app: &str) {
        self.segment_info.set_writing_app(app);
    }

    /// Seed the track UID source for reproducible output.
    pub fn set_track_uid_seed(&mut self, seed: u64) {
        self.tracks.set_uid_seed(seed);
    }

    /// Add an encoded frame in presentation order.
    ///
    /// `timestamp` is in nanoseconds; frames must arrive in non-decreasing
    /// timestamp order per track. Audio frames are held back while a video
    /// track exists and written at cluster boundaries.
    pub fn add_frame(
        &mut self,
        data: &[u8],
        track_number: u64,
        timestamp: u64,
        is_key: bool,
    ) -> Result<()> {
        if self.finalized {
            return Err(Error::invalid_state("segment is finalized"));
        }
        if data.is_empty() {
            return Err(Error::invalid_input("frame payload is empty"));
        }
        if self.tracks.track_by_number(track_number).is_none() {
            return Err(Error::invalid_input(format!(
                "unknown track number {}",
                track_number
            )));
        }

        if !self.header_written {
            self.write_segment_header()?;
            self.seek_head
                .add_entry(ids::CLUSTER, self.writer.position() - self.payload_position)?;
            if self.output_cues && self.cues_track == 0 {
                self.cues_track = self
                    .tracks
                    .entries()
                    .iter()
                    .find(|track| track.is_video())
                    .or_else(|| self.tracks.entries().first())
                    .map(Track::number)
                    .unwrap_or(0);
            }
        }

        // Hold audio back while a video track exists so the audio that
        // belongs with a video key-frame ends up in the same cluster.
        if self.has_video && self.tracks.track_is_audio(track_number) {
            self.queued_frames
                .push(Frame::new(data, track_number, timestamp, is_key));
            return Ok(());
        }

        if is_key && self.tracks.track_is_video(track_number) {
            self.new_cluster = true;
        } else if let Some(cluster) = self.clusters.last() {
            let cluster_ts = cluster.timecode() * self.segment_info.timecode_scale();
            if self.max_cluster_duration > 0
                && timestamp.saturating_sub(cluster_ts) >= self.max_cluster_duration
            {
                self.new_cluster = true;
            } else if self.max_cluster_size > 0 && cluster.payload_size() >= self.max_cluster_size
            {
                self.new_cluster = true;
            }
        }

        if self.new_cluster {
            self.open_cluster(timestamp)?;
        }

        // Everything still held belongs to the current cluster now.
        self.write_frames_all()?;

        self.write_block(data, track_number, timestamp, is_key)?;
        if timestamp > self.last_timestamp {
            self.last_timestamp = timestamp;
        }
        Ok(())
    }

    /// Close the segment: flush held frames and, in file mode, back-patch
    /// every reserved size field and write the Cues and SeekHead.
    ///
    /// The segment rejects any further operation afterwards.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::invalid_state("segment already finalized"));
        }
        if !self.header_written {
            self.write_segment_header()?;
        }

        // Held audio that never saw a cluster boundary still needs a home.
        if !self.queued_frames.is_empty() && self.clusters.is_empty() {
            let timecode = self.queued_frames[0].timestamp() / self.segment_info.timecode_scale();
            let position = self.writer.position();
            self.clusters.push(Cluster::new(timecode, position));
            if self.mode == SegmentMode::File && self.output_cues {
                self.new_cuepoint = true;
            }
            self.new_cluster = false;
        }
        self.write_frames_all()?;

        if self.mode == SegmentMode::File {
            if let Some(cluster) = self.clusters.last_mut() {
                cluster.finalize(&mut *self.writer)?;
            }

            let duration =
                self.last_timestamp as f64 / self.segment_info.timecode_scale() as f64;
            self.segment_info.set_duration(duration);
            self.segment_info.finalize(&mut *self.writer)?;

            self.seek_head
                .add_entry(ids::CUES, self.writer.position() - self.payload_position)?;
            self.cues.write(&mut *self.writer)?;

            self.seek_head.finalize(&mut *self.writer)?;

            if self.writer.seekable() {
                let end = self.writer.position();
                // 8 bytes of size field sit between the saved position and
                // the payload itself.
                let segment_size = end - self.size_position - 8;
                self.writer.set_position(self.size_position)?;
                codec::write_vint(&mut *self.writer, segment_size, 8)?;
                self.writer.set_position(end)?;
            }
        }

        self.finalized = true;
        debug!(
            clusters = self.clusters.len(),
            cues = self.cues.len(),
            last_timestamp = self.last_timestamp,
            "segment finalized"
        );
        Ok(())
    }

    fn write_segment_header(&mut self) -> Result<()> {
        write_ebml_header(&mut *self.writer)?;

        codec::write_id(&mut *self.writer, ids::SEGMENT)?;
        self.size_position = self.writer.position();
        codec::write_vint(&mut *self.writer, codec::UNKNOWN_SIZE, 8)?;
        self.payload_position = self.writer.position();

        if self.mode == SegmentMode::File && self.writer.seekable() {
            // Positive sentinel so Info reserves a Duration field that the
            // finalize pass can patch with the real value.
            self.segment_info.set_duration(1.0);
            self.seek_head.write(&mut *self.writer)?;
        }

        self.seek_head
            .add_entry(ids::INFO, self.writer.position() - self.payload_position)?;
        self.segment_info.write(&mut *self.writer)?;

        self.seek_head
            .add_entry(ids::TRACKS, self.writer.position() - self.payload_position)?;
        self.tracks.write(&mut *self.writer)?;

        self.header_written = true;
        debug!(
            tracks = self.tracks.len(),
            payload_position = self.payload_position,
            "segment header written"
        );
        Ok(())
    }

    fn open_cluster(&mut self, timestamp: u64) -> Result<()> {
        // Queued audio older than the boundary belongs to the cluster that
        // is about to close.
        self.write_frames_less_than(timestamp)?;

        let scale = self.segment_info.timecode_scale();
        let mut timecode = timestamp / scale;
        if let Some(first) = self.queued_frames.first() {
            // Drop the base so held audio stays representable with a
            // non-negative relative offset.
            let audio_timecode = first.timestamp() / scale;
            if audio_timecode < timecode {
                timecode = audio_timecode;
            }
        }

        let position = self.writer.position();
        self.clusters.push(Cluster::new(timecode, position));

        if self.mode == SegmentMode::File {
            if self.clusters.len() > 1 {
                let previous = self.clusters.len() - 2;
                self.clusters[previous].finalize(&mut *self.writer)?;
            }
            if self.output_cues {
                self.new_cuepoint = true;
            }
        }

        self.new_cluster = false;
        debug!(timecode, position, "opened cluster");
        Ok(())
    }

    /// Write one block into the current cluster, appending a cue point
    /// first if one is armed for this track.
    fn write_block(
        &mut self,
        data: &[u8],
        track_number: u64,
        timestamp: u64,
        is_key: bool,
    ) -> Result<()> {
        let scale = self.segment_info.timecode_scale();
        let cluster = self
            .clusters
            .last_mut()
            .ok_or_else(|| Error::invalid_state("no cluster open"))?;

        let relative = (timestamp / scale) as i64 - cluster.timecode() as i64;
        if relative < 0 || relative > i64::from(i16::MAX) {
            return Err(Error::invalid_input(format!(
                "relative timecode {} outside the signed 16-bit range",
                relative
            )));
        }

        if self.new_cuepoint && self.cues_track == track_number {
            self.cues.add_cue(CuePoint::new(
                timestamp / scale,
                track_number,
                cluster.position() - self.payload_position,
                cluster.blocks_added() + 1,
            ));
            self.new_cuepoint = false;
        }

        cluster.add_frame(&mut *self.writer, data, track_number, relative as i16, is_key)
    }

    /// Flush every held frame into the current cluster, in order.
    fn write_frames_all(&mut self) -> Result<()> {
        if self.queued_frames.is_empty() {
            return Ok(());
        }
        let frames = std::mem::take(&mut self.queued_frames);
        for frame in &frames {
            self.write_block(
                frame.data(),
                frame.track_number(),
                frame.timestamp(),
                frame.is_key(),
            )?;
            if frame.timestamp() > self.last_timestamp {
                self.last_timestamp = frame.timestamp();
            }
        }
        Ok(())
    }

    /// Flush held frames older than `timestamp` into the current cluster.
    ///
    /// One-frame look-ahead: a held frame is only written once the frame
    /// *after* it is known to sit at or before the boundary, so the last
    /// held frame always stays queued until a strictly later frame arrives.
    fn write_frames_less_than(&mut self, timestamp: u64) -> Result<()> {
        if self.queued_frames.is_empty() || self.clusters.is_empty() {
            return Ok(());
        }

        let mut flushed = 0;
        while flushed + 1 < self.queued_frames.len()
            && self.queued_frames[flushed + 1].timestamp() <= timestamp
        {
            flushed += 1;
        }
        if flushed == 0 {
            return Ok(());
        }

        let rest = self.queued_frames.split_off(flushed);
        let frames = std::mem::replace(&mut self.queued_frames, rest);
        for frame in &frames {
            self.write_block(
                frame.data(),
                frame.track_number(),
                frame.timestamp(),
                frame.is_key(),
            )?;
            if frame.timestamp() > self.last_timestamp {
                self.last_timestamp = frame.timestamp();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::IoWriter;
    use std::io::Cursor;

    #[test]
    fn test_add_frame_requires_known_track() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut segment = Segment::new(&mut writer);
        segment.add_video_track(640, 480).unwrap();
        assert!(segment.add_frame(&[0], 2, 0, true).is_err());
    }

    #[test]
    fn test_add_frame_rejects_empty_payload() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut segment = Segment::new(&mut writer);
        segment.add_video_track(640, 480).unwrap();
        assert!(matches!(
            segment.add_frame(&[], 1, 0, true),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tracks_frozen_after_header() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut segment = Segment::new(&mut writer);
        segment.add_video_track(640, 480).unwrap();
        segment.add_frame(&[0], 1, 0, true).unwrap();
        assert!(segment.add_audio_track(44100.0, 2).is_err());
    }

    #[test]
    fn test_cues_track_must_exist() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut segment = Segment::new(&mut writer);
        segment.add_video_track(640, 480).unwrap();
        assert!(segment.set_cues_track(1).is_ok());
        assert!(segment.set_cues_track(3).is_err());
    }

    #[test]
    fn test_timecode_scale_frozen_after_header() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut segment = Segment::new(&mut writer);
        segment.add_video_track(640, 480).unwrap();
        segment.set_timecode_scale(100_000).unwrap();
        segment.add_frame(&[0], 1, 0, true).unwrap();
        assert!(segment.set_timecode_scale(1_000_000).is_err());
        assert!(segment.set_timecode_scale(0).is_err());
    }

    #[test]
    fn test_relative_timecode_overflow_is_rejected() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut segment = Segment::new(&mut writer);
        segment.add_video_track(640, 480).unwrap();
        segment.add_frame(&[0], 1, 0, true).unwrap();
        // 40s after the cluster base overflows i16 ticks of 1ms
        assert!(segment.add_frame(&[0], 1, 40_000_000_000, false).is_err());
    }

    #[test]
    fn test_last_timestamp_is_monotone() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut segment = Segment::new(&mut writer);
        segment.add_video_track(640, 480).unwrap();
        segment.add_frame(&[0], 1, 0, true).unwrap();
        assert_eq!(segment.last_timestamp(), 0);
        segment.add_frame(&[0], 1, 20_000_000, false).unwrap();
        assert_eq!(segment.last_timestamp(), 20_000_000);
        segment.add_frame(&[0], 1, 25_000_000, false).unwrap();
        assert_eq!(segment.last_timestamp(), 25_000_000);
    }
}
