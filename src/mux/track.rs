//! Track metadata and the Tracks registry

use crate::ebml::{codec, ids};
use crate::error::{Error, Result};
use crate::writer::Writer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Codec id written for every video track.
pub const VP8_CODEC_ID: &str = "V_VP8";
/// Codec id written for every audio track.
pub const VORBIS_CODEC_ID: &str = "A_VORBIS";

/// TrackType value for video tracks.
pub const VIDEO_TRACK_TYPE: u64 = 1;
/// TrackType value for audio tracks.
pub const AUDIO_TRACK_TYPE: u64 = 2;

/// SimpleBlock stores the track number as a 1-byte vint, so a segment can
/// carry at most this many tracks.
pub const MAX_TRACKS: u64 = 126;

/// Source of track UIDs.
///
/// UIDs are 56 random bits in the low seven bytes of a 64-bit word. The
/// upper byte stays zero so the value remains representable as an 8-byte
/// EBML vint without colliding with the width marker.
pub struct UidGenerator {
    rng: StdRng,
}

impl UidGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new() -> Self {
        UidGenerator {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic generator for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        UidGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce the next 56-bit UID.
    pub fn make_uid(&mut self) -> u64 {
        let mut uid: u64 = 0;
        for _ in 0..7 {
            uid = (uid << 8) | u64::from(self.rng.gen::<u8>());
        }
        uid
    }
}

impl Default for UidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Video-specific track settings.
#[derive(Debug, Clone)]
pub struct VideoSettings {
    width: u32,
    height: u32,
    display_width: Option<u32>,
    display_height: Option<u32>,
    stereo_mode: Option<u64>,
    frame_rate: Option<f64>,
}

impl VideoSettings {
    fn new(width: u32, height: u32) -> Self {
        VideoSettings {
            width,
            height,
            display_width: None,
            display_height: None,
            stereo_mode: None,
            frame_rate: None,
        }
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Set the display dimensions written alongside the pixel dimensions.
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        self.display_width = Some(width);
        self.display_height = Some(height);
    }

    /// Set the stereo mode. Only {0, 1, 2, 3, 11} are defined.
    pub fn set_stereo_mode(&mut self, mode: u64) -> Result<()> {
        match mode {
            0 | 1 | 2 | 3 | 11 => {
                self.stereo_mode = Some(mode);
                Ok(())
            }
            _ => Err(Error::invalid_input(format!(
                "stereo mode {} is not defined",
                mode
            ))),
        }
    }

    /// Set the nominal frame rate hint.
    pub fn set_frame_rate(&mut self, rate: f64) {
        self.frame_rate = Some(rate);
    }

    fn payload_size(&self) -> u64 {
        let mut size = codec::uint_element_size(ids::PIXEL_WIDTH, u64::from(self.width));
        size += codec::uint_element_size(ids::PIXEL_HEIGHT, u64::from(self.height));
        if let Some(width) = self.display_width {
            size += codec::uint_element_size(ids::DISPLAY_WIDTH, u64::from(width));
        }
        if let Some(height) = self.display_height {
            size += codec::uint_element_size(ids::DISPLAY_HEIGHT, u64::from(height));
        }
        if let Some(mode) = self.stereo_mode {
            size += codec::uint_element_size(ids::STEREO_MODE, mode);
        }
        if self.frame_rate.is_some() {
            size += codec::float_element_size(ids::FRAME_RATE);
        }
        size
    }

    fn write<W: Writer>(&self, writer: &mut W) -> Result<()> {
        codec::write_uint_element(writer, ids::PIXEL_WIDTH, u64::from(self.width))?;
        codec::write_uint_element(writer, ids::PIXEL_HEIGHT, u64::from(self.height))?;
        if let Some(width) = self.display_width {
            codec::write_uint_element(writer, ids::DISPLAY_WIDTH, u64::from(width))?;
        }
        if let Some(height) = self.display_height {
            codec::write_uint_element(writer, ids::DISPLAY_HEIGHT, u64::from(height))?;
        }
        if let Some(mode) = self.stereo_mode {
            codec::write_uint_element(writer, ids::STEREO_MODE, mode)?;
        }
        if let Some(rate) = self.frame_rate {
            codec::write_float_element(writer, ids::FRAME_RATE, rate as f32)?;
        }
        Ok(())
    }
}

/// Audio-specific track settings.
#[derive(Debug, Clone)]
pub struct AudioSettings {
    sample_rate: f64,
    channels: u64,
    bit_depth: Option<u64>,
}

impl AudioSettings {
    fn new(sample_rate: f64, channels: u64) -> Self {
        AudioSettings {
            sample_rate,
            channels,
            bit_depth: None,
        }
    }

    /// Sampling frequency in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Channel count.
    pub fn channels(&self) -> u64 {
        self.channels
    }

    /// Set the bit depth.
    pub fn set_bit_depth(&mut self, depth: u64) {
        self.bit_depth = Some(depth);
    }

    fn payload_size(&self) -> u64 {
        let mut size = codec::float_element_size(ids::SAMPLING_FREQUENCY);
        size += codec::uint_element_size(ids::CHANNELS, self.channels);
        if let Some(depth) = self.bit_depth {
            size += codec::uint_element_size(ids::BIT_DEPTH, depth);
        }
        size
    }

    fn write<W: Writer>(&self, writer: &mut W) -> Result<()> {
        codec::write_float_element(writer, ids::SAMPLING_FREQUENCY, self.sample_rate as f32)?;
        codec::write_uint_element(writer, ids::CHANNELS, self.channels)?;
        if let Some(depth) = self.bit_depth {
            codec::write_uint_element(writer, ids::BIT_DEPTH, depth)?;
        }
        Ok(())
    }
}

/// The per-kind trailing settings master of a track entry.
#[derive(Debug, Clone)]
pub enum TrackSettings {
    Video(VideoSettings),
    Audio(AudioSettings),
}

impl TrackSettings {
    fn element_id(&self) -> u64 {
        match self {
            TrackSettings::Video(_) => ids::VIDEO,
            TrackSettings::Audio(_) => ids::AUDIO,
        }
    }

    fn payload_size(&self) -> u64 {
        match self {
            TrackSettings::Video(video) => video.payload_size(),
            TrackSettings::Audio(audio) => audio.payload_size(),
        }
    }

    fn write<W: Writer>(&self, writer: &mut W) -> Result<()> {
        match self {
            TrackSettings::Video(video) => video.write(writer),
            TrackSettings::Audio(audio) => audio.write(writer),
        }
    }
}

/// A single track entry: common identity plus kind-specific settings.
///
/// The number and UID are assigned when the track is registered with
/// [`Tracks::add_track`]; entries are immutable once written.
#[derive(Debug, Clone)]
pub struct Track {
    number: u64,
    uid: u64,
    codec_id: String,
    codec_private: Option<Vec<u8>>,
    language: Option<String>,
    name: Option<String>,
    settings: TrackSettings,
}

impl Track {
    /// Create a VP8 video track.
    pub fn video(width: u32, height: u32) -> Self {
        Track {
            number: 0,
            uid: 0,
            codec_id: VP8_CODEC_ID.to_string(),
            codec_private: None,
            language: None,
            name: None,
            settings: TrackSettings::Video(VideoSettings::new(width, height)),
        }
    }

    /// Create a Vorbis audio track.
    pub fn audio(sample_rate: f64, channels: u64) -> Self {
        Track {
            number: 0,
            uid: 0,
            codec_id: VORBIS_CODEC_ID.to_string(),
            codec_private: None,
            language: None,
            name: None,
            settings: TrackSettings::Audio(AudioSettings::new(sample_rate, channels)),
        }
    }

    /// Assigned track number (0 until registered).
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Assigned track UID (0 until registered).
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Codec identifier string.
    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    /// TrackType value derived from the settings variant.
    pub fn track_type(&self) -> u64 {
        match self.settings {
            TrackSettings::Video(_) => VIDEO_TRACK_TYPE,
            TrackSettings::Audio(_) => AUDIO_TRACK_TYPE,
        }
    }

    /// Whether this is a video track.
    pub fn is_video(&self) -> bool {
        matches!(self.settings, TrackSettings::Video(_))
    }

    /// Whether this is an audio track.
    pub fn is_audio(&self) -> bool {
        matches!(self.settings, TrackSettings::Audio(_))
    }

    /// Kind-specific settings.
    pub fn settings(&self) -> &TrackSettings {
        &self.settings
    }

    /// Kind-specific settings, mutable.
    pub fn settings_mut(&mut self) -> &mut TrackSettings {
        &mut self.settings
    }

    /// Attach a codec-private blob (must be non-empty).
    pub fn set_codec_private(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::invalid_input("codec private data is empty"));
        }
        self.codec_private = Some(data.to_vec());
        Ok(())
    }

    /// Set the track language.
    pub fn set_language(&mut self, language: &str) {
        self.language = Some(language.to_string());
    }

    /// Set the human-readable track name.
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn common_payload_size(&self) -> u64 {
        let mut size = codec::uint_element_size(ids::TRACK_NUMBER, self.number);
        size += codec::uint_element_size(ids::TRACK_UID, self.uid);
        size += codec::uint_element_size(ids::TRACK_TYPE, self.track_type());
        size += codec::string_element_size(ids::CODEC_ID, &self.codec_id);
        if let Some(private) = &self.codec_private {
            size += codec::binary_element_size(ids::CODEC_PRIVATE, private.len() as u64);
        }
        if let Some(language) = &self.language {
            size += codec::string_element_size(ids::LANGUAGE, language);
        }
        if let Some(name) = &self.name {
            size += codec::string_element_size(ids::NAME, name);
        }
        size
    }

    /// Serialized size of the TrackEntry payload.
    pub fn payload_size(&self) -> u64 {
        let settings_payload = self.settings.payload_size();
        self.common_payload_size()
            + codec::master_element_size(self.settings.element_id(), settings_payload)
    }

    /// Serialized size of the whole TrackEntry element.
    pub fn size(&self) -> u64 {
        codec::master_element_size(ids::TRACK_ENTRY, self.payload_size())
    }

    /// Write the TrackEntry element.
    pub fn write<W: Writer>(&self, writer: &mut W) -> Result<()> {
        let payload_size = self.payload_size();
        codec::write_master_header(writer, ids::TRACK_ENTRY, payload_size)?;
        let payload_position = writer.position();

        codec::write_uint_element(writer, ids::TRACK_NUMBER, self.number)?;
        codec::write_uint_element(writer, ids::TRACK_UID, self.uid)?;
        codec::write_uint_element(writer, ids::TRACK_TYPE, self.track_type())?;
        codec::write_string_element(writer, ids::CODEC_ID, &self.codec_id)?;
        if let Some(private) = &self.codec_private {
            codec::write_binary_element(writer, ids::CODEC_PRIVATE, private)?;
        }
        if let Some(language) = &self.language {
            codec::write_string_element(writer, ids::LANGUAGE, language)?;
        }
        if let Some(name) = &self.name {
            codec::write_string_element(writer, ids::NAME, name)?;
        }

        let settings_payload = self.settings.payload_size();
        codec::write_master_header(writer, self.settings.element_id(), settings_payload)?;
        self.settings.write(writer)?;

        debug_assert_eq!(writer.position() - payload_position, payload_size);
        Ok(())
    }
}

/// Ordered track registry emitting the Tracks master element.
pub struct Tracks {
    entries: Vec<Track>,
    uids: UidGenerator,
}

impl Tracks {
    /// Create an empty registry with an entropy-seeded UID source.
    pub fn new() -> Self {
        Tracks {
            entries: Vec::new(),
            uids: UidGenerator::new(),
        }
    }

    /// Replace the UID source, for deterministic output.
    pub fn set_uid_seed(&mut self, seed: u64) {
        self.uids = UidGenerator::with_seed(seed);
    }

    /// Register a track: assigns the next dense 1-based number and a fresh
    /// UID, and returns the number.
    pub fn add_track(&mut self, mut track: Track) -> Result<u64> {
        if self.entries.len() as u64 >= MAX_TRACKS {
            return Err(Error::invalid_state(format!(
                "segment already has {} tracks",
                MAX_TRACKS
            )));
        }
        let number = self.entries.len() as u64 + 1;
        track.number = number;
        track.uid = self.uids.make_uid();
        self.entries.push(track);
        Ok(number)
    }

    /// Number of registered tracks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no track has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered tracks in order.
    pub fn entries(&self) -> &[Track] {
        &self.entries
    }

    /// Look up a track by its assigned number.
    pub fn track_by_number(&self, number: u64) -> Option<&Track> {
        self.entries.iter().find(|track| track.number == number)
    }

    /// Whether the given track number names a video track.
    pub fn track_is_video(&self, number: u64) -> bool {
        self.track_by_number(number)
            .map(Track::is_video)
            .unwrap_or(false)
    }

    /// Whether the given track number names an audio track.
    pub fn track_is_audio(&self, number: u64) -> bool {
        self.track_by_number(number)
            .map(Track::is_audio)
            .unwrap_or(false)
    }

    /// Write the Tracks master element.
    pub fn write<W: Writer>(&self, writer: &mut W) -> Result<()> {
        let payload_size: u64 = self.entries.iter().map(Track::size).sum();
        codec::write_master_header(writer, ids::TRACKS, payload_size)?;
        let payload_position = writer.position();

        for track in &self.entries {
            track.write(writer)?;
        }

        debug_assert_eq!(writer.position() - payload_position, payload_size);
        Ok(())
    }
}

impl Default for Tracks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::IoWriter;
    use std::io::Cursor;

    #[test]
    fn test_uid_upper_byte_is_zero() {
        let mut uids = UidGenerator::with_seed(7);
        for _ in 0..64 {
            assert_eq!(uids.make_uid() >> 56, 0);
        }
    }

    #[test]
    fn test_uid_seed_is_deterministic() {
        let mut a = UidGenerator::with_seed(42);
        let mut b = UidGenerator::with_seed(42);
        assert_eq!(a.make_uid(), b.make_uid());
        assert_eq!(a.make_uid(), b.make_uid());
    }

    #[test]
    fn test_track_numbers_are_dense_from_one() {
        let mut tracks = Tracks::new();
        assert_eq!(tracks.add_track(Track::video(640, 480)).unwrap(), 1);
        assert_eq!(tracks.add_track(Track::audio(44100.0, 2)).unwrap(), 2);
        assert_eq!(tracks.add_track(Track::audio(48000.0, 1)).unwrap(), 3);
        assert!(tracks.track_is_video(1));
        assert!(tracks.track_is_audio(2));
        assert!(!tracks.track_is_audio(9));
    }

    #[test]
    fn test_stereo_mode_validation() {
        let mut track = Track::video(320, 240);
        let TrackSettings::Video(video) = track.settings_mut() else {
            panic!("expected video settings");
        };
        assert!(video.set_stereo_mode(1).is_ok());
        assert!(video.set_stereo_mode(11).is_ok());
        assert!(video.set_stereo_mode(4).is_err());
        assert!(video.set_stereo_mode(12).is_err());
    }

    #[test]
    fn test_codec_private_rejects_empty() {
        let mut track = Track::audio(44100.0, 2);
        assert!(track.set_codec_private(&[]).is_err());
        assert!(track.set_codec_private(&[0x02, 0x20, 0x20]).is_ok());
    }

    #[test]
    fn test_track_entry_size_matches_written_bytes() {
        let mut tracks = Tracks::new();
        tracks.set_uid_seed(1);
        let mut video = Track::video(1920, 1080);
        video.set_language("und");
        video.set_name("main video");
        tracks.add_track(video).unwrap();
        let mut audio = Track::audio(48000.0, 2);
        audio.set_codec_private(&[1, 2, 3, 4]).unwrap();
        tracks.add_track(audio).unwrap();

        let track = &tracks.entries()[0];
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        track.write(&mut writer).unwrap();
        assert_eq!(writer.position(), track.size());

        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        tracks.write(&mut writer).unwrap();
        let expected: u64 = tracks.entries().iter().map(Track::size).sum();
        assert_eq!(
            writer.position(),
            codec::master_element_size(ids::TRACKS, expected)
        );
    }

    #[test]
    fn test_track_entry_starts_with_entry_id() {
        let mut tracks = Tracks::new();
        tracks.set_uid_seed(3);
        tracks.add_track(Track::video(640, 480)).unwrap();
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        tracks.write(&mut writer).unwrap();
        let bytes = writer.into_inner().into_inner();
        // Tracks id, 8-byte size, TrackEntry id
        assert_eq!(&bytes[0..4], &[0x16, 0x54, 0xAE, 0x6B]);
        assert_eq!(bytes[12], 0xAE);
    }
}
