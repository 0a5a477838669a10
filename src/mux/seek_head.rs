//! SeekHead index with up-front void reservation

use crate::ebml::{codec, ids};
use crate::error::{Error, Result};
use crate::writer::Writer;

const SEEK_ENTRY_COUNT: usize = 5;

/// Fixed-slot index of top-level element positions.
///
/// [`SeekHead::write`] reserves space at the front of the segment as a
/// single Void element sized for the worst case (32-bit ids, 64-bit
/// positions). [`SeekHead::finalize`] overwrites the reservation with the
/// populated entries and a trailing Void covering the remainder.
pub struct SeekHead {
    entry_ids: [u64; SEEK_ENTRY_COUNT],
    entry_positions: [u64; SEEK_ENTRY_COUNT],
    start_position: Option<u64>,
}

impl SeekHead {
    /// Create an empty seek head.
    pub fn new() -> Self {
        SeekHead {
            entry_ids: [0; SEEK_ENTRY_COUNT],
            entry_positions: [0; SEEK_ENTRY_COUNT],
            start_position: None,
        }
    }

    fn max_entry_size() -> u64 {
        let payload = codec::uint_element_size(ids::SEEK_ID, 0xFFFF_FFFF)
            + codec::uint_element_size(ids::SEEK_POSITION, u64::MAX);
        codec::master_element_size(ids::SEEK, payload)
    }

    /// Total bytes reserved for the placeholder.
    pub fn reserved_size() -> u64 {
        let max_payload = SEEK_ENTRY_COUNT as u64 * Self::max_entry_size();
        codec::master_element_size(ids::SEEK_HEAD, max_payload)
    }

    /// Store an entry in the first empty slot. Positions are relative to
    /// the segment payload start.
    pub fn add_entry(&mut self, id: u64, position: u64) -> Result<()> {
        for i in 0..SEEK_ENTRY_COUNT {
            if self.entry_ids[i] == 0 {
                self.entry_ids[i] = id;
                self.entry_positions[i] = position;
                return Ok(());
            }
        }
        Err(Error::invalid_state("seek head has no free slot"))
    }

    /// Reserve the placeholder at the current position.
    pub fn write<W: Writer>(&mut self, writer: &mut W) -> Result<()> {
        self.start_position = Some(writer.position());
        codec::write_void(writer, Self::reserved_size())?;
        Ok(())
    }

    /// Overwrite the reservation with the populated entries (seekable
    /// writers only). With no populated slot, nothing is written.
    pub fn finalize<W: Writer>(&self, writer: &mut W) -> Result<()> {
        if !writer.seekable() {
            return Ok(());
        }
        let start = self
            .start_position
            .ok_or_else(|| Error::invalid_state("seek head was never reserved"))?;

        let mut entry_sizes = [0u64; SEEK_ENTRY_COUNT];
        let mut payload_size = 0;
        for i in 0..SEEK_ENTRY_COUNT {
            if self.entry_ids[i] != 0 {
                entry_sizes[i] = codec::uint_element_size(ids::SEEK_ID, self.entry_ids[i])
                    + codec::uint_element_size(ids::SEEK_POSITION, self.entry_positions[i]);
                payload_size += codec::master_element_size(ids::SEEK, entry_sizes[i]);
            }
        }
        if payload_size == 0 {
            return Ok(());
        }

        let end = writer.position();
        writer.set_position(start)?;

        codec::write_master_header(writer, ids::SEEK_HEAD, payload_size)?;
        for i in 0..SEEK_ENTRY_COUNT {
            if self.entry_ids[i] != 0 {
                codec::write_master_header(writer, ids::SEEK, entry_sizes[i])?;
                codec::write_uint_element(writer, ids::SEEK_ID, self.entry_ids[i])?;
                codec::write_uint_element(writer, ids::SEEK_POSITION, self.entry_positions[i])?;
            }
        }

        let written = writer.position() - start;
        let size_left = Self::reserved_size() - written;
        if size_left > 0 {
            codec::write_void(writer, size_left)?;
        }

        writer.set_position(end)?;
        Ok(())
    }
}

impl Default for SeekHead {
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
    fn test_placeholder_is_single_void_of_reserved_size() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut seek_head = SeekHead::new();
        seek_head.write(&mut writer).unwrap();
        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes.len() as u64, SeekHead::reserved_size());
        assert_eq!(bytes[0], 0xEC);
    }

    #[test]
    fn test_add_entry_overflows_after_five() {
        let mut seek_head = SeekHead::new();
        for i in 0..5 {
            seek_head.add_entry(ids::INFO, i * 100).unwrap();
        }
        assert!(seek_head.add_entry(ids::CUES, 9999).is_err());
    }

    #[test]
    fn test_finalize_rewrites_reservation_in_place() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut seek_head = SeekHead::new();
        seek_head.write(&mut writer).unwrap();
        // trailing data that must survive untouched
        writer.write(&[0xAB; 16]).unwrap();
        let end = writer.position();

        seek_head.add_entry(ids::INFO, 152).unwrap();
        seek_head.add_entry(ids::TRACKS, 300).unwrap();
        seek_head.finalize(&mut writer).unwrap();
        assert_eq!(writer.position(), end);

        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes.len() as u64, SeekHead::reserved_size() + 16);
        // SeekHead id at the reservation start
        assert_eq!(&bytes[0..4], &[0x11, 0x4D, 0x9B, 0x74]);
        // trailing bytes untouched
        assert_eq!(&bytes[bytes.len() - 16..], &[0xAB; 16]);

        // the rewritten region ends with a Void consuming the remainder
        let mut size_bytes = [0u8; 8];
        size_bytes.copy_from_slice(&bytes[4..12]);
        let payload = u64::from_be_bytes(size_bytes) & codec::UNKNOWN_SIZE;
        let void_at = 12 + payload as usize;
        assert_eq!(bytes[void_at], 0xEC);
    }

    #[test]
    fn test_finalize_without_entries_writes_nothing() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        let mut seek_head = SeekHead::new();
        seek_head.write(&mut writer).unwrap();
        let before = writer.get_ref().get_ref().clone();
        seek_head.finalize(&mut writer).unwrap();
        assert_eq!(writer.get_ref().get_ref(), &before);
    }

    #[test]
    fn test_finalize_noop_on_unseekable_writer() {
        use crate::writer::StreamWriter;
        let mut writer = StreamWriter::new(Vec::new());
        let seek_head = SeekHead::new();
        // never reserved, but non-seekable finalize must still succeed
        assert!(seek_head.finalize(&mut writer).is_ok());
    }
}
