//! EBML element serialization
//!
//! EBML elements are (id)(size)(payload). Ids are emitted verbatim; sizes
//! are vints — variable-length integers whose first set bit marks the total
//! byte width. Master elements (payloads made of child elements) always get
//! an 8-byte size vint so the field can be back-patched in place or left at
//! the unknown-size sentinel on non-seekable sinks.
//!
//! The `*_size` functions are pure and total; every writer that has a
//! precomputed size asserts written-vs-computed agreement in debug builds.

use crate::ebml::ids;
use crate::error::{Error, Result};
use crate::writer::Writer;
use byteorder::{BigEndian, ByteOrder};

/// Unknown-size sentinel: all payload bits of an 8-byte vint set.
/// Serialized as `0x01FFFFFFFFFFFFFF`.
pub const UNKNOWN_SIZE: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Width in bytes of the fixed size field used for every master element.
pub const MASTER_SIZE_WIDTH: u64 = 8;

/// Coded vint width for a value, by smallest fit.
///
/// The all-ones pattern of each width is reserved for the unknown-size
/// sentinel, hence the strict comparisons.
pub fn vint_size(value: u64) -> u64 {
    let mut size = 1;
    while size < 8 {
        if value < (1u64 << (7 * size)) - 1 {
            break;
        }
        size += 1;
    }
    size
}

/// Minimum big-endian byte count for an unsigned integer; 0 takes one byte.
pub fn uint_size(value: u64) -> u64 {
    let mut size = 1;
    while size < 8 {
        if value < (1u64 << (8 * size)) {
            break;
        }
        size += 1;
    }
    size
}

/// Byte count of an element id (ids are stored with their marker bits).
pub fn id_size(id: u64) -> u64 {
    debug_assert!(id != 0 && id >> 32 == 0);
    uint_size(id)
}

/// Serialized size of an unsigned integer element.
pub fn uint_element_size(id: u64, value: u64) -> u64 {
    let payload = uint_size(value);
    id_size(id) + vint_size(payload) + payload
}

/// Serialized size of a 4-byte float element.
pub fn float_element_size(id: u64) -> u64 {
    id_size(id) + 1 + 4
}

/// Serialized size of a string element (no terminator on the wire).
pub fn string_element_size(id: u64, value: &str) -> u64 {
    let payload = value.len() as u64;
    id_size(id) + vint_size(payload) + payload
}

/// Serialized size of a binary element.
pub fn binary_element_size(id: u64, length: u64) -> u64 {
    id_size(id) + vint_size(length) + length
}

/// Serialized size of a master element: id, fixed 8-byte size vint, payload.
pub fn master_element_size(id: u64, payload_size: u64) -> u64 {
    id_size(id) + MASTER_SIZE_WIDTH + payload_size
}

/// Serialized size of a SimpleBlock carrying `data_len` payload bytes.
pub fn simple_block_size(data_len: u64) -> u64 {
    // id + 4-byte size vint + track vint + timecode + flags + payload
    1 + 4 + 1 + 2 + 1 + data_len
}

fn serialize_uint<W: Writer>(writer: &mut W, value: u64, size: u64) -> Result<()> {
    debug_assert!((1..=8).contains(&size));
    let mut buf = [0u8; 8];
    for i in 0..size {
        buf[i as usize] = (value >> (8 * (size - 1 - i))) as u8;
    }
    writer.write(&buf[..size as usize])
}

/// Write an element id verbatim.
pub fn write_id<W: Writer>(writer: &mut W, id: u64) -> Result<()> {
    serialize_uint(writer, id, id_size(id))
}

/// Write a vint of the given width (1-8 bytes).
///
/// The marker bit is or'd into the leading byte; the caller guarantees the
/// value fits the width. Width 8 is used for every back-patchable size
/// field, where [`UNKNOWN_SIZE`] is the legal placeholder.
pub fn write_vint<W: Writer>(writer: &mut W, value: u64, width: u64) -> Result<()> {
    debug_assert!((1..=8).contains(&width));
    debug_assert!(value <= (1u64 << (7 * width)) - 1);
    serialize_uint(writer, value | (1u64 << (7 * width)), width)
}

/// Write an unsigned integer payload in its minimum big-endian form.
pub fn write_uint<W: Writer>(writer: &mut W, value: u64) -> Result<()> {
    serialize_uint(writer, value, uint_size(value))
}

/// Write a 4-byte IEEE-754 big-endian float payload.
pub fn write_float<W: Writer>(writer: &mut W, value: f32) -> Result<()> {
    let mut buf = [0u8; 4];
    BigEndian::write_f32(&mut buf, value);
    writer.write(&buf)
}

/// Write a complete unsigned integer element.
pub fn write_uint_element<W: Writer>(writer: &mut W, id: u64, value: u64) -> Result<()> {
    write_id(writer, id)?;
    let payload = uint_size(value);
    write_vint(writer, payload, vint_size(payload))?;
    write_uint(writer, value)
}

/// Write a complete float element.
pub fn write_float_element<W: Writer>(writer: &mut W, id: u64, value: f32) -> Result<()> {
    write_id(writer, id)?;
    write_vint(writer, 4, 1)?;
    write_float(writer, value)
}

/// Write a complete string element, without terminator.
pub fn write_string_element<W: Writer>(writer: &mut W, id: u64, value: &str) -> Result<()> {
    write_id(writer, id)?;
    let payload = value.len() as u64;
    write_vint(writer, payload, vint_size(payload))?;
    writer.write(value.as_bytes())
}

/// Write a complete binary element.
pub fn write_binary_element<W: Writer>(writer: &mut W, id: u64, value: &[u8]) -> Result<()> {
    write_id(writer, id)?;
    let payload = value.len() as u64;
    write_vint(writer, payload, vint_size(payload))?;
    writer.write(value)
}

/// Write a master element header: id plus fixed 8-byte size vint.
pub fn write_master_header<W: Writer>(writer: &mut W, id: u64, payload_size: u64) -> Result<()> {
    write_id(writer, id)?;
    write_vint(writer, payload_size, MASTER_SIZE_WIDTH)
}

/// Write a Void element totalling exactly `total_size` bytes including its
/// id and length field. The minimum representable void is 2 bytes.
pub fn write_void<W: Writer>(writer: &mut W, total_size: u64) -> Result<u64> {
    let mut width = 0;
    for w in 1..=8u64 {
        if total_size > w && vint_size(total_size - 1 - w) <= w {
            width = w;
            break;
        }
    }
    if width == 0 {
        return Err(Error::invalid_input(format!(
            "void of {} bytes is not representable",
            total_size
        )));
    }

    write_id(writer, ids::VOID)?;
    let padding = total_size - 1 - width;
    write_vint(writer, padding, width)?;

    const ZEROS: [u8; 32] = [0u8; 32];
    let mut remaining = padding;
    while remaining > 0 {
        let chunk = remaining.min(ZEROS.len() as u64);
        writer.write(&ZEROS[..chunk as usize])?;
        remaining -= chunk;
    }

    Ok(total_size)
}

/// Write a SimpleBlock element and return its total serialized size.
///
/// Body layout: 1-byte track vint, signed 16-bit big-endian relative
/// timecode, flags byte (bit 7 = key-frame), raw frame payload. The 1-byte
/// track vint caps track numbers at 126.
pub fn write_simple_block<W: Writer>(
    writer: &mut W,
    data: &[u8],
    track_number: u64,
    timecode: i16,
    is_key: bool,
) -> Result<u64> {
    if track_number == 0 || track_number > 126 {
        return Err(Error::invalid_input(format!(
            "track number {} not representable in a SimpleBlock",
            track_number
        )));
    }

    write_id(writer, ids::SIMPLE_BLOCK)?;
    let payload_size = 1 + 2 + 1 + data.len() as u64;
    write_vint(writer, payload_size, 4)?;
    write_vint(writer, track_number, 1)?;

    let mut tc = [0u8; 2];
    BigEndian::write_i16(&mut tc, timecode);
    writer.write(&tc)?;

    let flags: u8 = if is_key { 0x80 } else { 0x00 };
    writer.write(&[flags])?;
    writer.write(data)?;

    Ok(simple_block_size(data.len() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::IoWriter;
    use std::io::Cursor;

    fn emit<F>(f: F) -> Vec<u8>
    where
        F: FnOnce(&mut IoWriter<Cursor<Vec<u8>>>),
    {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        f(&mut writer);
        writer.into_inner().into_inner()
    }

    #[test]
    fn test_vint_size_boundaries() {
        assert_eq!(vint_size(0), 1);
        assert_eq!(vint_size(0x7E), 1);
        // 0x7F is the 1-byte all-ones pattern, reserved
        assert_eq!(vint_size(0x7F), 2);
        assert_eq!(vint_size(0x3FFE), 2);
        assert_eq!(vint_size(0x3FFF), 3);
        assert_eq!(vint_size(u64::MAX), 8);
    }

    #[test]
    fn test_uint_size_boundaries() {
        assert_eq!(uint_size(0), 1);
        assert_eq!(uint_size(0xFF), 1);
        assert_eq!(uint_size(0x100), 2);
        assert_eq!(uint_size(0xFFFF_FFFF), 4);
        assert_eq!(uint_size(u64::MAX), 8);
    }

    #[test]
    fn test_write_id_verbatim() {
        assert_eq!(emit(|w| write_id(w, ids::VOID).unwrap()), vec![0xEC]);
        assert_eq!(emit(|w| write_id(w, ids::SEEK).unwrap()), vec![0x4D, 0xBB]);
        assert_eq!(
            emit(|w| write_id(w, ids::SEGMENT).unwrap()),
            vec![0x18, 0x53, 0x80, 0x67]
        );
    }

    #[test]
    fn test_write_vint_markers() {
        assert_eq!(emit(|w| write_vint(w, 2, 1).unwrap()), vec![0x82]);
        assert_eq!(emit(|w| write_vint(w, 5, 4).unwrap()), vec![0x10, 0, 0, 5]);
        assert_eq!(
            emit(|w| write_vint(w, UNKNOWN_SIZE, 8).unwrap()),
            vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_write_uint_element_zero() {
        // id, 1-byte size, one zero byte
        assert_eq!(
            emit(|w| write_uint_element(w, ids::TIMECODE, 0).unwrap()),
            vec![0xE7, 0x81, 0x00]
        );
    }

    #[test]
    fn test_write_float_element() {
        let bytes = emit(|w| write_float_element(w, ids::DURATION, 1.0).unwrap());
        assert_eq!(bytes, vec![0x44, 0x89, 0x84, 0x3F, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_element_sizes_match_written_bytes() {
        let bytes = emit(|w| write_uint_element(w, ids::TIMECODE_SCALE, 1_000_000).unwrap());
        assert_eq!(bytes.len() as u64, uint_element_size(ids::TIMECODE_SCALE, 1_000_000));

        let bytes = emit(|w| write_string_element(w, ids::DOC_TYPE, "webm").unwrap());
        assert_eq!(bytes.len() as u64, string_element_size(ids::DOC_TYPE, "webm"));

        let bytes = emit(|w| write_binary_element(w, ids::CODEC_PRIVATE, &[0u8; 200]).unwrap());
        assert_eq!(bytes.len() as u64, binary_element_size(ids::CODEC_PRIVATE, 200));

        let bytes = emit(|w| write_master_header(w, ids::INFO, 42).unwrap());
        assert_eq!(bytes.len() as u64 + 42, master_element_size(ids::INFO, 42));
    }

    #[test]
    fn test_write_void_exact_totals() {
        for total in [2u64, 3, 9, 100, 127, 128, 129, 152, 5000] {
            let bytes = emit(|w| {
                let written = write_void(w, total).unwrap();
                assert_eq!(written, total);
            });
            assert_eq!(bytes.len() as u64, total, "void total {}", total);
            assert_eq!(bytes[0], 0xEC);
        }
    }

    #[test]
    fn test_write_void_too_small() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        assert!(write_void(&mut writer, 1).is_err());
    }

    #[test]
    fn test_simple_block_layout() {
        let bytes = emit(|w| {
            let size = write_simple_block(w, &[0xAB], 1, -2, true).unwrap();
            assert_eq!(size, simple_block_size(1));
        });
        assert_eq!(
            bytes,
            vec![
                0xA3, // SimpleBlock id
                0x10, 0x00, 0x00, 0x05, // 4-byte size vint: 1+2+1+1
                0x81, // track 1 as 1-byte vint
                0xFF, 0xFE, // timecode -2, big-endian
                0x80, // key-frame flag
                0xAB, // payload
            ]
        );
    }

    #[test]
    fn test_simple_block_track_range() {
        let mut writer = IoWriter::new(Cursor::new(Vec::new()));
        assert!(write_simple_block(&mut writer, &[0], 0, 0, false).is_err());
        assert!(write_simple_block(&mut writer, &[0], 127, 0, false).is_err());
        assert!(write_simple_block(&mut writer, &[0], 126, 0, false).is_ok());
    }
}
