//! Bit-level codec primitives.
//!
//! All payload access in this crate goes through the functions in this module.
//! A frame payload is treated as one little-endian bit stream: bit `k` lives in
//! byte `k / 8` at position `k % 8`, with byte 0 being the least significant.
//! Field windows are addressed by absolute bit offset and width; mux children
//! reuse the same whole-message buffer with their own absolute offsets.
//!
//! Extraction is total: bits beyond the end of the buffer read as zero, which
//! matches packing the payload into one wide unsigned integer and shifting.
//! Insertion is checked: the value must fit the window and the window must fit
//! the buffer. Bits are only ORed in, never cleared, so callers must present a
//! zero-initialized buffer when packing a fresh payload.

use crate::error::{Error, Result};

/// Extracts `width` bits starting at absolute bit `offset` from a
/// little-endian payload buffer.
///
/// Bits past the end of `data` read as zero. `width` must be at most 64;
/// schema field widths never exceed this.
pub fn extract_bits(data: &[u8], offset: usize, width: u32) -> u64 {
    debug_assert!(width <= 64, "field width {width} exceeds 64 bits");
    if width == 0 {
        return 0;
    }

    let first = offset / 8;
    let shift = offset % 8;
    // A 64-bit window shifted by up to 7 bits spans at most 9 bytes.
    let span = (shift + width as usize).div_ceil(8);

    let mut raw: u128 = 0;
    for (i, idx) in (first..first + span).enumerate() {
        if idx >= data.len() {
            break;
        }
        raw |= (data[idx] as u128) << (8 * i);
    }

    let mask = if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    ((raw >> shift) as u64) & mask
}

/// Reinterprets a `width`-bit unsigned pattern as a two's-complement integer.
///
/// If the top bit of the window is set the result is `raw - 2^width`,
/// otherwise `raw` unchanged.
pub fn sign_extend(raw: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return raw as i64;
    }
    let mask = (1u64 << width) - 1;
    let raw = raw & mask;
    let sign_bit = 1u64 << (width - 1);
    if raw & sign_bit != 0 {
        (raw as i64) | !(mask as i64)
    } else {
        raw as i64
    }
}

/// Converts a signed value to its `width`-bit two's-complement pattern.
///
/// Non-negative values pass through unchanged. Negative values are masked to
/// `width` bits after a magnitude check against `2^(width-1)`; a value that
/// does not fit yields [`Error::SignedValueOutOfRange`].
pub fn to_unsigned(value: i64, width: u32) -> Result<u64> {
    if value >= 0 {
        return Ok(value as u64);
    }

    let limit = 1u128 << width.min(64).saturating_sub(1);
    if value.unsigned_abs() as u128 > limit {
        return Err(Error::SignedValueOutOfRange { value, bits: width });
    }

    let mask = if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    Ok((value as u64) & mask)
}

/// ORs the low `width` bits of `value` into `buf` at absolute bit `offset`.
///
/// Fails with [`Error::ValueTooWide`] if `value` needs more than `width` bits,
/// and with [`Error::BufferTooSmall`] if `offset + width` exceeds the buffer's
/// bit capacity. Existing bits are never cleared.
pub fn insert_bits(buf: &mut [u8], value: u64, offset: usize, width: u32) -> Result<()> {
    if width < 64 && value > (1u64 << width) - 1 {
        return Err(Error::ValueTooWide { value, bits: width });
    }

    let required = offset + width as usize;
    let available = buf.len() * 8;
    if required > available {
        return Err(Error::BufferTooSmall {
            required,
            available,
        });
    }

    let mut byte = offset / 8;
    let mut chunk = (value as u128) << (offset % 8);
    while chunk > 0 {
        buf[byte] |= (chunk & 0xFF) as u8;
        chunk >>= 8;
        byte += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_aligned_bytes() {
        let data = [100u8, 250u8];
        assert_eq!(extract_bits(&data, 0, 8), 100);
        assert_eq!(extract_bits(&data, 8, 8), 250);
        assert_eq!(extract_bits(&data, 0, 16), 100 | (250 << 8));
    }

    #[test]
    fn extract_unaligned_window() {
        // 0b1011_0100: bits 2..6 are 0b1101
        let data = [0xB4u8];
        assert_eq!(extract_bits(&data, 2, 4), 0b1101);
    }

    #[test]
    fn extract_spanning_byte_boundary() {
        let data = [0x80u8, 0x01u8];
        assert_eq!(extract_bits(&data, 7, 2), 0b11);
    }

    #[test]
    fn extract_past_buffer_reads_zero() {
        let data = [0xFFu8];
        assert_eq!(extract_bits(&data, 4, 8), 0x0F);
        assert_eq!(extract_bits(&data, 8, 8), 0);
        assert_eq!(extract_bits(&[], 0, 64), 0);
    }

    #[test]
    fn sign_extend_four_bit_patterns() {
        assert_eq!(sign_extend(0b1000, 4), -8);
        assert_eq!(sign_extend(0b0111, 4), 7);
        assert_eq!(sign_extend(0b1111, 4), -1);
        assert_eq!(sign_extend(0, 4), 0);
    }

    #[test]
    fn sign_extend_full_width() {
        assert_eq!(sign_extend(u64::MAX, 64), -1);
        assert_eq!(sign_extend(5, 64), 5);
    }

    #[test]
    fn to_unsigned_round_trips_sign_extend() {
        for width in [4u32, 8, 12, 16, 32] {
            for value in [-1i64, -5, 0, 1, 7] {
                let pattern = to_unsigned(value, width).unwrap();
                assert_eq!(sign_extend(pattern, width), value);
            }
        }
    }

    #[test]
    fn to_unsigned_magnitude_check() {
        assert!(to_unsigned(-8, 4).is_ok());
        assert!(matches!(
            to_unsigned(-9, 4),
            Err(Error::SignedValueOutOfRange { value: -9, bits: 4 })
        ));
    }

    #[test]
    fn insert_ors_into_buffer() {
        let mut buf = [0u8; 2];
        insert_bits(&mut buf, 0b1101, 2, 4).unwrap();
        assert_eq!(buf, [0b0011_0100, 0]);

        insert_bits(&mut buf, 0b11, 7, 2).unwrap();
        assert_eq!(buf, [0b1011_0100, 0b0000_0001]);
    }

    #[test]
    fn insert_rejects_wide_value() {
        let mut buf = [0u8; 2];
        assert!(matches!(
            insert_bits(&mut buf, 16, 0, 4),
            Err(Error::ValueTooWide { value: 16, bits: 4 })
        ));
    }

    #[test]
    fn insert_rejects_short_buffer() {
        // offset 4 + width 6 needs 10 bits, an 8-bit buffer has only 8
        let mut buf = [0u8; 1];
        assert!(matches!(
            insert_bits(&mut buf, 0b111111, 4, 6),
            Err(Error::BufferTooSmall {
                required: 10,
                available: 8
            })
        ));
    }

    #[test]
    fn insert_extract_round_trip() {
        let mut buf = [0u8; 8];
        insert_bits(&mut buf, 0x1F40, 24, 16).unwrap();
        assert_eq!(extract_bits(&buf, 24, 16), 0x1F40);
    }
}
