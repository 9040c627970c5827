//! PForDelta codec (NewPFD flavor): frame-of-reference packing with patched
//! exceptions.
//!
//! A base width b is chosen as the smallest width whose values cover at
//! least 90% of the sequence. Every value contributes its low b bits to the
//! packed main array; values that do not fit are exceptions and store their
//! high bits out of band, keyed by position.
//!
//! Payload: [b:u8][exception_count:varint][main: ceil(n*b/8) bytes]
//!          [(position:varint, high_bits:varint)...]
//! The exception offset is derived from b and n rather than stored.

use super::bitpack::bits_needed;
use super::vint::{read_vint, vint_len, write_vint};
use crate::error::{Error, Result};

/// Fraction of values allowed to become exceptions
const MAX_EXCEPTIONS_RATIO: f64 = 0.10;

/// Smallest width covering >= 90% of values; returns (width, exception count)
fn choose_width(values: &[u32]) -> (u8, usize) {
    let n = values.len();
    if n == 0 {
        return (0, 0);
    }

    let mut counts = [0usize; 33];
    for &v in values {
        counts[bits_needed(v) as usize] += 1;
    }

    let max_exceptions = ((n as f64) * MAX_EXCEPTIONS_RATIO).ceil() as usize;
    let mut fitting = 0usize;
    for b in 0..=32usize {
        fitting += counts[b];
        if n - fitting <= max_exceptions {
            return (b as u8, n - fitting);
        }
    }
    (32, 0)
}

fn width_mask(b: u8) -> u64 {
    if b >= 32 {
        u32::MAX as u64
    } else {
        (1u64 << b) - 1
    }
}

pub fn encode(values: &[u32], out: &mut Vec<u8>) {
    let (b, exception_count) = choose_width(values);
    let mask = width_mask(b);

    out.push(b);
    // write_vint on Vec<u8> cannot fail
    let _ = write_vint(out, exception_count as u64);

    // Main array: low b bits of every value, LSB-first
    let start = out.len();
    out.resize(start + (values.len() * b as usize).div_ceil(8), 0);
    let mut bit_pos = 0usize;
    let mut exceptions: Vec<(usize, u32)> = Vec::with_capacity(exception_count);

    for (i, &value) in values.iter().enumerate() {
        let low = value as u64 & mask;

        let mut remaining = b as usize;
        let mut val = low;
        let mut byte_idx = start + bit_pos / 8;
        let mut bit_offset = bit_pos % 8;
        while remaining > 0 {
            let take = (8 - bit_offset).min(remaining);
            let byte_mask = ((1u64 << take) - 1) as u8;
            out[byte_idx] |= ((val as u8) & byte_mask) << bit_offset;
            val >>= take;
            remaining -= take;
            byte_idx += 1;
            bit_offset = 0;
        }
        bit_pos += b as usize;

        if b < 32 && value as u64 > mask {
            exceptions.push((i, value >> b));
        }
    }
    debug_assert_eq!(exceptions.len(), exception_count);

    for (position, high) in exceptions {
        let _ = write_vint(out, position as u64);
        let _ = write_vint(out, high as u64);
    }
}

pub fn decode(bytes: &[u8], count: usize) -> Result<Vec<u32>> {
    let mut reader = bytes;
    let b = *reader
        .first()
        .ok_or_else(|| Error::Corruption("empty PForDelta stream".into()))?;
    if b > 32 {
        return Err(Error::Corruption(format!(
            "PForDelta width {} exceeds 32",
            b
        )));
    }
    reader = &reader[1..];
    let exception_count = read_vint(&mut reader).map_err(Error::Io)? as usize;

    let main_len = (count * b as usize).div_ceil(8);
    if reader.len() < main_len {
        return Err(Error::Corruption("PForDelta main array truncated".into()));
    }
    let (main, mut tail) = reader.split_at(main_len);

    // Unpack low bits
    let mask = width_mask(b);
    let mut values = vec![0u32; count];
    if b > 0 {
        let mut bit_pos = 0usize;
        for out in values.iter_mut() {
            let byte_idx = bit_pos / 8;
            let bit_offset = bit_pos % 8;
            let mut word = 0u64;
            for (k, &byte) in main[byte_idx..].iter().take(5).enumerate() {
                word |= (byte as u64) << (k * 8);
            }
            *out = ((word >> bit_offset) & mask) as u32;
            bit_pos += b as usize;
        }
    }

    // Patch exceptions
    for _ in 0..exception_count {
        let position = read_vint(&mut tail).map_err(Error::Io)? as usize;
        let high = read_vint(&mut tail).map_err(Error::Io)?;
        if position >= count {
            return Err(Error::Corruption(format!(
                "PForDelta exception position {} out of range",
                position
            )));
        }
        if high > u32::MAX as u64 >> b {
            return Err(Error::Corruption(
                "PForDelta exception exceeds 32 bits".into(),
            ));
        }
        values[position] = ((high << b) | values[position] as u64) as u32;
    }

    if !tail.is_empty() {
        return Err(Error::Corruption(
            "trailing bytes after PForDelta stream".into(),
        ));
    }
    Ok(values)
}

/// Exact encoded size in bits
pub fn bit_len(values: &[u32]) -> u64 {
    let (b, exception_count) = choose_width(values);
    let mut bytes = 1 + vint_len(exception_count as u64) as u64;
    bytes += (values.len() as u64 * b as u64).div_ceil(8);
    if b < 32 {
        let limit = width_mask(b);
        for (i, &v) in values.iter().enumerate() {
            if v as u64 > limit {
                bytes += vint_len(i as u64) as u64 + vint_len((v >> b) as u64) as u64;
            }
        }
    }
    bytes * 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_values_no_exceptions() {
        let values: Vec<u32> = (0..128).map(|i| i % 16).collect();
        let (b, exc) = choose_width(&values);
        assert_eq!(b, 4);
        assert_eq!(exc, 0);

        let mut buf = Vec::new();
        encode(&values, &mut buf);
        assert_eq!(buf.len() as u64 * 8, bit_len(&values));
        assert_eq!(decode(&buf, values.len()).unwrap(), values);
    }

    #[test]
    fn test_outliers_become_exceptions() {
        // 120 small values and 8 large ones: the large ones must patch
        let mut values: Vec<u32> = vec![3; 120];
        values.extend_from_slice(&[1 << 20, 1 << 25, u32::MAX, 12345678, 99, 1 << 30, 7, 1 << 15]);
        let (b, exc) = choose_width(&values);
        assert!(b <= 7, "base width should stay small, got {}", b);
        assert!(exc > 0);

        let mut buf = Vec::new();
        encode(&values, &mut buf);
        assert_eq!(buf.len() as u64 * 8, bit_len(&values));
        assert_eq!(decode(&buf, values.len()).unwrap(), values);
    }

    #[test]
    fn test_all_zero() {
        let values = vec![0u32; 64];
        let mut buf = Vec::new();
        encode(&values, &mut buf);
        assert_eq!(buf.len(), 2); // width byte + zero exception count
        assert_eq!(decode(&buf, 64).unwrap(), values);
    }

    #[test]
    fn test_truncated_stream_is_corruption() {
        let values: Vec<u32> = (0..100).collect();
        let mut buf = Vec::new();
        encode(&values, &mut buf);
        buf.pop();
        assert!(decode(&buf, values.len()).is_err());
    }
}
