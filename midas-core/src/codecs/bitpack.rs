//! Fixed-width bit packing.
//!
//! Every value is stored at width = ceil(log2(max+1)) bits, LSB-first. The
//! width is written once as the leading payload byte, never per value. Best
//! on uniform streams; a single outlier inflates the whole chunk (that is
//! what PForDelta is for).

use crate::error::{Error, Result};

/// Number of bits needed to represent `max_val`
#[inline]
pub fn bits_needed(max_val: u32) -> u8 {
    if max_val == 0 {
        0
    } else {
        32 - max_val.leading_zeros() as u8
    }
}

pub fn encode(values: &[u32], out: &mut Vec<u8>) {
    let width = bits_needed(values.iter().copied().max().unwrap_or(0));
    out.push(width);
    if width == 0 {
        return;
    }

    let start = out.len();
    out.resize(start + (values.len() * width as usize).div_ceil(8), 0);

    let mut bit_pos = 0usize;
    for &value in values {
        let mut remaining = width as usize;
        let mut val = value as u64;
        let mut byte_idx = start + bit_pos / 8;
        let mut bit_offset = bit_pos % 8;

        while remaining > 0 {
            let take = (8 - bit_offset).min(remaining);
            let mask = ((1u64 << take) - 1) as u8;
            out[byte_idx] |= ((val as u8) & mask) << bit_offset;
            val >>= take;
            remaining -= take;
            byte_idx += 1;
            bit_offset = 0;
        }
        bit_pos += width as usize;
    }
}

pub fn decode(bytes: &[u8], count: usize) -> Result<Vec<u32>> {
    let width = *bytes
        .first()
        .ok_or_else(|| Error::Corruption("empty bit-packed stream".into()))?;
    if width > 32 {
        return Err(Error::Corruption(format!(
            "bit-packed width {} exceeds 32",
            width
        )));
    }

    let payload = &bytes[1..];
    let expected = (count * width as usize).div_ceil(8);
    if payload.len() != expected {
        return Err(Error::Corruption(format!(
            "bit-packed stream is {} bytes, expected {}",
            payload.len(),
            expected
        )));
    }
    if width == 0 {
        return Ok(vec![0; count]);
    }

    let mask = if width == 32 {
        u32::MAX as u64
    } else {
        (1u64 << width) - 1
    };
    let mut values = Vec::with_capacity(count);
    let mut bit_pos = 0usize;

    for _ in 0..count {
        let byte_idx = bit_pos / 8;
        let bit_offset = bit_pos % 8;

        // A width-32 value at offset 7 spans 5 bytes
        let mut word = 0u64;
        for (k, &b) in payload[byte_idx..].iter().take(5).enumerate() {
            word |= (b as u64) << (k * 8);
        }
        values.push(((word >> bit_offset) & mask) as u32);
        bit_pos += width as usize;
    }
    Ok(values)
}

/// Exact encoded size in bits: width byte plus n packed values
pub fn bit_len(values: &[u32]) -> u64 {
    let width = bits_needed(values.iter().copied().max().unwrap_or(0)) as u64;
    8 + (values.len() as u64 * width).div_ceil(8) * 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let values = vec![5, 1, 7, 3, 0, 6, 2, 4, 7, 7];
        let mut buf = Vec::new();
        encode(&values, &mut buf);
        // Max is 7 so width is 3: 1 header byte + ceil(30/8) = 4 payload bytes
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.len() as u64 * 8, bit_len(&values));
        assert_eq!(decode(&buf, values.len()).unwrap(), values);
    }

    #[test]
    fn test_all_zero_width() {
        let values = vec![0; 100];
        let mut buf = Vec::new();
        encode(&values, &mut buf);
        assert_eq!(buf.len(), 1);
        assert_eq!(decode(&buf, 100).unwrap(), values);
    }

    #[test]
    fn test_full_width() {
        let values = vec![u32::MAX, 0, 12345, u32::MAX - 1];
        let mut buf = Vec::new();
        encode(&values, &mut buf);
        assert_eq!(decode(&buf, values.len()).unwrap(), values);
    }

    #[test]
    fn test_length_mismatch_is_corruption() {
        let mut buf = Vec::new();
        encode(&[1, 2, 3, 4], &mut buf);
        buf.pop();
        assert!(decode(&buf, 4).is_err());
    }
}
