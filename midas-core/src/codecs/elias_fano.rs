//! Elias-Fano codec for strictly increasing sequences.
//!
//! Quasi-succinct: n values with universe U take about n*(2 + log2(U/n))
//! bits. Each value splits into l = floor(log2(U/n)) low bits, packed
//! densely, and high bits encoded as unary bucket gaps in the upper array
//! (bit i + (v_i >> l) is set for the i-th value).
//!
//! In this index the codec applies to the absolute in-chunk doc-id sequence,
//! never to d-gaps; gaps are not monotone and a non-monotone input is
//! rejected.
//!
//! Payload: [lower_width:u8][upper_len_bytes:varint][upper bits][lower bits]

use super::vint::{read_vint, vint_len, write_vint};
use crate::error::{Error, Result};

fn is_strictly_increasing(values: &[u32]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Lower-bit width for n values with the given universe (max + 1)
fn lower_width(universe: u64, n: u64) -> u8 {
    let ratio = universe / n;
    if ratio <= 1 {
        0
    } else {
        (63 - ratio.leading_zeros()) as u8
    }
}

struct Layout {
    lower_width: u8,
    upper_bytes: u64,
    lower_bytes: u64,
}

fn layout(values: &[u32]) -> Option<Layout> {
    if !is_strictly_increasing(values) {
        return None;
    }
    if values.is_empty() {
        return Some(Layout {
            lower_width: 0,
            upper_bytes: 0,
            lower_bytes: 0,
        });
    }
    let n = values.len() as u64;
    let max = values[values.len() - 1] as u64;
    let l = lower_width(max + 1, n);
    let upper_bits = n + (max >> l) + 1;
    Some(Layout {
        lower_width: l,
        upper_bytes: upper_bits.div_ceil(8),
        lower_bytes: (n * l as u64).div_ceil(8),
    })
}

pub fn encode(values: &[u32], out: &mut Vec<u8>) -> Result<()> {
    let layout = layout(values).ok_or_else(|| {
        Error::Serialization("Elias-Fano input must be strictly increasing".into())
    })?;
    let l = layout.lower_width;

    out.push(l);
    let _ = write_vint(out, layout.upper_bytes);

    let mut upper = vec![0u8; layout.upper_bytes as usize];
    let mut lower = vec![0u8; layout.lower_bytes as usize];
    let lower_mask = if l == 0 { 0 } else { (1u64 << l) - 1 };

    for (i, &value) in values.iter().enumerate() {
        let v = value as u64;

        // Upper array: one set bit per value at position i + (v >> l)
        let pos = i as u64 + (v >> l);
        upper[(pos / 8) as usize] |= 1 << (pos % 8);

        // Lower array: l bits, packed LSB-first
        if l > 0 {
            let low = v & lower_mask;
            let mut bit_pos = i * l as usize;
            let mut remaining = l as usize;
            let mut val = low;
            while remaining > 0 {
                let byte_idx = bit_pos / 8;
                let bit_offset = bit_pos % 8;
                let take = (8 - bit_offset).min(remaining);
                let mask = ((1u64 << take) - 1) as u8;
                lower[byte_idx] |= ((val as u8) & mask) << bit_offset;
                val >>= take;
                remaining -= take;
                bit_pos += take;
            }
        }
    }

    out.extend_from_slice(&upper);
    out.extend_from_slice(&lower);
    Ok(())
}

pub fn decode(bytes: &[u8], count: usize) -> Result<Vec<u32>> {
    let mut reader = bytes;
    let l = *reader
        .first()
        .ok_or_else(|| Error::Corruption("empty Elias-Fano stream".into()))?;
    if l > 32 {
        return Err(Error::Corruption(format!(
            "Elias-Fano lower width {} exceeds 32",
            l
        )));
    }
    reader = &reader[1..];
    let upper_bytes = read_vint(&mut reader).map_err(Error::Io)? as usize;

    let lower_bytes = (count * l as usize).div_ceil(8);
    if reader.len() != upper_bytes + lower_bytes {
        return Err(Error::Corruption(format!(
            "Elias-Fano stream is {} bytes, expected {}",
            reader.len(),
            upper_bytes + lower_bytes
        )));
    }
    let (upper, lower) = reader.split_at(upper_bytes);

    let lower_mask = if l == 0 { 0 } else { (1u64 << l) - 1 };
    let mut values = Vec::with_capacity(count);
    let mut i = 0usize;

    for (byte_idx, &byte) in upper.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        for bit in 0..8u64 {
            if byte >> bit & 1 == 0 {
                continue;
            }
            if i == count {
                return Err(Error::Corruption(
                    "Elias-Fano upper array has surplus set bits".into(),
                ));
            }
            let pos = byte_idx as u64 * 8 + bit;
            let high = pos - i as u64;

            let low = if l == 0 {
                0
            } else {
                let bit_pos = i * l as usize;
                let byte_idx = bit_pos / 8;
                let bit_offset = bit_pos % 8;
                let mut word = 0u64;
                for (k, &b) in lower[byte_idx..].iter().take(5).enumerate() {
                    word |= (b as u64) << (k * 8);
                }
                (word >> bit_offset) & lower_mask
            };

            if high > u32::MAX as u64 >> l {
                return Err(Error::Corruption("Elias-Fano value exceeds 32 bits".into()));
            }
            let v = (high << l) | low;
            values.push(v as u32);
            i += 1;
        }
    }

    if values.len() != count {
        return Err(Error::Corruption(format!(
            "Elias-Fano upper array has {} set bits, expected {}",
            values.len(),
            count
        )));
    }
    if !is_strictly_increasing(&values) {
        return Err(Error::Corruption(
            "Elias-Fano output is not strictly increasing".into(),
        ));
    }
    Ok(values)
}

/// Exact encoded size in bits, or u64::MAX for non-monotone input
pub fn bit_len(values: &[u32]) -> u64 {
    match layout(values) {
        Some(layout) => {
            (1 + vint_len(layout.upper_bytes) as u64 + layout.upper_bytes + layout.lower_bytes) * 8
        }
        None => u64::MAX,
    }
}
