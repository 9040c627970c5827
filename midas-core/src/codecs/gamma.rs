//! Elias gamma codec: unary bit-length prefix, then the binary tail.
//!
//! Encodes v+1 (the kernel owns the shift, keeping the stream contract at
//! non-negative integers): for m = v+1 with bit-width N, writes N-1 zero
//! bits followed by the N bits of m, leading one included. 2N-1 bits total.

use super::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};

pub fn encode(values: &[u32], out: &mut Vec<u8>) {
    let mut writer = BitWriter::new();
    for &v in values {
        let m = v as u64 + 1;
        let width = 64 - m.leading_zeros();
        for _ in 0..width - 1 {
            writer.push_bit(false);
        }
        writer.push_bits(m, width);
    }
    out.extend_from_slice(&writer.into_bytes());
}

pub fn decode(bytes: &[u8], count: usize) -> Result<Vec<u32>> {
    let mut reader = BitReader::new(bytes);
    let mut values = Vec::with_capacity(count);

    for _ in 0..count {
        let mut zeros = 0u32;
        loop {
            match reader.read_bit() {
                Some(true) => break,
                Some(false) => zeros += 1,
                None => {
                    return Err(Error::Corruption("gamma stream ended mid-prefix".into()));
                }
            }
        }
        if zeros > 32 {
            return Err(Error::Corruption("gamma prefix exceeds 32 bits".into()));
        }
        // The leading one was just consumed; read the tail and re-attach it.
        let tail = reader
            .read_bits(zeros)
            .ok_or_else(|| Error::Corruption("gamma stream ended mid-tail".into()))?;
        let m = (1u64 << zeros) | tail;
        if m - 1 > u32::MAX as u64 {
            return Err(Error::Corruption("gamma value exceeds 32 bits".into()));
        }
        values.push((m - 1) as u32);
    }

    if reader.remaining() >= 8 {
        return Err(Error::Corruption("trailing bytes after gamma stream".into()));
    }
    Ok(values)
}

/// Exact encoded size in bits, including final-byte padding
pub fn bit_len(values: &[u32]) -> u64 {
    let bits: u64 = values
        .iter()
        .map(|&v| {
            let width = 64 - (v as u64 + 1).leading_zeros() as u64;
            2 * width - 1
        })
        .sum();
    bits.div_ceil(8) * 8
}
