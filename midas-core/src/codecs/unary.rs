//! Unary codec: a value v is written as v zero bits followed by a one bit.
//!
//! This is the classic positive-integer unary code applied to v+1, folded
//! into the kernel so the stream contract stays "non-negative integers" like
//! every other codec. Only competitive for streams of near-zero values
//! (dense d-gaps, tf=1 runs).

use super::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};

pub fn encode(values: &[u32], out: &mut Vec<u8>) {
    let mut writer = BitWriter::new();
    for &v in values {
        for _ in 0..v {
            writer.push_bit(false);
        }
        writer.push_bit(true);
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
                    return Err(Error::Corruption(
                        "unary stream ended mid-value".into(),
                    ));
                }
            }
        }
        values.push(zeros);
    }

    if reader.remaining() >= 8 {
        return Err(Error::Corruption(
            "trailing bytes after unary stream".into(),
        ));
    }
    Ok(values)
}

/// Exact encoded size in bits, including final-byte padding
pub fn bit_len(values: &[u32]) -> u64 {
    let bits: u64 = values.iter().map(|&v| v as u64 + 1).sum();
    bits.div_ceil(8) * 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let values = vec![0, 0, 1, 3, 0, 7, 2, 15];
        let mut buf = Vec::new();
        encode(&values, &mut buf);
        assert_eq!(buf.len() as u64 * 8, bit_len(&values));
        assert_eq!(decode(&buf, values.len()).unwrap(), values);
    }

    #[test]
    fn test_all_zeros_one_bit_each() {
        let values = vec![0; 16];
        let mut buf = Vec::new();
        encode(&values, &mut buf);
        assert_eq!(buf.len(), 2);
        assert_eq!(decode(&buf, 16).unwrap(), values);
    }

    #[test]
    fn test_truncated_stream_is_corruption() {
        let mut buf = Vec::new();
        encode(&[20, 20], &mut buf);
        buf.pop();
        assert!(decode(&buf, 2).is_err());
    }
}
