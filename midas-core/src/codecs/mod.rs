//! Integer codec family with per-chunk selection.
//!
//! Seven codecs over non-negative integer sequences. Each kernel exposes
//! `encode`, `decode(bytes, n)` and an exact `bit_len` that never
//! materializes output. Dispatch is a tagged variant keyed by the wire codec
//! id, so the `bit_len` pre-check stays monomorphic on the hot path.
//!
//! Selection takes the minimum `bit_len` over the candidate set; ties fall
//! to the fixed precedence PForDelta > Simple16 > VariableByte > BitPacking
//! > Gamma > Unary > EliasFano. Sequences a codec cannot represent (values
//! past the Simple16 domain, non-monotone input for Elias-Fano) report
//! `u64::MAX` and drop out of the running.

pub mod bitpack;
pub mod bits;
pub mod elias_fano;
pub mod gamma;
pub mod pfor;
pub mod simple16;
pub mod unary;
pub mod varbyte;
pub(crate) mod vint;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Wire id reserved for "no codec" in damaged headers
pub const INVALID_CODEC: u8 = 255;

/// Stable 1-byte codec ids as written to chunk headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CodecId {
    VariableByte = 0,
    Unary = 1,
    Gamma = 2,
    BitPacking = 3,
    Simple16 = 4,
    PForDelta = 5,
    EliasFano = 6,
}

/// All codecs in wire-id order
pub const ALL_CODECS: [CodecId; 7] = [
    CodecId::VariableByte,
    CodecId::Unary,
    CodecId::Gamma,
    CodecId::BitPacking,
    CodecId::Simple16,
    CodecId::PForDelta,
    CodecId::EliasFano,
];

impl CodecId {
    pub fn from_u8(id: u8) -> Result<Self> {
        match id {
            0 => Ok(CodecId::VariableByte),
            1 => Ok(CodecId::Unary),
            2 => Ok(CodecId::Gamma),
            3 => Ok(CodecId::BitPacking),
            4 => Ok(CodecId::Simple16),
            5 => Ok(CodecId::PForDelta),
            6 => Ok(CodecId::EliasFano),
            other => Err(Error::UnknownCodec(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecId::VariableByte => "VariableByte",
            CodecId::Unary => "Unary",
            CodecId::Gamma => "Gamma",
            CodecId::BitPacking => "BitPacking",
            CodecId::Simple16 => "Simple16",
            CodecId::PForDelta => "PForDelta",
            CodecId::EliasFano => "EliasFano",
        }
    }

    /// Tie-break rank for selection; lower wins
    pub(crate) fn precedence(self) -> u8 {
        match self {
            CodecId::PForDelta => 0,
            CodecId::Simple16 => 1,
            CodecId::VariableByte => 2,
            CodecId::BitPacking => 3,
            CodecId::Gamma => 4,
            CodecId::Unary => 5,
            CodecId::EliasFano => 6,
        }
    }

    /// Whether the codec only accepts strictly increasing sequences.
    /// Such codecs apply to absolute doc-ids, never to d-gaps or freqs.
    pub fn monotone_only(self) -> bool {
        matches!(self, CodecId::EliasFano)
    }

    pub fn encode(self, values: &[u32], out: &mut Vec<u8>) -> Result<()> {
        match self {
            CodecId::VariableByte => {
                varbyte::encode(values, out);
                Ok(())
            }
            CodecId::Unary => {
                unary::encode(values, out);
                Ok(())
            }
            CodecId::Gamma => {
                gamma::encode(values, out);
                Ok(())
            }
            CodecId::BitPacking => {
                bitpack::encode(values, out);
                Ok(())
            }
            CodecId::Simple16 => simple16::encode(values, out),
            CodecId::PForDelta => {
                pfor::encode(values, out);
                Ok(())
            }
            CodecId::EliasFano => elias_fano::encode(values, out),
        }
    }

    pub fn decode(self, bytes: &[u8], count: usize) -> Result<Vec<u32>> {
        match self {
            CodecId::VariableByte => varbyte::decode(bytes, count),
            CodecId::Unary => unary::decode(bytes, count),
            CodecId::Gamma => gamma::decode(bytes, count),
            CodecId::BitPacking => bitpack::decode(bytes, count),
            CodecId::Simple16 => simple16::decode(bytes, count),
            CodecId::PForDelta => pfor::decode(bytes, count),
            CodecId::EliasFano => elias_fano::decode(bytes, count),
        }
    }

    /// Exact encoded size in bits; u64::MAX when the sequence is outside the
    /// codec's domain
    pub fn bit_len(self, values: &[u32]) -> u64 {
        match self {
            CodecId::VariableByte => varbyte::bit_len(values),
            CodecId::Unary => unary::bit_len(values),
            CodecId::Gamma => gamma::bit_len(values),
            CodecId::BitPacking => bitpack::bit_len(values),
            CodecId::Simple16 => simple16::bit_len(values),
            CodecId::PForDelta => pfor::bit_len(values),
            CodecId::EliasFano => elias_fano::bit_len(values),
        }
    }
}

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the winner from pre-scored candidates: minimum bit length, ties by
/// precedence. Errors when no candidate can encode the sequence.
pub fn pick(scored: &[(CodecId, u64)]) -> Result<CodecId> {
    scored
        .iter()
        .filter(|(_, bits)| *bits != u64::MAX)
        .min_by_key(|(codec, bits)| (*bits, codec.precedence()))
        .map(|(codec, _)| *codec)
        .ok_or_else(|| Error::Serialization("no candidate codec can encode the sequence".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_wire_ids_are_stable() {
        for (expected, codec) in ALL_CODECS.iter().enumerate() {
            assert_eq!(codec.as_u8() as usize, expected);
            assert_eq!(CodecId::from_u8(expected as u8).unwrap(), *codec);
        }
        assert!(CodecId::from_u8(7).is_err());
        assert!(CodecId::from_u8(INVALID_CODEC).is_err());
    }

    #[test]
    fn test_random_round_trips_match_bit_len() {
        let mut rng = StdRng::seed_from_u64(42);
        for width in [4u32, 8, 16, 28] {
            let values: Vec<u32> = (0..500).map(|_| rng.gen_range(0..1u32 << width)).collect();
            for codec in ALL_CODECS {
                if codec.monotone_only() {
                    continue;
                }
                // Unary output grows linearly in the values themselves
                if codec == CodecId::Unary && width > 8 {
                    continue;
                }
                let bits = codec.bit_len(&values);
                assert_ne!(bits, u64::MAX, "{} rejected in-domain input", codec);

                let mut buf = Vec::new();
                codec.encode(&values, &mut buf).unwrap();
                assert_eq!(buf.len() as u64 * 8, bits, "{} bit_len drifted", codec);
                assert_eq!(codec.decode(&buf, values.len()).unwrap(), values, "{}", codec);
            }
        }
    }

    #[test]
    fn test_monotone_round_trips() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut values: Vec<u32> = Vec::new();
        let mut current = 0u32;
        for _ in 0..2000 {
            current += rng.gen_range(1..50);
            values.push(current);
        }
        let bits = CodecId::EliasFano.bit_len(&values);
        let mut buf = Vec::new();
        CodecId::EliasFano.encode(&values, &mut buf).unwrap();
        assert_eq!(buf.len() as u64 * 8, bits);
        assert_eq!(CodecId::EliasFano.decode(&buf, values.len()).unwrap(), values);
    }

    #[test]
    fn test_pick_takes_minimum() {
        let scored = [
            (CodecId::VariableByte, 800),
            (CodecId::BitPacking, 500),
            (CodecId::Gamma, 900),
        ];
        assert_eq!(pick(&scored).unwrap(), CodecId::BitPacking);
    }

    #[test]
    fn test_pick_breaks_ties_by_precedence() {
        // PForDelta beats Simple16 beats VariableByte beats BitPacking
        let scored = [
            (CodecId::BitPacking, 640),
            (CodecId::VariableByte, 640),
            (CodecId::Simple16, 640),
            (CodecId::PForDelta, 640),
        ];
        assert_eq!(pick(&scored).unwrap(), CodecId::PForDelta);

        let scored = [(CodecId::Unary, 64), (CodecId::Gamma, 64)];
        assert_eq!(pick(&scored).unwrap(), CodecId::Gamma);

        let scored = [(CodecId::EliasFano, 64), (CodecId::Unary, 64)];
        assert_eq!(pick(&scored).unwrap(), CodecId::Unary);
    }

    #[test]
    fn test_pick_skips_out_of_domain() {
        let scored = [(CodecId::Simple16, u64::MAX), (CodecId::VariableByte, 960)];
        assert_eq!(pick(&scored).unwrap(), CodecId::VariableByte);
        assert!(pick(&[(CodecId::Simple16, u64::MAX)]).is_err());
    }

    #[test]
    fn test_selection_is_truly_minimal() {
        // Invariant: the picked codec's bit_len is <= every other candidate's
        let mut rng = StdRng::seed_from_u64(99);
        let values: Vec<u32> = (0..300).map(|_| rng.gen_range(0..1000)).collect();

        let candidates = [
            CodecId::VariableByte,
            CodecId::BitPacking,
            CodecId::Gamma,
            CodecId::Unary,
            CodecId::Simple16,
            CodecId::PForDelta,
        ];
        let scored: Vec<(CodecId, u64)> =
            candidates.iter().map(|&c| (c, c.bit_len(&values))).collect();
        let winner = pick(&scored).unwrap();
        let winner_bits = winner.bit_len(&values);
        for (codec, bits) in scored {
            assert!(winner_bits <= bits, "{} beat the winner {}", codec, winner);
        }
    }
}
