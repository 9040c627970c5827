//! Chunk record writer/reader.
//!
//! A chunk is the unit of codec selection: up to `chunk_size` postings with
//! the doc-id stream and the frequency stream encoded independently. The
//! docs stream carries d-gaps (first doc-id stored as-is) unless the winning
//! codec only accepts monotone input, in which case it carries absolute
//! doc-ids.
//!
//! Record layout:
//! [posting_count:varint][first_doc:varint][last_doc:varint]
//! [docs_codec:u8][freqs_codec:u8][docs_len:varint][freqs_len:varint]
//! [docs payload][freqs payload]

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::codecs::vint::{read_vint, write_vint};
use crate::codecs::{self, CodecId};
use crate::error::{Error, Result};
use crate::DocId;

/// Decoded chunk as parallel arrays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    pub doc_ids: Vec<DocId>,
    pub term_freqs: Vec<u32>,
}

/// Outcome of writing one chunk record
#[derive(Debug, Clone, Copy)]
pub struct WrittenChunk {
    pub first_doc: DocId,
    pub last_doc: DocId,
    pub docs_codec: CodecId,
    pub freqs_codec: CodecId,
    pub bytes: u64,
}

fn to_gaps(doc_ids: &[DocId]) -> Vec<u32> {
    let mut gaps = Vec::with_capacity(doc_ids.len());
    let mut prev = 0u32;
    for (i, &doc) in doc_ids.iter().enumerate() {
        if i == 0 {
            gaps.push(doc);
        } else {
            gaps.push(doc - prev);
        }
        prev = doc;
    }
    gaps
}

/// Select the docs codec: gap-based candidates score the d-gap sequence,
/// monotone-only candidates score the absolute sequence.
fn select_docs_codec(
    candidates: &[CodecId],
    doc_ids: &[DocId],
    gaps: &[u32],
) -> Result<CodecId> {
    let scored: Vec<(CodecId, u64)> = candidates
        .iter()
        .map(|&c| {
            let bits = if c.monotone_only() {
                c.bit_len(doc_ids)
            } else {
                c.bit_len(gaps)
            };
            (c, bits)
        })
        .collect();
    codecs::pick(&scored)
}

fn select_freqs_codec(candidates: &[CodecId], term_freqs: &[u32]) -> Result<CodecId> {
    let scored: Vec<(CodecId, u64)> = candidates
        .iter()
        .filter(|c| !c.monotone_only())
        .map(|&c| (c, c.bit_len(term_freqs)))
        .collect();
    codecs::pick(&scored)
}

/// Encode one chunk and append the record to `writer`
pub fn write_chunk<W: Write>(
    writer: &mut W,
    doc_ids: &[DocId],
    term_freqs: &[u32],
    docs_candidates: &[CodecId],
    freqs_candidates: &[CodecId],
) -> Result<WrittenChunk> {
    debug_assert!(!doc_ids.is_empty());
    debug_assert_eq!(doc_ids.len(), term_freqs.len());
    debug_assert!(doc_ids.windows(2).all(|w| w[0] < w[1]));

    let gaps = to_gaps(doc_ids);
    let docs_codec = select_docs_codec(docs_candidates, doc_ids, &gaps)?;
    let freqs_codec = select_freqs_codec(freqs_candidates, term_freqs)?;

    let mut docs_payload = Vec::new();
    if docs_codec.monotone_only() {
        docs_codec.encode(doc_ids, &mut docs_payload)?;
    } else {
        docs_codec.encode(&gaps, &mut docs_payload)?;
    }
    let mut freqs_payload = Vec::new();
    freqs_codec.encode(term_freqs, &mut freqs_payload)?;

    let first_doc = doc_ids[0];
    let last_doc = doc_ids[doc_ids.len() - 1];

    let mut header = Vec::with_capacity(24);
    write_vint(&mut header, doc_ids.len() as u64)?;
    write_vint(&mut header, first_doc as u64)?;
    write_vint(&mut header, last_doc as u64)?;
    header.write_u8(docs_codec.as_u8())?;
    header.write_u8(freqs_codec.as_u8())?;
    write_vint(&mut header, docs_payload.len() as u64)?;
    write_vint(&mut header, freqs_payload.len() as u64)?;

    writer.write_all(&header)?;
    writer.write_all(&docs_payload)?;
    writer.write_all(&freqs_payload)?;

    Ok(WrittenChunk {
        first_doc,
        last_doc,
        docs_codec,
        freqs_codec,
        bytes: (header.len() + docs_payload.len() + freqs_payload.len()) as u64,
    })
}

/// Read and decode one chunk record from `reader`
pub fn read_chunk<R: Read>(reader: &mut R) -> Result<ChunkData> {
    let count = read_vint(reader)? as usize;
    let first_doc = read_vint(reader)? as u32;
    let last_doc = read_vint(reader)? as u32;
    let docs_codec = CodecId::from_u8(reader.read_u8()?)?;
    let freqs_codec = CodecId::from_u8(reader.read_u8()?)?;
    let docs_len = read_vint(reader)? as usize;
    let freqs_len = read_vint(reader)? as usize;

    let mut docs_payload = vec![0u8; docs_len];
    reader.read_exact(&mut docs_payload)?;
    let mut freqs_payload = vec![0u8; freqs_len];
    reader.read_exact(&mut freqs_payload)?;

    let doc_ids = if docs_codec.monotone_only() {
        docs_codec.decode(&docs_payload, count)?
    } else {
        let gaps = docs_codec.decode(&docs_payload, count)?;
        let mut doc_ids = Vec::with_capacity(count);
        let mut prev = 0u32;
        for (i, &gap) in gaps.iter().enumerate() {
            let doc = if i == 0 {
                gap
            } else {
                prev.checked_add(gap).ok_or_else(|| {
                    Error::Corruption("doc-id overflow while summing chunk gaps".into())
                })?
            };
            doc_ids.push(doc);
            prev = doc;
        }
        doc_ids
    };

    if doc_ids.len() != count {
        return Err(Error::Corruption(format!(
            "chunk decoded {} doc-ids, header says {}",
            doc_ids.len(),
            count
        )));
    }
    if !doc_ids.windows(2).all(|w| w[0] < w[1]) {
        return Err(Error::Corruption(
            "chunk doc-ids are not strictly increasing".into(),
        ));
    }
    match (doc_ids.first(), doc_ids.last()) {
        (Some(&first), Some(&last)) if first == first_doc && last == last_doc => {}
        (None, _) => {}
        _ => {
            return Err(Error::Corruption(
                "chunk doc-id bounds disagree with header".into(),
            ));
        }
    }

    let term_freqs = freqs_codec.decode(&freqs_payload, count)?;
    if term_freqs.iter().any(|&tf| tf == 0) {
        return Err(Error::Corruption("chunk contains a zero frequency".into()));
    }

    Ok(ChunkData {
        doc_ids,
        term_freqs,
    })
}
