//! Posting list assembler.
//!
//! Splits a term's full posting list into chunks, writes the chunk records
//! to the postings file and the per-term skip table (the chunksinfo block)
//! to the metadata file. Codec selection happens per chunk, per stream.

use std::io::Write;

use crate::chunk::write_chunk;
use crate::codecs::vint::write_vint;
use crate::codecs::CodecId;
use crate::error::{Error, Result};
use crate::stats::CodecStats;
use crate::DocId;

/// Write adapter that tracks the absolute byte offset
pub struct OffsetWriter<W: Write> {
    inner: W,
    offset: u64,
}

impl<W: Write> OffsetWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for OffsetWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.offset += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Assembles posting lists into chunk records plus skip tables
pub struct PostingListAssembler {
    chunk_size: u32,
    docs_candidates: Vec<CodecId>,
    freqs_candidates: Vec<CodecId>,
    stats: CodecStats,
}

impl PostingListAssembler {
    pub fn new(
        chunk_size: u32,
        docs_candidates: Vec<CodecId>,
        freqs_candidates: Vec<CodecId>,
        stats: CodecStats,
    ) -> Result<Self> {
        if docs_candidates.is_empty() || freqs_candidates.is_empty() {
            return Err(Error::Config("empty codec candidate set".into()));
        }
        if freqs_candidates.iter().all(|c| c.monotone_only()) {
            return Err(Error::Config(
                "freqs candidate set holds only monotone codecs".into(),
            ));
        }
        Ok(Self {
            chunk_size,
            docs_candidates,
            freqs_candidates,
            stats,
        })
    }

    /// Write all chunks of one term and its chunksinfo block. Returns the
    /// absolute offset of the block inside the chunksinfo file.
    pub fn write_posting_list<W: Write, C: Write>(
        &mut self,
        term: &str,
        doc_ids: &[DocId],
        term_freqs: &[u32],
        postings_out: &mut OffsetWriter<W>,
        chunksinfo_out: &mut OffsetWriter<C>,
    ) -> Result<u64> {
        debug_assert!(!doc_ids.is_empty());
        debug_assert_eq!(doc_ids.len(), term_freqs.len());

        let chunk_len = if self.chunk_size == 0 {
            doc_ids.len()
        } else {
            self.chunk_size as usize
        };

        // Skip table entries: (last_doc, offset, codecs), one per chunk
        let mut skip = Vec::with_capacity(doc_ids.len().div_ceil(chunk_len));
        for start in (0..doc_ids.len()).step_by(chunk_len) {
            let end = (start + chunk_len).min(doc_ids.len());
            let chunk_docs = &doc_ids[start..end];
            let chunk_freqs = &term_freqs[start..end];

            let offset = postings_out.offset();
            let written = write_chunk(
                postings_out,
                chunk_docs,
                chunk_freqs,
                &self.docs_candidates,
                &self.freqs_candidates,
            )?;

            if self.docs_candidates.len() > 1 {
                self.stats
                    .record_docs(term, written.docs_codec, chunk_docs)?;
            }
            if self.freqs_candidates.len() > 1 {
                self.stats
                    .record_freqs(term, written.freqs_codec, chunk_freqs)?;
            }

            skip.push((written.last_doc, offset, written.docs_codec, written.freqs_codec));
        }

        let block_offset = chunksinfo_out.offset();
        write_vint(chunksinfo_out, skip.len() as u64)?;
        for (last_doc, offset, docs_codec, freqs_codec) in skip {
            write_vint(chunksinfo_out, last_doc as u64)?;
            write_vint(chunksinfo_out, offset)?;
            chunksinfo_out.write_all(&[docs_codec.as_u8(), freqs_codec.as_u8()])?;
        }

        Ok(block_offset)
    }

    pub fn finish(self) -> Result<()> {
        self.stats.finish()
    }
}
