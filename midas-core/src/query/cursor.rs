//! Posting-list cursor with skip-table seeks and lazy chunk decode.
//!
//! A cursor moves Unopened -> Positioned -> Exhausted. Nothing is decoded
//! until the first `doc`/`advance`/`seek`, so an intersection that gallops
//! straight to the tail of a long list pays for exactly the chunks it
//! touches. Seeks search the skip table first (whole chunks are skipped
//! without decoding), then binary-search inside the one decoded chunk.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::sync::Arc;

use crate::chunk::read_chunk;
use crate::error::{Error, Result};
use crate::index::TermMeta;
use crate::{DocId, TERMINATED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unopened,
    Positioned,
    Exhausted,
}

pub struct PostingCursor {
    meta: Arc<TermMeta>,
    file: BufReader<File>,
    state: State,
    chunk_idx: usize,
    doc_ids: Vec<DocId>,
    term_freqs: Vec<u32>,
    pos: usize,
    chunk_reads: u32,
}

impl PostingCursor {
    pub fn new(meta: Arc<TermMeta>, file: File) -> Self {
        Self {
            meta,
            file: BufReader::new(file),
            state: State::Unopened,
            chunk_idx: 0,
            doc_ids: Vec::new(),
            term_freqs: Vec::new(),
            pos: 0,
            chunk_reads: 0,
        }
    }

    /// Number of chunks in the list; orders cursors shortest-first
    pub fn chunk_count(&self) -> usize {
        self.meta.chunks.len()
    }

    /// Chunks decoded so far (skip-efficiency accounting)
    pub fn chunk_reads(&self) -> u32 {
        self.chunk_reads
    }

    fn load_chunk(&mut self, idx: usize) -> Result<()> {
        let entry = self.meta.chunks[idx];
        self.file.seek(SeekFrom::Start(entry.offset))?;
        let chunk = read_chunk(&mut self.file)?;

        let last = *chunk.doc_ids.last().ok_or_else(|| {
            Error::Corruption("chunk record holds no postings".into())
        })?;
        if last != entry.last_doc {
            return Err(Error::Corruption(format!(
                "chunk last doc-id {} disagrees with skip table entry {}",
                last, entry.last_doc
            )));
        }
        if idx > 0 && chunk.doc_ids[0] <= self.meta.chunks[idx - 1].last_doc {
            return Err(Error::Corruption(
                "chunk overlaps its predecessor's doc-id range".into(),
            ));
        }

        self.chunk_idx = idx;
        self.doc_ids = chunk.doc_ids;
        self.term_freqs = chunk.term_freqs;
        self.pos = 0;
        self.chunk_reads += 1;
        self.state = State::Positioned;
        Ok(())
    }

    /// Current doc-id; decodes the first chunk on an unopened cursor
    pub fn doc(&mut self) -> Result<DocId> {
        match self.state {
            State::Exhausted => Ok(TERMINATED),
            State::Positioned => Ok(self.doc_ids[self.pos]),
            State::Unopened => {
                if self.meta.chunks.is_empty() {
                    self.state = State::Exhausted;
                    return Ok(TERMINATED);
                }
                self.load_chunk(0)?;
                Ok(self.doc_ids[self.pos])
            }
        }
    }

    /// Term frequency at the current position (0 once exhausted)
    pub fn term_freq(&self) -> u32 {
        if self.state == State::Positioned {
            self.term_freqs[self.pos]
        } else {
            0
        }
    }

    /// Step to the next posting
    pub fn advance(&mut self) -> Result<DocId> {
        match self.state {
            State::Exhausted => return Ok(TERMINATED),
            State::Unopened => {
                return self.doc();
            }
            State::Positioned => {}
        }

        self.pos += 1;
        if self.pos >= self.doc_ids.len() {
            if self.chunk_idx + 1 < self.meta.chunks.len() {
                self.load_chunk(self.chunk_idx + 1)?;
            } else {
                self.state = State::Exhausted;
                return Ok(TERMINATED);
            }
        }
        Ok(self.doc_ids[self.pos])
    }

    /// First doc-id >= target, or TERMINATED. Whole chunks whose last doc-id
    /// falls below the target are skipped without decoding.
    pub fn seek(&mut self, target: DocId) -> Result<DocId> {
        match self.state {
            State::Exhausted => return Ok(TERMINATED),
            State::Positioned => {
                if self.doc_ids[self.pos] >= target {
                    return Ok(self.doc_ids[self.pos]);
                }
            }
            State::Unopened => {}
        }

        // Skip-table search over chunks not yet behind us
        let from = if self.state == State::Unopened {
            0
        } else {
            self.chunk_idx
        };
        let rel = self.meta.chunks[from..].partition_point(|c| c.last_doc < target);
        let idx = from + rel;
        if idx >= self.meta.chunks.len() {
            self.state = State::Exhausted;
            return Ok(TERMINATED);
        }
        if self.state == State::Unopened || idx != self.chunk_idx {
            self.load_chunk(idx)?;
        }

        // Within the decoded chunk; last_doc >= target guarantees a hit
        let start = self.pos;
        self.pos = start + self.doc_ids[start..].partition_point(|&d| d < target);
        Ok(self.doc_ids[self.pos])
    }
}
