//! Sealed-index representation and loader.
//!
//! A sealed index is four files in one directory:
//! - `collection.txt`: line i holds the external name of doc-id i
//! - `vocabulary.txt`: `term\tchunksinfo_offset`, ascending term order
//! - `chunksinfo.bin`: a chunk-size header varint, then one metadata block
//!   per term: `[chunk_count:varint]` followed per chunk by
//!   `[last_doc:varint][postings_offset:varint][docs_codec:u8][freqs_codec:u8]`
//! - `postings.bin`: concatenated chunk records
//!
//! `load` has two residency modes: with `chunks_info_in_memory` every term's
//! skip table is parsed up front; otherwise the vocabulary keeps a byte
//! offset and each lookup performs one seek+read into `chunksinfo.bin`.
//! Either way `postings.bin` stays on disk and chunks decode on demand.

pub mod assembler;

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::ReadBytesExt;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::codecs::vint::read_vint;
use crate::codecs::CodecId;
use crate::error::{Error, Result};
use crate::query::PostingCursor;
use crate::DocId;

pub const COLLECTION_FILE: &str = "collection.txt";
pub const VOCABULARY_FILE: &str = "vocabulary.txt";
pub const CHUNKSINFO_FILE: &str = "chunksinfo.bin";
pub const POSTINGS_FILE: &str = "postings.bin";

/// Skip-table entry for one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMeta {
    pub last_doc: DocId,
    /// Absolute byte offset of the chunk record in postings.bin
    pub offset: u64,
    pub docs_codec: CodecId,
    pub freqs_codec: CodecId,
}

/// Per-term metadata: the skip table, one entry per chunk, sorted by doc-id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMeta {
    pub chunks: Vec<ChunkMeta>,
}

impl TermMeta {
    /// Parse one chunksinfo block
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let chunk_count = read_vint(reader)? as usize;
        let mut chunks = Vec::with_capacity(chunk_count);
        let mut prev: Option<ChunkMeta> = None;

        for _ in 0..chunk_count {
            let last_doc = read_vint(reader)? as u32;
            let offset = read_vint(reader)?;
            let docs_codec = CodecId::from_u8(reader.read_u8()?)?;
            let freqs_codec = CodecId::from_u8(reader.read_u8()?)?;

            let meta = ChunkMeta {
                last_doc,
                offset,
                docs_codec,
                freqs_codec,
            };
            if let Some(prev) = prev {
                if prev.last_doc >= meta.last_doc || prev.offset >= meta.offset {
                    return Err(Error::Corruption(
                        "skip table is not strictly increasing".into(),
                    ));
                }
            }
            chunks.push(meta);
            prev = Some(meta);
        }
        Ok(Self { chunks })
    }
}

enum VocabEntry {
    /// Skip table resident in memory
    Meta(Arc<TermMeta>),
    /// Byte offset of the block in chunksinfo.bin
    Offset(u64),
}

struct Loaded {
    chunk_size: u32,
    collection: Vec<String>,
    vocabulary: FxHashMap<String, VocabEntry>,
    /// Lazily opened reader for offset-mode metadata lookups
    chunksinfo: Mutex<Option<BufReader<File>>>,
}

/// Handle to a sealed index directory
pub struct Index {
    dir: PathBuf,
    loaded: Option<Loaded>,
}

impl Index {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn collection_path(&self) -> PathBuf {
        self.dir.join(COLLECTION_FILE)
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        self.dir.join(VOCABULARY_FILE)
    }

    pub fn chunksinfo_path(&self) -> PathBuf {
        self.dir.join(CHUNKSINFO_FILE)
    }

    pub fn postings_path(&self) -> PathBuf {
        self.dir.join(POSTINGS_FILE)
    }

    /// All four sealed files are present
    pub fn exists(&self) -> bool {
        self.collection_path().exists()
            && self.vocabulary_path().exists()
            && self.chunksinfo_path().exists()
            && self.postings_path().exists()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Mount the sealed index: collection and vocabulary always become
    /// resident; skip tables do as well when `chunks_info_in_memory` is set.
    pub fn load(&mut self, chunks_info_in_memory: bool) -> Result<()> {
        if self.loaded.is_some() {
            return Err(Error::AlreadyLoaded);
        }

        let collection = self.load_collection()?;
        let (chunk_size, vocabulary) = self.load_vocabulary(chunks_info_in_memory)?;

        log::debug!(
            "loaded index at {:?}: {} docs, {} terms, chunk size {}, chunks info {}",
            self.dir,
            collection.len(),
            vocabulary.len(),
            chunk_size,
            if chunks_info_in_memory {
                "in memory"
            } else {
                "on disk"
            }
        );

        self.loaded = Some(Loaded {
            chunk_size,
            collection,
            vocabulary,
            chunksinfo: Mutex::new(None),
        });
        Ok(())
    }

    fn load_collection(&self) -> Result<Vec<String>> {
        let reader = BufReader::new(File::open(self.collection_path())?);
        let mut names = Vec::new();
        for line in reader.lines() {
            names.push(line?);
        }
        Ok(names)
    }

    fn load_vocabulary(
        &self,
        chunks_info_in_memory: bool,
    ) -> Result<(u32, FxHashMap<String, VocabEntry>)> {
        // The chunksinfo header varint carries the chunk size
        let mut chunksinfo = BufReader::new(File::open(self.chunksinfo_path())?);
        let chunk_size = read_vint(&mut chunksinfo)? as u32;

        let mut blocks = Vec::new();
        if chunks_info_in_memory {
            chunksinfo.seek(SeekFrom::Start(0))?;
            chunksinfo.read_to_end(&mut blocks)?;
        }

        let reader = BufReader::new(File::open(self.vocabulary_path())?);
        let mut vocabulary = FxHashMap::default();
        let mut prev_term = String::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let (term, offset) = line.split_once('\t').ok_or_else(|| {
                Error::Corruption(format!("vocabulary line {} lacks a tab", line_no))
            })?;
            let offset: u64 = offset.parse().map_err(|_| {
                Error::Corruption(format!("vocabulary line {} has a bad offset", line_no))
            })?;
            if !prev_term.is_empty() && term <= prev_term.as_str() {
                return Err(Error::Corruption(
                    "vocabulary terms are not strictly ascending".into(),
                ));
            }

            let entry = if chunks_info_in_memory {
                let block = blocks.get(offset as usize..).ok_or_else(|| {
                    Error::Corruption(format!("chunksinfo offset {} out of range", offset))
                })?;
                VocabEntry::Meta(Arc::new(TermMeta::read_from(&mut &block[..])?))
            } else {
                VocabEntry::Offset(offset)
            };
            vocabulary.insert(term.to_string(), entry);
            prev_term = term.to_string();
        }

        Ok((chunk_size, vocabulary))
    }

    fn state(&self) -> Result<&Loaded> {
        self.loaded.as_ref().ok_or(Error::NotLoaded)
    }

    pub fn num_docs(&self) -> Result<usize> {
        Ok(self.state()?.collection.len())
    }

    pub fn term_count(&self) -> Result<usize> {
        Ok(self.state()?.vocabulary.len())
    }

    pub fn chunk_size(&self) -> Result<u32> {
        Ok(self.state()?.chunk_size)
    }

    /// External name of a doc-id
    pub fn doc_name(&self, doc_id: DocId) -> Result<&str> {
        let state = self.state()?;
        state
            .collection
            .get(doc_id as usize)
            .map(String::as_str)
            .ok_or_else(|| Error::Corruption(format!("doc-id {} has no collection entry", doc_id)))
    }

    /// Skip table for a term; None when the term is absent
    pub fn term_meta(&self, term: &str) -> Result<Option<Arc<TermMeta>>> {
        let state = self.state()?;
        match state.vocabulary.get(term) {
            None => Ok(None),
            Some(VocabEntry::Meta(meta)) => Ok(Some(meta.clone())),
            Some(VocabEntry::Offset(offset)) => {
                let mut guard = state.chunksinfo.lock();
                if guard.is_none() {
                    *guard = Some(BufReader::new(File::open(self.chunksinfo_path())?));
                }
                let reader = guard.as_mut().ok_or(Error::NotLoaded)?;
                reader.seek(SeekFrom::Start(*offset))?;
                Ok(Some(Arc::new(TermMeta::read_from(reader)?)))
            }
        }
    }

    /// Posting-list cursor for a term; None when the term is absent
    pub fn cursor(&self, term: &str) -> Result<Option<PostingCursor>> {
        match self.term_meta(term)? {
            None => Ok(None),
            Some(meta) => {
                let file = File::open(self.postings_path())?;
                Ok(Some(PostingCursor::new(meta, file)))
            }
        }
    }

    /// Full decoded posting list of a term (test and tooling convenience)
    pub fn posting_list(&self, term: &str) -> Result<Vec<(DocId, u32)>> {
        let mut postings = Vec::new();
        if let Some(mut cursor) = self.cursor(term)? {
            let mut doc = cursor.doc()?;
            while doc != crate::TERMINATED {
                postings.push((doc, cursor.term_freq()));
                doc = cursor.advance()?;
            }
        }
        Ok(postings)
    }
}
