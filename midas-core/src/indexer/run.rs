//! Temp-run wire format.
//!
//! A run is a sorted stream of `(term, postings)` entries flushed by a
//! partial indexer, compact enough to stream through the k-way merge:
//! `[term_len:varint][term bytes][posting_count:varint]` followed by
//! `(doc_gap:varint, tf:varint)` pairs (first doc-id absolute).
//!
//! Every run carries a JSON manifest sidecar with its term count, byte
//! length and doc-id range. A missing manifest or a length mismatch marks
//! the run as truncated and fails the merge.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codecs::vint::{read_vint, write_vint};
use crate::error::{Error, Result};
use crate::DocId;

pub const RUN_EXTENSION: &str = "run";
pub const MANIFEST_EXTENSION: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub term_count: u64,
    pub byte_len: u64,
    pub min_doc: DocId,
    pub max_doc: DocId,
}

fn manifest_path(run_path: &Path) -> PathBuf {
    let mut name = run_path.as_os_str().to_os_string();
    name.push(".");
    name.push(MANIFEST_EXTENSION);
    PathBuf::from(name)
}

/// Streaming writer; terms must be pushed in ascending order
pub struct RunWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    term_count: u64,
    byte_len: u64,
    min_doc: DocId,
    max_doc: DocId,
}

impl RunWriter {
    pub fn create(path: PathBuf) -> Result<Self> {
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self {
            path,
            writer,
            term_count: 0,
            byte_len: 0,
            min_doc: DocId::MAX,
            max_doc: 0,
        })
    }

    pub fn push(&mut self, term: &str, postings: &[(DocId, u32)]) -> Result<()> {
        debug_assert!(!postings.is_empty());
        debug_assert!(postings.windows(2).all(|w| w[0].0 < w[1].0));

        let mut buf = Vec::with_capacity(term.len() + postings.len() * 3 + 8);
        write_vint(&mut buf, term.len() as u64)?;
        buf.extend_from_slice(term.as_bytes());
        write_vint(&mut buf, postings.len() as u64)?;

        let mut prev = 0u32;
        for (i, &(doc, tf)) in postings.iter().enumerate() {
            let gap = if i == 0 { doc } else { doc - prev };
            write_vint(&mut buf, gap as u64)?;
            write_vint(&mut buf, tf as u64)?;
            prev = doc;
        }

        self.writer.write_all(&buf)?;
        self.byte_len += buf.len() as u64;
        self.term_count += 1;
        self.min_doc = self.min_doc.min(postings[0].0);
        self.max_doc = self.max_doc.max(postings[postings.len() - 1].0);
        Ok(())
    }

    /// Flush the run and write its manifest sidecar
    pub fn finish(mut self) -> Result<RunManifest> {
        self.writer.flush()?;
        let manifest = RunManifest {
            term_count: self.term_count,
            byte_len: self.byte_len,
            min_doc: if self.term_count == 0 { 0 } else { self.min_doc },
            max_doc: self.max_doc,
        };
        let json = serde_json::to_vec(&manifest)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(manifest_path(&self.path), json)?;
        Ok(manifest)
    }
}

/// Streaming reader over one run; validates the manifest on open
pub struct RunReader {
    path: PathBuf,
    reader: BufReader<File>,
    manifest: RunManifest,
    terms_read: u64,
}

impl RunReader {
    pub fn open(path: PathBuf) -> Result<Self> {
        let manifest_bytes = fs::read(manifest_path(&path)).map_err(|_| {
            Error::Corruption(format!("run {:?} has no manifest (worker crash?)", path))
        })?;
        let manifest: RunManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| Error::Corruption(format!("run {:?} manifest unreadable: {}", path, e)))?;

        let actual_len = fs::metadata(&path)?.len();
        if actual_len != manifest.byte_len {
            return Err(Error::Corruption(format!(
                "run {:?} is {} bytes, manifest says {}",
                path, actual_len, manifest.byte_len
            )));
        }

        let reader = BufReader::new(File::open(&path)?);
        Ok(Self {
            path,
            reader,
            manifest,
            terms_read: 0,
        })
    }

    pub fn manifest(&self) -> &RunManifest {
        &self.manifest
    }

    /// Next `(term, postings)` entry, or None at a clean end of stream
    pub fn next_entry(&mut self) -> Result<Option<(String, Vec<(DocId, u32)>)>> {
        let term_len = match read_vint(&mut self.reader) {
            Ok(len) => len as usize,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                if self.terms_read != self.manifest.term_count {
                    return Err(Error::Corruption(format!(
                        "run {:?} ended after {} terms, manifest says {}",
                        self.path, self.terms_read, self.manifest.term_count
                    )));
                }
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut term_bytes = vec![0u8; term_len];
        self.reader.read_exact(&mut term_bytes)?;
        let term = String::from_utf8(term_bytes)
            .map_err(|_| Error::Corruption(format!("run {:?} holds a non-UTF8 term", self.path)))?;

        let count = read_vint(&mut self.reader)? as usize;
        let mut postings = Vec::with_capacity(count);
        let mut prev = 0u32;
        for i in 0..count {
            let gap = read_vint(&mut self.reader)? as u32;
            let tf = read_vint(&mut self.reader)? as u32;
            let doc = if i == 0 { gap } else { prev + gap };
            postings.push((doc, tf));
            prev = doc;
        }

        self.terms_read += 1;
        Ok(Some((term, postings)))
    }
}
