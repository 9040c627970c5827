//! Corpus scanning and document iteration.
//!
//! The driver pre-scans the corpus once to build the doc-id -> name table
//! and to resolve every document region to its target doc-id before any
//! worker starts. Workers then re-read only their own files.
//!
//! - `Text`: each file is one document; the file name is the external name.
//! - `Html`: like `Text`, with markup tags stripped from the content.
//! - `Trec`: each `<DOC>..</DOC>` region is a document; the `<DOCNO>`
//!   contents are the external name. Real TREC corpora repeat DOCNOs, so a
//!   duplicate keeps the first assignment: the repeated region's terms fold
//!   into the original doc-id and no new collection row is minted.

use std::collections::hash_map::Entry;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorpusType {
    Text,
    Html,
    Trec,
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

/// One corpus file with the resolved target doc-id of each of its document
/// regions, in file order. `Text`/`Html` files hold exactly one region; a
/// repeated TREC DOCNO makes a later region target an earlier doc-id.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub region_docs: Vec<DocId>,
}

/// Result of the driver's pre-scan
#[derive(Debug, Clone)]
pub struct CorpusScan {
    /// External names, indexed by doc-id; one row per unique document
    pub doc_names: Vec<String>,
    pub files: Vec<FileEntry>,
}

/// Contiguous group of files handed to one partial indexer
#[derive(Debug, Clone)]
pub struct CorpusSlice {
    pub worker_id: usize,
    pub files: Vec<FileEntry>,
}

impl CorpusSlice {
    /// Document regions in this slice (counts repeated DOCNOs per region)
    pub fn region_count(&self) -> usize {
        self.files.iter().map(|f| f.region_docs.len()).sum()
    }

    /// Smallest target doc-id in this slice (0 when empty)
    pub fn min_doc(&self) -> DocId {
        self.files
            .iter()
            .flat_map(|f| f.region_docs.iter())
            .copied()
            .min()
            .unwrap_or(0)
    }
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.path());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn docno_of(line: &str) -> Option<String> {
    let start = line.find("<DOCNO>")? + "<DOCNO>".len();
    let end = line.find("</DOCNO>")?;
    Some(line[start..end].trim().to_string())
}

/// Pre-scan the corpus: deterministic file order (sorted paths), doc-ids
/// dense in order of first appearance. DOCNOs are resolved globally here,
/// so every region's target doc-id is fixed before workers are sliced.
pub fn scan(dirin: &Path, corpus_type: CorpusType) -> Result<CorpusScan> {
    let mut paths = Vec::new();
    walk_files(dirin, &mut paths)?;

    let mut doc_names = Vec::new();
    let mut files = Vec::with_capacity(paths.len());
    // DOCNO -> first-assigned doc-id
    let mut docnos: FxHashMap<String, DocId> = FxHashMap::default();

    for path in paths {
        let mut region_docs = Vec::new();
        match corpus_type {
            CorpusType::Text | CorpusType::Html => {
                region_docs.push(doc_names.len() as DocId);
                doc_names.push(file_name(&path));
            }
            CorpusType::Trec => {
                let reader = BufReader::new(fs::File::open(&path)?);
                let mut in_doc = false;
                for line in reader.lines() {
                    let line = line?;
                    let trimmed = line.trim();
                    if trimmed == "<DOC>" {
                        in_doc = true;
                    } else if trimmed == "</DOC>" {
                        in_doc = false;
                    } else if in_doc {
                        if let Some(docno) = docno_of(trimmed) {
                            let doc_id = match docnos.entry(docno) {
                                Entry::Occupied(entry) => *entry.get(),
                                Entry::Vacant(entry) => {
                                    let doc_id = doc_names.len() as DocId;
                                    doc_names.push(entry.key().clone());
                                    entry.insert(doc_id);
                                    doc_id
                                }
                            };
                            region_docs.push(doc_id);
                        }
                    }
                }
            }
        }
        files.push(FileEntry { path, region_docs });
    }

    Ok(CorpusScan { doc_names, files })
}

/// Split the scanned files into at most `max_workers` contiguous slices.
/// First-occurrence doc-ids follow file order, so each slice covers a
/// contiguous, disjoint doc-id range and the merger can concatenate
/// sub-lists without re-sorting. The exception is a repeated DOCNO whose
/// first occurrence lies in an earlier slice; those regions carry the
/// earlier doc-id and the merger folds them in by summing frequencies.
pub fn split_slices(scan: &CorpusScan, max_workers: usize) -> Vec<CorpusSlice> {
    if scan.files.is_empty() {
        return Vec::new();
    }
    let workers = max_workers.min(scan.files.len()).max(1);
    let per_slice = scan.files.len().div_ceil(workers);

    scan.files
        .chunks(per_slice)
        .enumerate()
        .map(|(worker_id, files)| CorpusSlice {
            worker_id,
            files: files.to_vec(),
        })
        .collect()
}

/// Stream the documents of one file: `visit(doc_id, content)` per region,
/// with the doc-ids resolved by the pre-scan (repeats included).
pub fn for_each_document<F>(
    entry: &FileEntry,
    corpus_type: CorpusType,
    mut visit: F,
) -> Result<()>
where
    F: FnMut(DocId, &str) -> Result<()>,
{
    match corpus_type {
        CorpusType::Text => {
            let doc_id = *entry.region_docs.first().ok_or_else(|| {
                Error::Corruption(format!("{:?} has no scanned region", entry.path))
            })?;
            let content = read_lossy(&entry.path)?;
            visit(doc_id, &content)
        }
        CorpusType::Html => {
            let doc_id = *entry.region_docs.first().ok_or_else(|| {
                Error::Corruption(format!("{:?} has no scanned region", entry.path))
            })?;
            let content = read_lossy(&entry.path)?;
            let stripped = tag_regex().replace_all(&content, " ");
            visit(doc_id, &stripped)
        }
        CorpusType::Trec => {
            let content = read_lossy(&entry.path)?;
            let mut region = 0usize;
            let mut in_doc = false;
            let mut seen_docno = false;
            let mut body = String::new();

            for line in content.lines() {
                let trimmed = line.trim();
                if trimmed == "<DOC>" {
                    in_doc = true;
                    seen_docno = false;
                    body.clear();
                } else if trimmed == "</DOC>" {
                    if !in_doc || !seen_docno {
                        return Err(Error::Corruption(format!(
                            "malformed TREC region in {:?}",
                            entry.path
                        )));
                    }
                    let doc_id = *entry.region_docs.get(region).ok_or_else(|| {
                        Error::Corruption(format!(
                            "{:?} changed between scan and indexing",
                            entry.path
                        ))
                    })?;
                    visit(doc_id, &body)?;
                    region += 1;
                    in_doc = false;
                } else if in_doc {
                    if docno_of(trimmed).is_some() {
                        seen_docno = true;
                    } else {
                        body.push_str(line);
                        body.push('\n');
                    }
                }
            }

            if region != entry.region_docs.len() {
                return Err(Error::Corruption(format!(
                    "{:?} changed between scan and indexing",
                    entry.path
                )));
            }
            Ok(())
        }
    }
}
