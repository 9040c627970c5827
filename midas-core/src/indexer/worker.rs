//! Partial indexer: one worker per corpus slice.
//!
//! A worker walks its slice region by region, accumulating an in-memory
//! term -> postings map. Whenever the estimated resident size crosses the
//! memory budget (and always at the end of the slice) it flushes a sorted
//! run. First-occurrence doc-ids ascend with the walk, so posting lists are
//! normally already sorted; a repeated DOCNO folds a region back onto an
//! earlier doc-id, and the flush re-sorts and sums those few entries before
//! the run hits disk. Workers share nothing.

use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;

use super::corpus::{self, CorpusSlice, CorpusType};
use super::run::{RunManifest, RunWriter, RUN_EXTENSION};
use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;
use crate::DocId;

/// Rough resident cost of one posting / one new term entry
const POSTING_COST: usize = 8;
const TERM_COST: usize = 48;

/// A flushed run with its manifest
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub path: PathBuf,
    pub manifest: RunManifest,
}

pub struct PartialIndexer<'a> {
    worker_id: usize,
    corpus_type: CorpusType,
    tokenizer: &'a dyn Tokenizer,
    tmp_dir: &'a Path,
    budget_bytes: usize,
}

impl<'a> PartialIndexer<'a> {
    pub fn new(
        worker_id: usize,
        corpus_type: CorpusType,
        tokenizer: &'a dyn Tokenizer,
        tmp_dir: &'a Path,
        budget_bytes: usize,
    ) -> Self {
        Self {
            worker_id,
            corpus_type,
            tokenizer,
            tmp_dir,
            budget_bytes,
        }
    }

    /// Index one slice, flushing sorted runs as the budget fills. `cancel`
    /// is polled between files so a failing peer aborts the build early.
    pub fn index_slice(
        &self,
        slice: &CorpusSlice,
        cancel: &AtomicBool,
    ) -> Result<Vec<RunHandle>> {
        let mut terms: FxHashMap<String, Vec<(DocId, u32)>> = FxHashMap::default();
        let mut resident = 0usize;
        let mut runs = Vec::new();
        let mut seq = 0usize;

        log::debug!(
            "worker {}: slice of {} files, {} regions from doc-id {}",
            self.worker_id,
            slice.files.len(),
            slice.region_count(),
            slice.min_doc()
        );

        for file in &slice.files {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Corruption(format!(
                    "worker {} aborted by a failing peer",
                    self.worker_id
                )));
            }

            corpus::for_each_document(file, self.corpus_type, |doc_id, content| {
                for token in self.tokenizer.tokenize(content) {
                    let postings = match terms.entry(token) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => {
                            resident += TERM_COST + entry.key().len();
                            entry.insert(Vec::new())
                        }
                    };
                    match postings.last_mut() {
                        // Repeated occurrence within the same document
                        Some(last) if last.0 == doc_id => last.1 += 1,
                        _ => {
                            postings.push((doc_id, 1));
                            resident += POSTING_COST;
                        }
                    }
                }
                // Budget check per document: a single TREC file can hold
                // millions of documents
                if resident >= self.budget_bytes {
                    runs.push(self.flush(&mut terms, &mut seq)?);
                    resident = 0;
                }
                Ok(())
            })?;
        }

        if !terms.is_empty() {
            runs.push(self.flush(&mut terms, &mut seq)?);
        }
        Ok(runs)
    }

    fn flush(
        &self,
        terms: &mut FxHashMap<String, Vec<(DocId, u32)>>,
        seq: &mut usize,
    ) -> Result<RunHandle> {
        let path = self.tmp_dir.join(format!(
            "run-{:03}-{:03}.{}",
            self.worker_id, seq, RUN_EXTENSION
        ));
        *seq += 1;

        let mut sorted: Vec<(String, Vec<(DocId, u32)>)> = terms.drain().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut writer = RunWriter::create(path.clone())?;
        for (term, mut postings) in sorted {
            // Repeated-DOCNO regions fold onto earlier doc-ids, so a list
            // may be out of order or hold the same doc twice; sum those
            if !postings.windows(2).all(|w| w[0].0 < w[1].0) {
                postings.sort_by_key(|p| p.0);
                postings.dedup_by(|next, kept| {
                    if kept.0 == next.0 {
                        kept.1 += next.1;
                        true
                    } else {
                        false
                    }
                });
            }
            writer.push(&term, &postings)?;
        }
        let manifest = writer.finish()?;

        log::debug!(
            "worker {}: flushed {:?} ({} terms, {} bytes)",
            self.worker_id,
            path,
            manifest.term_count,
            manifest.byte_len
        );
        Ok(RunHandle { path, manifest })
    }
}
