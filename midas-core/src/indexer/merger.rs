//! Single-threaded k-way merge over sorted temp runs.
//!
//! A min-heap keyed by each run's current term pops all entries tied on the
//! minimum and combines their posting sub-lists. Workers cover disjoint
//! doc-id ranges, so ordering sub-lists by first doc-id is normally the
//! whole "merge"; the one exception is a repeated TREC DOCNO folded onto a
//! doc-id from an earlier slice, which makes ranges overlap and the shared
//! doc-ids sum their frequencies. The combined list goes to the
//! posting-list assembler. The merger holds one run entry per input plus
//! the current term's accumulating list, nothing more.
//!
//! Output: the four sealed files plus optional codec statistics.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codecs::vint::write_vint;
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::assembler::{OffsetWriter, PostingListAssembler};
use crate::index::{CHUNKSINFO_FILE, COLLECTION_FILE, POSTINGS_FILE, VOCABULARY_FILE};
use crate::stats::CodecStats;
use crate::DocId;

use super::run::RunReader;

/// Entry for the k-way merge heap
struct MergeEntry {
    term: String,
    postings: Vec<(DocId, u32)>,
    run_idx: usize,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.run_idx == other.run_idx
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default)
        other
            .term
            .cmp(&self.term)
            .then_with(|| other.run_idx.cmp(&self.run_idx))
    }
}

fn push_next(
    heap: &mut BinaryHeap<MergeEntry>,
    readers: &mut [RunReader],
    run_idx: usize,
) -> Result<()> {
    if let Some((term, postings)) = readers[run_idx].next_entry()? {
        heap.push(MergeEntry {
            term,
            postings,
            run_idx,
        });
    }
    Ok(())
}

/// Combine sub-lists into one sorted list. Disjoint ranges (the normal
/// case) concatenate in first-doc order with no re-sort; ranges only
/// overlap when a repeated DOCNO folded a region onto a doc-id from an
/// earlier slice, and then the shared doc-ids sum their frequencies.
fn combine(term: &str, mut sources: Vec<Vec<(DocId, u32)>>) -> Result<Vec<(DocId, u32)>> {
    for postings in &sources {
        if !postings.windows(2).all(|w| w[0].0 < w[1].0) {
            return Err(Error::Corruption(format!(
                "term {:?}: run sub-list doc-ids are not strictly increasing",
                term
            )));
        }
    }
    sources.sort_by_key(|postings| postings.first().map(|p| p.0).unwrap_or(0));

    let disjoint = sources
        .windows(2)
        .all(|pair| match (pair[0].last(), pair[1].first()) {
            (Some(last), Some(first)) => last.0 < first.0,
            _ => true,
        });

    let total = sources.iter().map(Vec::len).sum();
    let mut merged: Vec<(DocId, u32)> = Vec::with_capacity(total);
    if disjoint {
        for postings in sources {
            merged.extend(postings);
        }
    } else {
        merged.extend(sources.into_iter().flatten());
        merged.sort_by_key(|p| p.0);
        merged.dedup_by(|next, kept| {
            if kept.0 == next.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });
    }
    Ok(merged)
}

/// Merge `runs` into a sealed index in `dir_out`. Returns the term count.
pub fn merge_runs(
    runs: &[PathBuf],
    doc_names: &[String],
    dir_out: &Path,
    chunk_size: u32,
    config: &IndexConfig,
) -> Result<u64> {
    let mut readers = Vec::with_capacity(runs.len());
    for path in runs {
        readers.push(RunReader::open(path.clone())?);
    }

    // Collection file: line i = external name of doc-id i
    let mut collection = BufWriter::new(File::create(dir_out.join(COLLECTION_FILE))?);
    for name in doc_names {
        collection.write_all(name.as_bytes())?;
        collection.write_all(b"\n")?;
    }
    collection.flush()?;

    let mut postings_out =
        OffsetWriter::new(BufWriter::new(File::create(dir_out.join(POSTINGS_FILE))?));
    let mut chunksinfo_out =
        OffsetWriter::new(BufWriter::new(File::create(dir_out.join(CHUNKSINFO_FILE))?));
    let mut vocabulary = BufWriter::new(File::create(dir_out.join(VOCABULARY_FILE))?);

    // Chunk-size header; vocabulary offsets account for it
    write_vint(&mut chunksinfo_out, chunk_size as u64)?;

    let stats = CodecStats::create(
        dir_out,
        config.docs_codecs.len() > 1,
        config.freqs_codecs.len() > 1,
    )?;
    let mut assembler = PostingListAssembler::new(
        chunk_size,
        config.docs_codecs.clone(),
        config.freqs_codecs.clone(),
        stats,
    )?;

    let mut heap: BinaryHeap<MergeEntry> = BinaryHeap::new();
    for run_idx in 0..readers.len() {
        push_next(&mut heap, &mut readers, run_idx)?;
    }

    let mut terms_merged = 0u64;
    let mut doc_buf: Vec<DocId> = Vec::new();
    let mut freq_buf: Vec<u32> = Vec::new();

    while let Some(first) = heap.pop() {
        let term = first.term;
        let mut sources = vec![first.postings];
        push_next(&mut heap, &mut readers, first.run_idx)?;

        // Drain every run tied on the minimum term
        while let Some(entry) = heap.peek() {
            if entry.term != term {
                break;
            }
            let entry = match heap.pop() {
                Some(entry) => entry,
                None => break,
            };
            sources.push(entry.postings);
            push_next(&mut heap, &mut readers, entry.run_idx)?;
        }

        let merged = combine(&term, sources)?;
        doc_buf.clear();
        freq_buf.clear();
        doc_buf.extend(merged.iter().map(|p| p.0));
        freq_buf.extend(merged.iter().map(|p| p.1));

        let block_offset = assembler.write_posting_list(
            &term,
            &doc_buf,
            &freq_buf,
            &mut postings_out,
            &mut chunksinfo_out,
        )?;

        vocabulary.write_all(term.as_bytes())?;
        vocabulary.write_all(b"\t")?;
        vocabulary.write_all(block_offset.to_string().as_bytes())?;
        vocabulary.write_all(b"\n")?;

        terms_merged += 1;
        if terms_merged % 100_000 == 0 {
            log::debug!("merge progress: {} terms", terms_merged);
        }
    }

    vocabulary.flush()?;
    postings_out.flush()?;
    chunksinfo_out.flush()?;
    assembler.finish()?;

    log::debug!("merge complete: {} terms from {} runs", terms_merged, runs.len());
    Ok(terms_merged)
}
