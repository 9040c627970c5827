//! Two-phase external indexer driver.
//!
//! Phase one runs up to `max_child_indexers` partial indexers in parallel,
//! each over a pre-assigned contiguous corpus slice, flushing sorted runs to
//! a temp directory. Phase two is the single-threaded k-way merge that seals
//! the index. Doc-id assignment happens once, in the driver, before any
//! worker starts; workers share nothing but the read-only scan.

pub mod corpus;
pub mod merger;
pub mod run;
pub mod worker;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::stats::{DOCS_STATS_FILE, FREQS_STATS_FILE};
use crate::tokenizer::{LowercaseTokenizer, Tokenizer};

pub use corpus::CorpusType;
use corpus::CorpusScan;
use run::RunReader;
use worker::{PartialIndexer, RunHandle};

const TMP_DIR: &str = "tmp";

/// Outcome of `create_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerStatus {
    Ok,
    AlreadyIndexed,
    CollectionNonExistent,
}

/// Corpus indexer
pub struct Indexer {
    dirin: PathBuf,
    corpus_type: CorpusType,
    config: IndexConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl Indexer {
    pub fn new(dirin: impl Into<PathBuf>, corpus_type: CorpusType) -> Self {
        Self {
            dirin: dirin.into(),
            corpus_type,
            config: IndexConfig::default(),
            tokenizer: Arc::new(LowercaseTokenizer),
        }
    }

    pub fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Build a sealed index under `dirout`.
    ///
    /// `chunk_size` is the posting-list partition size (0 = one chunk per
    /// list). A pre-existing sealed index with `overwrite = false` returns
    /// `AlreadyIndexed` without touching any file; a missing corpus
    /// directory returns `CollectionNonExistent`.
    pub fn create_index(
        &self,
        dirout: impl Into<PathBuf>,
        overwrite: bool,
        chunk_size: u32,
    ) -> Result<(Index, IndexerStatus)> {
        self.config.validate()?;
        let dirout = dirout.into();
        let index = Index::new(&dirout);

        if index.exists() && !overwrite {
            log::info!("index at {:?} already sealed, skipping", dirout);
            return Ok((index, IndexerStatus::AlreadyIndexed));
        }
        if !self.dirin.is_dir() {
            log::warn!("corpus directory {:?} does not exist", self.dirin);
            return Ok((index, IndexerStatus::CollectionNonExistent));
        }

        fs::create_dir_all(&dirout)?;
        let tmp_dir = dirout.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir)?;

        // Stale statistics from a previous multi-codec build must not
        // survive a rebuild with narrower candidate sets
        for stale in [DOCS_STATS_FILE, FREQS_STATS_FILE] {
            let path = dirout.join(stale);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }

        log::info!(
            "indexing {:?} ({:?}) into {:?}, chunk size {}",
            self.dirin,
            self.corpus_type,
            dirout,
            chunk_size
        );

        let scan = corpus::scan(&self.dirin, self.corpus_type)?;
        log::info!(
            "scanned {} docs across {} files",
            scan.doc_names.len(),
            scan.files.len()
        );

        let run_paths = match self.reusable_runs(&tmp_dir)? {
            Some(paths) => {
                log::info!("reusing {} temp runs from a previous build", paths.len());
                paths
            }
            None => self.run_partial_phase(&scan, &tmp_dir)?,
        };

        let term_count = match merger::merge_runs(
            &run_paths,
            &scan.doc_names,
            &dirout,
            chunk_size,
            &self.config,
        ) {
            Ok(count) => count,
            Err(e) => {
                // Roll back partial sealed outputs; temp runs stay around
                // for a retry when reuse is on
                let partial = Index::new(&dirout);
                for path in [
                    partial.collection_path(),
                    partial.vocabulary_path(),
                    partial.chunksinfo_path(),
                    partial.postings_path(),
                ] {
                    let _ = fs::remove_file(path);
                }
                if !self.config.reuse_tmp {
                    let _ = fs::remove_dir_all(&tmp_dir);
                }
                return Err(e);
            }
        };

        fs::remove_dir_all(&tmp_dir)?;
        self.log_sealed_sizes(&index)?;
        log::info!("sealed {} terms at {:?}", term_count, dirout);

        Ok((index, IndexerStatus::Ok))
    }

    /// All valid runs from a previous build, or None to rebuild from scratch
    fn reusable_runs(&self, tmp_dir: &Path) -> Result<Option<Vec<PathBuf>>> {
        if !self.config.reuse_tmp {
            self.clear_tmp(tmp_dir)?;
            return Ok(None);
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(tmp_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(run::RUN_EXTENSION) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Ok(None);
        }
        paths.sort();

        for path in &paths {
            if let Err(e) = RunReader::open(path.clone()) {
                log::warn!("discarding temp runs, {:?} is unusable: {}", path, e);
                self.clear_tmp(tmp_dir)?;
                return Ok(None);
            }
        }
        Ok(Some(paths))
    }

    fn clear_tmp(&self, tmp_dir: &Path) -> Result<()> {
        fs::remove_dir_all(tmp_dir)?;
        fs::create_dir_all(tmp_dir)?;
        Ok(())
    }

    /// Phase one: bounded-parallel partial indexing over disjoint slices
    fn run_partial_phase(&self, scan: &CorpusScan, tmp_dir: &Path) -> Result<Vec<PathBuf>> {
        let slices = corpus::split_slices(scan, self.config.max_child_indexers);
        if slices.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(slices.len())
            .build()
            .map_err(|e| Error::Config(format!("worker pool: {}", e)))?;

        let budget = self.config.run_budget_bytes();
        let cancel = AtomicBool::new(false);
        let results: Mutex<Vec<Result<Vec<RunHandle>>>> = Mutex::new(Vec::new());

        pool.scope(|scope| {
            for slice in &slices {
                let cancel = &cancel;
                let results = &results;
                let tokenizer = self.tokenizer.as_ref();
                scope.spawn(move |_| {
                    let indexer = PartialIndexer::new(
                        slice.worker_id,
                        self.corpus_type,
                        tokenizer,
                        tmp_dir,
                        budget,
                    );
                    let outcome = indexer.index_slice(slice, cancel);
                    if outcome.is_err() {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    results.lock().push(outcome);
                });
            }
        });

        let mut run_paths = Vec::new();
        for outcome in results.into_inner() {
            match outcome {
                Ok(handles) => run_paths.extend(handles.into_iter().map(|h| h.path)),
                Err(e) => {
                    if !self.config.reuse_tmp {
                        let _ = fs::remove_dir_all(tmp_dir);
                    }
                    return Err(e);
                }
            }
        }
        run_paths.sort();
        Ok(run_paths)
    }

    fn log_sealed_sizes(&self, index: &Index) -> Result<()> {
        let mib = |path: PathBuf| -> Result<f64> {
            Ok(fs::metadata(path)?.len() as f64 / (1024.0 * 1024.0))
        };
        log::info!(
            "sealed sizes: collection {:.1} MiB, vocabulary {:.1} MiB, chunksinfo {:.1} MiB, postings {:.1} MiB",
            mib(index.collection_path())?,
            mib(index.vocabulary_path())?,
            mib(index.chunksinfo_path())?,
            mib(index.postings_path())?,
        );
        Ok(())
    }
}
