//! Midas Tool - CLI for building and querying compressed inverted indexes
//!
//! # Commands
//!
//! - `index` - Build a sealed index from a corpus directory
//! - `search` - Run a Boolean AND query against a sealed index
//! - `info` - Display sealed-index statistics
//!
//! # Examples
//!
//! ## Index a directory of text files with multi-codec compression
//! ```bash
//! midas-tool index -c ./corpus -i ./my_index --chunk-size 128 --multi-codec
//! ```
//!
//! ## Query it
//! ```bash
//! midas-tool search -i ./my_index -q "compression codec" --names
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use midas_core::{
    Browser, CodecId, CorpusType, Index, IndexConfig, Indexer, IndexerStatus, LowercaseTokenizer,
    StopWordTokenizer, Tokenizer,
};

#[derive(Parser)]
#[command(name = "midas-tool")]
#[command(version, about = "CLI for midas index management and retrieval")]
#[command(after_help = "Use 'midas-tool <command> --help' for more information.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CorpusKind {
    Text,
    Html,
    Trec,
}

impl From<CorpusKind> for CorpusType {
    fn from(kind: CorpusKind) -> Self {
        match kind {
            CorpusKind::Text => CorpusType::Text,
            CorpusKind::Html => CorpusType::Html,
            CorpusKind::Trec => CorpusType::Trec,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a sealed index from a corpus directory
    Index {
        /// Path to the corpus directory
        #[arg(short, long)]
        corpus: PathBuf,

        /// Path to the output index directory
        #[arg(short, long)]
        index: PathBuf,

        /// Corpus flavor
        #[arg(short = 't', long, value_enum, default_value = "text")]
        corpus_type: CorpusKind,

        /// Posting-list chunk size (0 = one chunk per list)
        #[arg(short = 's', long, default_value = "128")]
        chunk_size: u32,

        /// Overwrite an existing sealed index
        #[arg(long, default_value = "false")]
        overwrite: bool,

        /// Select the cheapest codec per chunk from the whole family
        /// instead of plain VariableByte
        #[arg(long, default_value = "false")]
        multi_codec: bool,

        /// Parallel partial indexers
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Drop English stop words and very short/long terms
        #[arg(long, default_value = "false")]
        stop_words: bool,
    },

    /// Run a Boolean AND query
    Search {
        /// Path to the index directory
        #[arg(short, long)]
        index: PathBuf,

        /// Query terms (conjunctive)
        #[arg(short, long)]
        query: String,

        /// Keep every term's skip table in memory
        #[arg(long, default_value = "false")]
        chunks_in_memory: bool,

        /// Print document names instead of doc-ids
        #[arg(long, default_value = "false")]
        names: bool,

        /// Tokenize with the stop-word filter used at indexing time
        #[arg(long, default_value = "false")]
        stop_words: bool,
    },

    /// Show sealed-index info
    Info {
        /// Path to the index directory
        #[arg(short, long)]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Index {
            corpus,
            index,
            corpus_type,
            chunk_size,
            overwrite,
            multi_codec,
            workers,
            stop_words,
        } => cmd_index(
            corpus,
            index,
            corpus_type.into(),
            chunk_size,
            overwrite,
            multi_codec,
            workers,
            stop_words,
        ),
        Commands::Search {
            index,
            query,
            chunks_in_memory,
            names,
            stop_words,
        } => cmd_search(index, &query, chunks_in_memory, names, stop_words),
        Commands::Info { index } => cmd_info(index),
    }
}

fn tokenizer_for(stop_words: bool) -> Arc<dyn Tokenizer> {
    if stop_words {
        Arc::new(StopWordTokenizer::english())
    } else {
        Arc::new(LowercaseTokenizer)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_index(
    corpus: PathBuf,
    index_path: PathBuf,
    corpus_type: CorpusType,
    chunk_size: u32,
    overwrite: bool,
    multi_codec: bool,
    workers: Option<usize>,
    stop_words: bool,
) -> Result<()> {
    let mut config = IndexConfig::default();
    if multi_codec {
        config.docs_codecs = IndexConfig::all_codecs();
        // Frequencies are not monotone; Elias-Fano never applies to them
        config.freqs_codecs = vec![
            CodecId::VariableByte,
            CodecId::Unary,
            CodecId::Gamma,
            CodecId::BitPacking,
            CodecId::Simple16,
            CodecId::PForDelta,
        ];
    }
    if let Some(workers) = workers {
        config.max_child_indexers = workers;
    }

    let start = Instant::now();
    let indexer = Indexer::new(&corpus, corpus_type)
        .with_config(config)
        .with_tokenizer(tokenizer_for(stop_words));
    let (_, status) = indexer
        .create_index(&index_path, overwrite, chunk_size)
        .context("indexing failed")?;

    match status {
        IndexerStatus::Ok => {
            info!("indexed {:?} in {:.2?}", corpus, start.elapsed());
            Ok(())
        }
        IndexerStatus::AlreadyIndexed => {
            bail!("index {:?} already exists (use --overwrite to rebuild)", index_path)
        }
        IndexerStatus::CollectionNonExistent => {
            bail!("corpus directory {:?} does not exist", corpus)
        }
    }
}

fn cmd_search(
    index_path: PathBuf,
    query: &str,
    chunks_in_memory: bool,
    names: bool,
    stop_words: bool,
) -> Result<()> {
    let mut index = Index::new(&index_path);
    if !index.exists() {
        bail!("no sealed index at {:?}", index_path);
    }
    index.load(chunks_in_memory).context("loading index")?;

    let browser = Browser::with_tokenizer(&index, tokenizer_for(stop_words));
    let start = Instant::now();
    if names {
        let results = browser.browse_names(query)?;
        info!("{} hits in {:.2?}", results.len(), start.elapsed());
        for name in results {
            println!("{}", name);
        }
    } else {
        let results = browser.browse(query)?;
        info!("{} hits in {:.2?}", results.len(), start.elapsed());
        for doc in results {
            println!("{}", doc);
        }
    }
    Ok(())
}

fn cmd_info(index_path: PathBuf) -> Result<()> {
    let mut index = Index::new(&index_path);
    if !index.exists() {
        bail!("no sealed index at {:?}", index_path);
    }
    index.load(false).context("loading index")?;

    println!("index:      {:?}", index_path);
    println!("documents:  {}", index.num_docs()?);
    println!("terms:      {}", index.term_count()?);
    println!("chunk size: {}", index.chunk_size()?);
    for (label, path) in [
        ("collection", index.collection_path()),
        ("vocabulary", index.vocabulary_path()),
        ("chunksinfo", index.chunksinfo_path()),
        ("postings", index.postings_path()),
    ] {
        let len = std::fs::metadata(&path)?.len();
        println!("{:<11} {:>12} bytes", label, len);
    }
    Ok(())
}
