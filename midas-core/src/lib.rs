//! Midas - a compressed inverted index with per-chunk codec selection
//!
//! The index stores one posting list per term, split into fixed-size chunks.
//! For every chunk the doc-id stream and the frequency stream are encoded
//! independently with whichever codec from the configured candidate set
//! produces the fewest bits. Seven codecs are available: VariableByte, Unary,
//! Gamma, BitPacking, Simple16, PForDelta and Elias-Fano.
//!
//! Indexing is external-memory and two-phase:
//! - parallel partial indexers consume disjoint corpus slices and flush
//!   sorted runs to temp files;
//! - a single-threaded merger performs a k-way merge over the runs and seals
//!   the index (collection.txt, vocabulary.txt, chunksinfo.bin, postings.bin).
//!
//! Query evaluation is conjunctive (Boolean AND) with galloping intersection
//! over lazily decoded chunks, skipping whole chunks via per-term skip tables.

pub mod chunk;
pub mod codecs;
pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod query;
pub mod stats;
pub mod tokenizer;

#[cfg(test)]
mod tests;

/// Document identifier, assigned densely in order of first appearance.
pub type DocId = u32;

/// Sentinel value indicating a cursor is exhausted.
pub const TERMINATED: DocId = DocId::MAX;

pub use codecs::CodecId;
pub use config::IndexConfig;
pub use error::{Error, Result};
pub use index::Index;
pub use indexer::{CorpusType, Indexer, IndexerStatus};
pub use query::Browser;
pub use tokenizer::{LowercaseTokenizer, StopWordTokenizer, Tokenizer};
