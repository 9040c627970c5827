//! Query evaluation: Boolean AND over the sealed index.

mod cursor;
mod intersect;

pub use cursor::PostingCursor;
pub use intersect::intersect;

use std::sync::Arc;

use crate::error::Result;
use crate::index::Index;
use crate::tokenizer::{LowercaseTokenizer, Tokenizer};
use crate::DocId;

/// Conjunctive query front end over a loaded index.
///
/// The query string is pushed through the same tokenizer that indexed the
/// corpus, so terms normalize identically on both sides. A query term absent
/// from the vocabulary short-circuits to the empty result (AND semantics);
/// it is never surfaced as an error.
pub struct Browser<'a> {
    index: &'a Index,
    tokenizer: Arc<dyn Tokenizer>,
}

impl<'a> Browser<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self {
            index,
            tokenizer: Arc::new(LowercaseTokenizer),
        }
    }

    pub fn with_tokenizer(index: &'a Index, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { index, tokenizer }
    }

    /// Evaluate `query` as a conjunction of its terms; returns matching
    /// doc-ids in ascending order.
    pub fn browse(&self, query: &str) -> Result<Vec<DocId>> {
        let mut terms = self.tokenizer.tokenize(query);
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut cursors = Vec::with_capacity(terms.len());
        for term in &terms {
            match self.index.cursor(term)? {
                Some(cursor) => cursors.push(cursor),
                None => {
                    // Missing term: AND of anything with the empty set
                    log::debug!("query term {:?} not in vocabulary", term);
                    return Ok(Vec::new());
                }
            }
        }

        intersect(&mut cursors)
    }

    /// Like `browse`, resolving doc-ids to external names
    pub fn browse_names(&self, query: &str) -> Result<Vec<String>> {
        let docs = self.browse(query)?;
        let mut names = Vec::with_capacity(docs.len());
        for doc in docs {
            names.push(self.index.doc_name(doc)?.to_string());
        }
        Ok(names)
    }
}
