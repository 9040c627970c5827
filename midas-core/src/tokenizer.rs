//! Tokenizer API for text processing.
//!
//! The core treats terms as opaque byte strings; these tokenizers are the
//! standard front end shared by the indexing workers and the query browser.

use rustc_hash::FxHashSet;
use stop_words::LANGUAGE;

/// Trait for tokenizers
pub trait Tokenizer: Send + Sync {
    /// Split text into normalized terms
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Lowercase + split on non-alphanumeric runs
#[derive(Debug, Clone, Copy, Default)]
pub struct LowercaseTokenizer;

impl Tokenizer for LowercaseTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut terms = Vec::new();
        let mut current = String::new();

        if text.is_ascii() {
            // ASCII fast path: byte iteration, no char decoding
            for &b in text.as_bytes() {
                if b.is_ascii_alphanumeric() {
                    current.push(b.to_ascii_lowercase() as char);
                } else if !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            }
        } else {
            for ch in text.chars() {
                if ch.is_alphanumeric() {
                    current.extend(ch.to_lowercase());
                } else if !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            }
        }
        if !current.is_empty() {
            terms.push(current);
        }
        terms
    }
}

/// Default bounds on term length, in characters
pub const MIN_TERM_LEN: usize = 3;
pub const MAX_TERM_LEN: usize = 24;

/// LowercaseTokenizer plus stop-word removal and term-length bounds
#[derive(Debug, Clone)]
pub struct StopWordTokenizer {
    stops: FxHashSet<String>,
    min_len: usize,
    max_len: usize,
}

impl StopWordTokenizer {
    pub fn new(language: LANGUAGE) -> Self {
        let stops = stop_words::get(language).into_iter().collect();
        Self {
            stops,
            min_len: MIN_TERM_LEN,
            max_len: MAX_TERM_LEN,
        }
    }

    pub fn english() -> Self {
        Self::new(LANGUAGE::English)
    }

    pub fn spanish() -> Self {
        Self::new(LANGUAGE::Spanish)
    }

    pub fn with_term_lengths(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }
}

impl Tokenizer for StopWordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        LowercaseTokenizer
            .tokenize(text)
            .into_iter()
            .filter(|term| {
                let len = term.chars().count();
                len >= self.min_len && len <= self.max_len && !self.stops.contains(term)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_splits_non_alphanumeric() {
        let terms = LowercaseTokenizer.tokenize("Hello, World! foo_bar42 --x");
        assert_eq!(terms, vec!["hello", "world", "foo", "bar42", "x"]);
    }

    #[test]
    fn test_lowercase_unicode() {
        let terms = LowercaseTokenizer.tokenize("Grüße köln Ünïcode");
        assert_eq!(terms, vec!["grüße", "köln", "ünïcode"]);
    }

    #[test]
    fn test_query_matches_indexing_normalization() {
        let indexed = LowercaseTokenizer.tokenize("The QUICK  brown-Fox");
        let queried = LowercaseTokenizer.tokenize("the quick BROWN fox");
        assert_eq!(indexed, queried);
    }

    #[test]
    fn test_stop_words_and_lengths() {
        let tokenizer = StopWordTokenizer::english();
        let terms = tokenizer.tokenize("the quick brown fox is on an extraordinary journey");
        assert!(!terms.contains(&"the".to_string()));
        assert!(!terms.contains(&"is".to_string()));
        assert!(!terms.contains(&"on".to_string()));
        assert!(terms.contains(&"quick".to_string()));
        assert!(terms.contains(&"extraordinary".to_string()));

        // Two-character tokens fall below MIN_TERM_LEN
        let terms = tokenizer.tokenize("ab abc");
        assert_eq!(terms, vec!["abc"]);
    }
}
