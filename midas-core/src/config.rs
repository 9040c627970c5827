//! Indexing configuration.

use serde::{Deserialize, Serialize};

use crate::codecs::CodecId;
use crate::error::{Error, Result};

/// Default cap on parallel partial indexers
pub const MAX_CHILD_INDEXERS: usize = 2;

/// Default fraction of the partial-index base budget each worker may hold
/// in memory before flushing a sorted run
pub const RESOURCES_FACTOR: f64 = 0.5;

/// Base memory budget a partial indexer scales by `resources_factor`.
/// At the defaults a worker flushes roughly every 32 MiB of postings, which
/// lands around four temp runs on a mid-sized corpus.
const PARTIAL_BUDGET_BASE_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Codec candidates for the doc-id stream of every chunk
    pub docs_codecs: Vec<CodecId>,
    /// Codec candidates for the frequency stream of every chunk
    pub freqs_codecs: Vec<CodecId>,
    /// Upper bound on parallel partial indexers
    pub max_child_indexers: usize,
    /// Scales the partial-index memory budget, in (0, 1]
    pub resources_factor: f64,
    /// Reuse temp runs left behind by an aborted build
    pub reuse_tmp: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            docs_codecs: vec![CodecId::VariableByte],
            freqs_codecs: vec![CodecId::VariableByte],
            max_child_indexers: MAX_CHILD_INDEXERS,
            resources_factor: RESOURCES_FACTOR,
            reuse_tmp: true,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.docs_codecs.is_empty() {
            return Err(Error::Config("docs codec candidate set is empty".into()));
        }
        if self.freqs_codecs.is_empty() {
            return Err(Error::Config("freqs codec candidate set is empty".into()));
        }
        if self.freqs_codecs.iter().all(|c| c.monotone_only()) {
            return Err(Error::Config(
                "freqs candidate set holds only monotone codecs".into(),
            ));
        }
        if self.max_child_indexers == 0 {
            return Err(Error::Config("max_child_indexers must be at least 1".into()));
        }
        if !(self.resources_factor > 0.0 && self.resources_factor <= 1.0) {
            return Err(Error::Config(
                "resources_factor must lie in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Memory budget per partial indexer before a run flush
    pub fn run_budget_bytes(&self) -> usize {
        const FLOOR: usize = 1024 * 1024;
        ((PARTIAL_BUDGET_BASE_BYTES as f64 * self.resources_factor) as usize).max(FLOOR)
    }

    /// Candidate set for multi-codec selection on every codec
    pub fn all_codecs() -> Vec<CodecId> {
        crate::codecs::ALL_CODECS.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_variable_byte_both_streams() {
        let config = IndexConfig::default();
        assert_eq!(config.docs_codecs, vec![CodecId::VariableByte]);
        assert_eq!(config.freqs_codecs, vec![CodecId::VariableByte]);
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_configs() {
        let mut config = IndexConfig::default();
        config.docs_codecs.clear();
        assert!(config.validate().is_err());

        let mut config = IndexConfig::default();
        config.freqs_codecs = vec![CodecId::EliasFano];
        assert!(config.validate().is_err());

        let mut config = IndexConfig::default();
        config.resources_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = IndexConfig {
            docs_codecs: IndexConfig::all_codecs(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: IndexConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.docs_codecs, config.docs_codecs);
        assert_eq!(back.max_child_indexers, config.max_child_indexers);
    }
}
