//! End-to-end tests over the full pipeline: corpus -> partial runs -> merge
//! -> sealed index -> Boolean AND evaluation.

mod pipeline;

use std::io::Write;
use std::path::Path;

use crate::indexer::{CorpusType, Indexer, IndexerStatus};
use crate::Index;

pub(crate) fn write_file(dir: &Path, name: &str, content: &str) {
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(content.as_bytes()).unwrap();
}

/// Build and load a sealed index over text files given as (name, content)
pub(crate) fn build_index(
    docs: &[(&str, &str)],
    chunk_size: u32,
    chunks_info_in_memory: bool,
) -> (tempfile::TempDir, Index) {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    for (name, content) in docs {
        write_file(&corpus, name, content);
    }

    let out = tmp.path().join("index");
    let indexer = Indexer::new(&corpus, CorpusType::Text);
    let (mut index, status) = indexer.create_index(&out, false, chunk_size).unwrap();
    assert_eq!(status, IndexerStatus::Ok);
    index.load(chunks_info_in_memory).unwrap();
    (tmp, index)
}
