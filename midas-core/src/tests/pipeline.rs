//! Indexing-pipeline tests: round-trips, codec selection, overwrite gate,
//! temp-run reuse and both metadata residency modes.

use std::path::Path;

use super::{build_index, write_file};
use crate::codecs::CodecId;
use crate::config::IndexConfig;
use crate::indexer::merger::merge_runs;
use crate::indexer::run::RunWriter;
use crate::indexer::{CorpusType, Indexer, IndexerStatus};
use crate::{DocId, Index};

/// Sorted file names are a.txt..d.txt, so doc-ids are 0..4 in that order
const CORPUS: &[(&str, &str)] = &[
    ("a.txt", "alpha beta"),
    ("b.txt", "beta gamma beta"),
    ("c.txt", "alpha beta delta"),
    ("d.txt", "delta"),
];

#[test]
fn test_sealed_lists_round_trip() {
    let (_tmp, index) = build_index(CORPUS, 0, true);
    assert_eq!(index.num_docs().unwrap(), 4);
    assert_eq!(index.term_count().unwrap(), 4);

    assert_eq!(index.posting_list("alpha").unwrap(), vec![(0, 1), (2, 1)]);
    assert_eq!(
        index.posting_list("beta").unwrap(),
        vec![(0, 1), (1, 2), (2, 1)]
    );
    assert_eq!(index.posting_list("gamma").unwrap(), vec![(1, 1)]);
    assert_eq!(index.posting_list("delta").unwrap(), vec![(2, 1), (3, 1)]);

    assert_eq!(index.doc_name(0).unwrap(), "a.txt");
    assert_eq!(index.doc_name(3).unwrap(), "d.txt");
}

#[test]
fn test_both_residency_modes_agree() {
    let (_tmp_a, in_memory) = build_index(CORPUS, 2, true);
    let (_tmp_b, on_disk) = build_index(CORPUS, 2, false);

    for term in ["alpha", "beta", "gamma", "delta"] {
        assert_eq!(
            in_memory.posting_list(term).unwrap(),
            on_disk.posting_list(term).unwrap(),
            "term {:?} differs between residency modes",
            term
        );
    }
    assert!(on_disk.term_meta("nothere").unwrap().is_none());
}

#[test]
fn test_overwrite_gate_leaves_files_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    for (name, content) in CORPUS {
        write_file(&corpus, name, content);
    }
    let out = tmp.path().join("index");

    let indexer = Indexer::new(&corpus, CorpusType::Text);
    let (_, status) = indexer.create_index(&out, false, 0).unwrap();
    assert_eq!(status, IndexerStatus::Ok);

    let mtime = |name: &str| {
        std::fs::metadata(out.join(name))
            .unwrap()
            .modified()
            .unwrap()
    };
    let before: Vec<_> = ["collection.txt", "vocabulary.txt", "chunksinfo.bin", "postings.bin"]
        .iter()
        .map(|n| mtime(n))
        .collect();

    let (_, status) = indexer.create_index(&out, false, 0).unwrap();
    assert_eq!(status, IndexerStatus::AlreadyIndexed);

    let after: Vec<_> = ["collection.txt", "vocabulary.txt", "chunksinfo.bin", "postings.bin"]
        .iter()
        .map(|n| mtime(n))
        .collect();
    assert_eq!(before, after);

    // overwrite = true rebuilds
    let (_, status) = indexer.create_index(&out, true, 0).unwrap();
    assert_eq!(status, IndexerStatus::Ok);
}

#[test]
fn test_missing_corpus_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("index");

    let indexer = Indexer::new(tmp.path().join("no-such-corpus"), CorpusType::Text);
    let (index, status) = indexer.create_index(&out, false, 0).unwrap();
    assert_eq!(status, IndexerStatus::CollectionNonExistent);
    assert!(!index.exists());
    assert!(!out.exists());
}

/// Scenario: 10,000 consecutive doc-ids with candidates {VariableByte,
/// BitPacking, EliasFano}. The selected docs codec must be the bit-length
/// minimum, ties resolved by precedence.
#[test]
fn test_multi_codec_selection_takes_minimum() {
    let doc_ids: Vec<DocId> = (0..10_000).collect();
    let gaps_bits = |codec: CodecId| {
        // Candidates other than Elias-Fano score the d-gap sequence
        let mut gaps = vec![doc_ids[0]];
        gaps.extend(doc_ids.windows(2).map(|w| w[1] - w[0]));
        codec.bit_len(&gaps)
    };

    let candidates = [CodecId::VariableByte, CodecId::BitPacking, CodecId::EliasFano];
    let freqs = vec![1u32; doc_ids.len()];
    let mut buf = Vec::new();
    let written = crate::chunk::write_chunk(
        &mut buf,
        &doc_ids,
        &freqs,
        &candidates,
        &[CodecId::VariableByte],
    )
    .unwrap();

    let ef_bits = CodecId::EliasFano.bit_len(&doc_ids);
    let bp_bits = gaps_bits(CodecId::BitPacking);
    let vb_bits = gaps_bits(CodecId::VariableByte);
    let min = ef_bits.min(bp_bits).min(vb_bits);

    if ef_bits < bp_bits.min(vb_bits) {
        assert_eq!(written.docs_codec, CodecId::EliasFano);
    } else {
        // On ties precedence puts VariableByte before BitPacking before
        // EliasFano
        assert_ne!(written.docs_codec, CodecId::EliasFano);
    }
    let written_bits = match written.docs_codec {
        CodecId::EliasFano => ef_bits,
        other => gaps_bits(other),
    };
    assert_eq!(written_bits, min);

    let chunk = crate::chunk::read_chunk(&mut &buf[..]).unwrap();
    assert_eq!(chunk.doc_ids, doc_ids);
}

#[test]
fn test_statistics_emitted_only_for_multi_codec_sets() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    for (name, content) in CORPUS {
        write_file(&corpus, name, content);
    }

    // Single-codec config: no stats files
    let out = tmp.path().join("mono");
    Indexer::new(&corpus, CorpusType::Text)
        .create_index(&out, false, 0)
        .unwrap();
    assert!(!out.join("encoder_docs_statistics.txt").exists());
    assert!(!out.join("encoder_freqs_statistics.txt").exists());

    // Multi-codec docs, single-codec freqs: docs stats only
    let config = IndexConfig {
        docs_codecs: vec![CodecId::VariableByte, CodecId::BitPacking, CodecId::Gamma],
        ..Default::default()
    };
    let out = tmp.path().join("multi");
    let (mut index, _) = Indexer::new(&corpus, CorpusType::Text)
        .with_config(config)
        .create_index(&out, false, 0)
        .unwrap();
    let stats = std::fs::read_to_string(out.join("encoder_docs_statistics.txt")).unwrap();
    assert!(!out.join("encoder_freqs_statistics.txt").exists());

    // Each line's codec matches the one recorded in the term's skip table
    index.load(true).unwrap();
    for line in stats.lines() {
        let mut fields = line.split('\t');
        let term = fields.next().unwrap();
        let codec = fields.next().unwrap();
        let meta = index.term_meta(term).unwrap().unwrap();
        assert_eq!(meta.chunks[0].docs_codec.name(), codec);
    }
}

#[test]
fn test_two_workers_merge_common_term() {
    // Enough files that both workers get a share; every doc holds "common"
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    for i in 0..10 {
        write_file(
            &corpus,
            &format!("doc{:02}.txt", i),
            &format!("common unique{:02}", i),
        );
    }

    let out = tmp.path().join("index");
    let (mut index, status) = Indexer::new(&corpus, CorpusType::Text)
        .create_index(&out, false, 0)
        .unwrap();
    assert_eq!(status, IndexerStatus::Ok);
    index.load(true).unwrap();

    let expected: Vec<(DocId, u32)> = (0..10).map(|d| (d, 1)).collect();
    assert_eq!(index.posting_list("common").unwrap(), expected);
    assert_eq!(index.posting_list("unique07").unwrap(), vec![(7, 1)]);
}

#[test]
fn test_reuse_tmp_skips_partial_phase() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("index");
    let tmp_runs = out.join("tmp");
    std::fs::create_dir_all(&tmp_runs).unwrap();

    // Plant a pre-built run; the corpus dir exists but stays empty, so any
    // sealed postings can only come from the planted run
    let run = tmp_runs.join("run-000-000.run");
    let mut writer = RunWriter::create(run).unwrap();
    writer.push("planted", &[(0, 5)]).unwrap();
    writer.finish().unwrap();

    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();

    let (mut index, status) = Indexer::new(&corpus, CorpusType::Text)
        .create_index(&out, false, 0)
        .unwrap();
    assert_eq!(status, IndexerStatus::Ok);
    index.load(true).unwrap();
    assert_eq!(index.posting_list("planted").unwrap(), vec![(0, 5)]);
    // Temp runs are discarded once the index seals
    assert!(!tmp_runs.exists());
}

#[test]
fn test_truncated_run_aborts_merge() {
    let tmp = tempfile::tempdir().unwrap();
    let run = tmp.path().join("run-000-000.run");
    let mut writer = RunWriter::create(run.clone()).unwrap();
    writer.push("term", &[(0, 1), (900, 1)]).unwrap();
    writer.finish().unwrap();

    let bytes = std::fs::read(&run).unwrap();
    std::fs::write(&run, &bytes[..bytes.len() - 1]).unwrap();

    let out = tmp.path().join("index");
    std::fs::create_dir_all(&out).unwrap();
    let result = merge_runs(
        &[run],
        &["doc".to_string()],
        &out,
        0,
        &IndexConfig::default(),
    );
    assert!(result.is_err());
    assert!(!Index::new(&out).exists());
}

fn collection_lines(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("collection.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_trec_corpus_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    write_file(
        &corpus,
        "batch.trec",
        "<DOC>\n<DOCNO> T-100 </DOCNO>\nshared solo100\n</DOC>\n\
         <DOC>\n<DOCNO> T-200 </DOCNO>\nshared solo200\n</DOC>\n",
    );

    let out = tmp.path().join("index");
    let (mut index, status) = Indexer::new(&corpus, CorpusType::Trec)
        .create_index(&out, false, 0)
        .unwrap();
    assert_eq!(status, IndexerStatus::Ok);
    index.load(true).unwrap();

    assert_eq!(collection_lines(&out), vec!["T-100", "T-200"]);
    assert_eq!(index.posting_list("shared").unwrap(), vec![(0, 1), (1, 1)]);
    assert_eq!(index.posting_list("solo200").unwrap(), vec![(1, 1)]);
}

/// A repeated DOCNO keeps the first assignment: one collection row, and
/// terms from both regions land on the original doc-id with summed tfs.
#[test]
fn test_trec_duplicate_docno_keeps_first_assignment() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    write_file(
        &corpus,
        "batch.trec",
        "<DOC>\n<DOCNO> T-1 </DOCNO>\nshared alpha\n</DOC>\n\
         <DOC>\n<DOCNO> T-2 </DOCNO>\nshared\n</DOC>\n\
         <DOC>\n<DOCNO> T-1 </DOCNO>\nalpha bravo\n</DOC>\n",
    );

    let out = tmp.path().join("index");
    let (mut index, status) = Indexer::new(&corpus, CorpusType::Trec)
        .create_index(&out, false, 0)
        .unwrap();
    assert_eq!(status, IndexerStatus::Ok);
    index.load(true).unwrap();

    assert_eq!(collection_lines(&out), vec!["T-1", "T-2"]);
    assert_eq!(index.num_docs().unwrap(), 2);
    // "alpha" occurs once in each T-1 region: tf 2 on doc 0
    assert_eq!(index.posting_list("alpha").unwrap(), vec![(0, 2)]);
    assert_eq!(index.posting_list("bravo").unwrap(), vec![(0, 1)]);
    assert_eq!(index.posting_list("shared").unwrap(), vec![(0, 1), (1, 1)]);
}

/// The repeat can land in a later worker's slice than the first occurrence;
/// the merger folds the overlapping doc-id back in, summing frequencies.
#[test]
fn test_trec_duplicate_docno_across_slices() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    // Four files, two workers: slices [a,b] and [c,d]; d repeats X from a
    write_file(
        &corpus,
        "a.trec",
        "<DOC>\n<DOCNO> X </DOCNO>\nxterm alone\n</DOC>\n\
         <DOC>\n<DOCNO> Y </DOCNO>\nfiller\n</DOC>\n",
    );
    write_file(&corpus, "b.trec", "<DOC>\n<DOCNO> B </DOCNO>\nfiller\n</DOC>\n");
    write_file(&corpus, "c.trec", "<DOC>\n<DOCNO> C </DOCNO>\nfiller\n</DOC>\n");
    write_file(
        &corpus,
        "d.trec",
        "<DOC>\n<DOCNO> X </DOCNO>\nxterm late\n</DOC>\n",
    );

    let out = tmp.path().join("index");
    let (mut index, status) = Indexer::new(&corpus, CorpusType::Trec)
        .create_index(&out, false, 0)
        .unwrap();
    assert_eq!(status, IndexerStatus::Ok);
    index.load(true).unwrap();

    assert_eq!(collection_lines(&out), vec!["X", "Y", "B", "C"]);
    assert_eq!(index.posting_list("xterm").unwrap(), vec![(0, 2)]);
    assert_eq!(index.posting_list("late").unwrap(), vec![(0, 1)]);
    assert_eq!(
        index.posting_list("filler").unwrap(),
        vec![(1, 1), (2, 1), (3, 1)]
    );
}
