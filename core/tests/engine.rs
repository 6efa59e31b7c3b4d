use rankfuse_core::config::SearchConfig;
use rankfuse_core::hybrid::HybridSearch;
use rankfuse_core::index::{Document, InvertedIndex};
use rankfuse_core::persist::IndexPaths;
use rankfuse_core::providers::HashingEmbedder;
use rankfuse_core::SearchError;
use tempfile::tempdir;

fn bear_corpus() -> Vec<Document> {
    vec![
        Document {
            id: 1,
            title: "Bear Attack".into(),
            description: "A grizzly bear attacks a mountain camp. The rangers evacuate everyone downhill before nightfall.".into(),
        },
        Document {
            id: 2,
            title: "Bear Picnic".into(),
            description: "A family of bears gathers for a picnic by the river. Honey sandwiches are served on checkered blankets.".into(),
        },
        Document {
            id: 3,
            title: "Space War".into(),
            description: "Rival fleets clash beyond the outer planets. Lasers cut through the silent dark.".into(),
        },
    ]
}

fn open_engine(dir: &std::path::Path) -> HybridSearch<HashingEmbedder> {
    let config = SearchConfig::with_cache_dir(dir);
    HybridSearch::open(&bear_corpus(), HashingEmbedder::new(128), config).unwrap()
}

#[test]
fn bm25_search_returns_bear_documents_only() {
    let dir = tempdir().unwrap();
    let engine = open_engine(dir.path());

    let results = engine.bm25_search("bear", 2);
    let ids: Vec<u32> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(results.len(), 2);
    assert!(ids.contains(&1) && ids.contains(&2));
    assert!(!ids.contains(&3));
    for r in &results {
        assert_eq!(r.semantic_score, 0.0);
        assert_eq!(r.fused_score, r.keyword_score);
    }
}

#[test]
fn index_round_trip_is_identical() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let corpus = bear_corpus();
    let built = InvertedIndex::build(&corpus);
    built.save(&paths).unwrap();
    let loaded = InvertedIndex::load(&paths).unwrap();

    assert_eq!(built.len(), loaded.len());
    assert_eq!(built.avg_doc_len(), loaded.avg_doc_len());
    for doc in &corpus {
        assert_eq!(built.document(doc.id), loaded.document(doc.id));
        for term in ["bear", "picnic", "laser", "ranger", "zebra"] {
            assert_eq!(
                built.get_postings(term).unwrap(),
                loaded.get_postings(term).unwrap()
            );
            assert_eq!(
                built.term_frequency(doc.id, term).unwrap(),
                loaded.term_frequency(doc.id, term).unwrap()
            );
        }
    }
}

#[test]
fn partially_built_cache_names_the_missing_artifact() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let built = InvertedIndex::build(&bear_corpus());
    built.save(&paths).unwrap();
    std::fs::remove_file(paths.term_frequencies()).unwrap();

    let err = InvertedIndex::load(&paths).unwrap_err();
    match err {
        SearchError::MissingArtifact { name, .. } => assert_eq!(name, "term frequencies"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn open_rebuilds_when_corpus_changes() {
    let dir = tempdir().unwrap();
    open_engine(dir.path());

    // Same cache, larger corpus: every artifact must be rebuilt, not
    // served stale.
    let mut corpus = bear_corpus();
    corpus.push(Document {
        id: 4,
        title: "Bear Librarian".into(),
        description: "A bear catalogues honey recipes. The library smells of pine.".into(),
    });
    let config = SearchConfig::with_cache_dir(dir.path());
    let engine = HybridSearch::open(&corpus, HashingEmbedder::new(128), config).unwrap();
    assert_eq!(engine.index().len(), 4);

    let results = engine.bm25_search("librarian", 1);
    assert_eq!(results[0].doc_id, 4);
}

#[test]
fn dominant_document_ranks_first_under_both_fusions() {
    let dir = tempdir().unwrap();
    let engine = open_engine(dir.path());

    // Doc 2 dominates both sides for this query: "picnic" and "honey" hit
    // lexically and semantically, and neither term touches docs 1 or 3
    // nearly as hard.
    let query = "bears picnic honey river";
    let weighted = engine.weighted_hybrid_search(query, 0.5, 3).unwrap();
    let rrf = engine.rrf_hybrid_search(query, 60.0, 3).unwrap();
    assert_eq!(weighted[0].doc_id, 2);
    assert_eq!(rrf[0].doc_id, 2);
}

#[test]
fn fused_results_are_ordered_and_bounded() {
    let dir = tempdir().unwrap();
    let engine = open_engine(dir.path());

    let results = engine.rrf_hybrid_search("bear attack", 60.0, 2).unwrap();
    assert!(results.len() <= 2);
    for pair in results.windows(2) {
        assert!(pair[0].fused_score >= pair[1].fused_score);
    }
}

#[test]
fn vector_searches_reject_blank_queries() {
    let dir = tempdir().unwrap();
    let engine = open_engine(dir.path());

    assert!(matches!(
        engine.vector_search("  ", 5),
        Err(SearchError::EmptyInput)
    ));
    assert!(matches!(
        engine.chunked_vector_search("", 5),
        Err(SearchError::EmptyInput)
    ));
}

#[test]
fn chunked_search_returns_one_entry_per_document() {
    let dir = tempdir().unwrap();
    let engine = open_engine(dir.path());

    let results = engine.chunked_vector_search("honey sandwiches", 10).unwrap();
    let mut seen = std::collections::HashSet::new();
    for r in &results {
        assert!(seen.insert(r.doc_id), "duplicate parent {}", r.doc_id);
        assert_eq!(r.keyword_score, 0.0);
    }
}

#[test]
fn parallel_engine_matches_sequential() {
    let seq_dir = tempdir().unwrap();
    let par_dir = tempdir().unwrap();
    let sequential = open_engine(seq_dir.path());
    let mut config = SearchConfig::with_cache_dir(par_dir.path());
    config.parallel = true;
    let parallel = HybridSearch::open(&bear_corpus(), HashingEmbedder::new(128), config).unwrap();

    for query in ["bear", "picnic by the river", "space lasers"] {
        assert_eq!(
            sequential.bm25_search(query, 3),
            parallel.bm25_search(query, 3)
        );
        assert_eq!(
            sequential.rrf_hybrid_search(query, 60.0, 3).unwrap(),
            parallel.rrf_hybrid_search(query, 60.0, 3).unwrap()
        );
    }
}
