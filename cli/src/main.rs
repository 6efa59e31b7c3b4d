use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rankfuse_core::chunk::{fixed_chunk, semantic_chunk};
use rankfuse_core::config::{
    SearchConfig, DEFAULT_ALPHA, DEFAULT_BM25_B, DEFAULT_BM25_K1, DEFAULT_MAX_SENTENCES,
    DEFAULT_RRF_K, DEFAULT_SEARCH_LIMIT, DEFAULT_SENTENCE_OVERLAP,
};
use rankfuse_core::fusion::normalize_scores;
use rankfuse_core::hybrid::{HybridSearch, RankedResult};
use rankfuse_core::index::InvertedIndex;
use rankfuse_core::persist::IndexPaths;
use rankfuse_core::providers::{EmbeddingProvider, HashingEmbedder, TextGenerator};
use rankfuse_core::Document;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod eval;
mod rag;

#[derive(Debug, Deserialize)]
struct Corpus {
    #[serde(alias = "movies")]
    documents: Vec<Document>,
}

#[derive(Parser)]
#[command(name = "rankfuse")]
#[command(about = "Hybrid BM25 + semantic search over a JSON document corpus", long_about = None)]
struct Cli {
    /// Corpus JSON file: {"documents": [{id, title, description}]}
    #[arg(long, default_value = "data/movies.json", global = true)]
    data: PathBuf,
    /// Cache directory for index and embedding artifacts
    #[arg(long, default_value = "cache", global = true)]
    cache: PathBuf,
    /// Score documents with a parallel map
    #[arg(long, default_value_t = false, global = true)]
    parallel: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index and persist it to the cache directory
    Build,
    /// Search the corpus with BM25
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_BM25_K1)]
        k1: f32,
        #[arg(long, default_value_t = DEFAULT_BM25_B)]
        b: f32,
    },
    /// Term frequency of a term in one document
    Tf { id: u32, term: String },
    /// BM25 inverse document frequency of a term
    Bm25Idf { term: String },
    /// BM25 term-frequency component for one document and term
    Bm25Tf {
        id: u32,
        term: String,
        #[arg(long, default_value_t = DEFAULT_BM25_K1)]
        k1: f32,
        #[arg(long, default_value_t = DEFAULT_BM25_B)]
        b: f32,
    },
    /// Min-max normalize a list of scores
    Normalize { scores: Vec<f32> },
    /// Embed a text and print its dimensions
    Embed { text: String },
    /// Search the corpus by whole-document embedding similarity
    SemanticSearch {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Search the corpus at chunk granularity
    ChunkSearch {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Split text into fixed word windows
    Chunk {
        text: String,
        #[arg(long, default_value_t = 50)]
        size: usize,
        #[arg(long, default_value_t = 10)]
        overlap: usize,
    },
    /// Split text into overlapping sentence groups
    SemanticChunk {
        text: String,
        #[arg(long, default_value_t = DEFAULT_MAX_SENTENCES)]
        max_sentences: usize,
        #[arg(long, default_value_t = DEFAULT_SENTENCE_OVERLAP)]
        overlap: usize,
    },
    /// Weighted hybrid search (normalized BM25 and semantic scores)
    WeightedSearch {
        query: String,
        #[arg(long, default_value_t = DEFAULT_ALPHA)]
        alpha: f32,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Reciprocal Rank Fusion hybrid search
    RrfSearch {
        query: String,
        #[arg(long, default_value_t = DEFAULT_RRF_K)]
        k: f32,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Retrieve with RRF fusion and generate an answer from the results
    Rag { query: String },
    /// Score retrieval quality against a golden dataset
    Evaluate {
        /// Golden dataset JSON: [{query, relevant_ids}]
        #[arg(long, default_value = "data/golden.json")]
        golden: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        k: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let mut config = SearchConfig::with_cache_dir(&cli.cache);
    config.parallel = cli.parallel;

    match cli.command {
        Commands::Build => {
            let documents = load_corpus(&cli.data)?;
            let index = InvertedIndex::build(&documents);
            index.save(&IndexPaths::new(&cli.cache))?;
            println!(
                "indexed {} documents into {}",
                index.len(),
                cli.cache.display()
            );
        }
        Commands::Search { query, limit, k1, b } => {
            let documents = load_corpus(&cli.data)?;
            config.k1 = k1;
            config.b = b;
            let engine = open_engine(&documents, config)?;
            for (i, r) in engine.bm25_search(&query, limit).iter().enumerate() {
                println!("{}. {} (score: {:.4})", i + 1, r.title, r.keyword_score);
            }
        }
        Commands::Tf { id, term } => {
            let index = load_index(&cli.cache)?;
            let tf = index.term_frequency(id, &term)?;
            println!("term frequency of {term:?} in document {id}: {tf}");
        }
        Commands::Bm25Idf { term } => {
            let index = load_index(&cli.cache)?;
            println!("BM25 IDF of {:?}: {:.2}", term, index.bm25_idf(&term)?);
        }
        Commands::Bm25Tf { id, term, k1, b } => {
            let index = load_index(&cli.cache)?;
            let tf = index.bm25_tf(id, &term, k1, b)?;
            println!("BM25 TF of {term:?} in document {id}: {tf:.2}");
        }
        Commands::Normalize { scores } => {
            for score in normalize_scores(&scores) {
                println!("* {score:.4}");
            }
        }
        Commands::Embed { text } => {
            let embedder = HashingEmbedder::default();
            let vector = embedder.embed(&text)?;
            let head: Vec<String> = vector.iter().take(3).map(|v| format!("{v:.4}")).collect();
            println!("first 3 dimensions: [{}]", head.join(", "));
            println!("dimensions: {}", vector.len());
        }
        Commands::SemanticSearch { query, limit } => {
            let documents = load_corpus(&cli.data)?;
            let engine = open_engine(&documents, config)?;
            print_semantic(&engine.vector_search(&query, limit)?);
        }
        Commands::ChunkSearch { query, limit } => {
            let documents = load_corpus(&cli.data)?;
            let engine = open_engine(&documents, config)?;
            print_semantic(&engine.chunked_vector_search(&query, limit)?);
        }
        Commands::Chunk { text, size, overlap } => {
            check_window(overlap, size, "chunk size")?;
            println!("chunking {} characters", text.len());
            for (i, words) in fixed_chunk(&text, size, overlap).iter().enumerate() {
                println!("{}. {}", i + 1, words.join(" "));
            }
        }
        Commands::SemanticChunk {
            text,
            max_sentences,
            overlap,
        } => {
            check_window(overlap, max_sentences, "max sentences")?;
            println!("chunking {} characters", text.len());
            for (i, chunk) in semantic_chunk(&text, max_sentences, overlap).iter().enumerate() {
                println!("{}. {chunk}", i + 1);
            }
        }
        Commands::WeightedSearch { query, alpha, limit } => {
            let documents = load_corpus(&cli.data)?;
            let engine = open_engine(&documents, config)?;
            for (i, r) in engine
                .weighted_hybrid_search(&query, alpha, limit)?
                .iter()
                .enumerate()
            {
                println!("{}. {}", i + 1, r.title);
                println!("Hybrid Score: {:.3}", r.fused_score);
                println!(
                    "BM25: {:.3}, Semantic: {:.3}",
                    r.keyword_score, r.semantic_score
                );
                println!("{}\n", r.description);
            }
        }
        Commands::RrfSearch { query, k, limit } => {
            let documents = load_corpus(&cli.data)?;
            let engine = open_engine(&documents, config)?;
            for (i, r) in engine.rrf_hybrid_search(&query, k, limit)?.iter().enumerate() {
                println!("{}. {}", i + 1, r.title);
                println!("RRF Score: {:.4}", r.fused_score);
                println!("{}\n", r.description);
            }
        }
        Commands::Rag { query } => {
            let documents = load_corpus(&cli.data)?;
            let engine = open_engine(&documents, config)?;
            let results = engine.rrf_hybrid_search(&query, DEFAULT_RRF_K, DEFAULT_SEARCH_LIMIT)?;
            let generator = rag::ExtractiveGenerator::default();
            let answer = generator.generate(&rag::build_prompt(&query, &results))?;
            println!("Search Results:");
            for r in &results {
                println!("  - {}", r.title);
            }
            println!("RAG Response:\n{answer}");
        }
        Commands::Evaluate { golden, k } => {
            let documents = load_corpus(&cli.data)?;
            let engine = open_engine(&documents, config)?;
            let raw = fs::read_to_string(&golden)
                .with_context(|| format!("reading golden dataset from {}", golden.display()))?;
            let cases: Vec<eval::GoldenCase> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing golden dataset at {}", golden.display()))?;

            let mut scored = Vec::new();
            for case in &cases {
                let retrieved: Vec<u32> = engine
                    .rrf_hybrid_search(&case.query, DEFAULT_RRF_K, k)?
                    .iter()
                    .map(|r| r.doc_id)
                    .collect();
                let m = eval::precision_recall_f1(&retrieved, &case.relevant_ids, k);
                println!(
                    "{}: precision@{k} {:.3}, recall@{k} {:.3}, f1 {:.3}",
                    case.query, m.precision, m.recall, m.f1
                );
                scored.push(m);
            }
            let mean = eval::mean_metrics(&scored);
            println!(
                "mean over {} queries: precision {:.3}, recall {:.3}, f1 {:.3}",
                scored.len(),
                mean.precision,
                mean.recall,
                mean.f1
            );
        }
    }
    Ok(())
}

/// Reject window parameters the chunkers would panic on.
fn check_window(overlap: usize, size: usize, what: &str) -> Result<()> {
    anyhow::ensure!(size > 0, "{what} must be positive");
    anyhow::ensure!(
        overlap < size,
        "overlap ({overlap}) must be less than {what} ({size})"
    );
    Ok(())
}

fn load_corpus(path: &PathBuf) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading corpus from {}", path.display()))?;
    let corpus: Corpus = serde_json::from_str(&raw)
        .with_context(|| format!("parsing corpus JSON at {}", path.display()))?;
    tracing::debug!(docs = corpus.documents.len(), "loaded corpus");
    Ok(corpus.documents)
}

fn open_engine(
    documents: &[Document],
    config: SearchConfig,
) -> Result<HybridSearch<HashingEmbedder>> {
    let provider = HashingEmbedder::new(config.embedding_dim);
    Ok(HybridSearch::open(documents, provider, config)?)
}

fn load_index(cache: &PathBuf) -> Result<InvertedIndex> {
    InvertedIndex::load(&IndexPaths::new(cache))
        .context("loading the persisted index (run `rankfuse build` first)")
}

fn print_semantic(results: &[RankedResult]) {
    for (i, r) in results.iter().enumerate() {
        println!("{}. {} (score: {:.4})", i + 1, r.title, r.semantic_score);
        let preview: String = r.description.chars().take(100).collect();
        println!("{preview}...");
        println!("===========================");
    }
}
