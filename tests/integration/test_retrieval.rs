//! Retrieval engine tests over mock ports.

use std::sync::Arc;
use std::time::Duration;

use braid::{
    HybridSearchConfig, IngestOptions, IngestionConfig, IngestionCoordinator, NoopSink,
    PlainTextExtractor, RetrievalEngine, SearchConfig, SearchType, VectorPoint, VectorStore,
};

use crate::mocks::{
    embed_vec, init_tracing, FailingEmbedder, MockEmbedder, MockKeywordStore, MockVectorStore,
    RecordingSink,
};

const COLLECTION: &str = "documents";
const INDEX: &str = "chunks";

fn engine(
    vectors: Arc<MockVectorStore>,
    keywords: Arc<MockKeywordStore>,
    embedder: Arc<dyn braid::EmbeddingProvider>,
    sink: Arc<dyn braid::ObservabilitySink>,
) -> RetrievalEngine {
    init_tracing();
    let config = SearchConfig {
        hybrid: HybridSearchConfig::new(0.6, 0.4, 0.0, 0.3, 10).unwrap(),
        timeout_ms: 1000,
    };
    RetrievalEngine::new(config, COLLECTION, INDEX, embedder, vectors, keywords, sink).unwrap()
}

/// Ingest documents through the real pipeline so both stores are populated.
async fn seed(
    vectors: Arc<MockVectorStore>,
    keywords: Arc<MockKeywordStore>,
    docs: &[(&str, &str)],
) {
    init_tracing();
    let coordinator = IngestionCoordinator::new(
        IngestionConfig {
            chunk_size_tokens: 20,
            overlap_tokens: 4,
            ..Default::default()
        },
        Arc::new(PlainTextExtractor),
        Arc::new(MockEmbedder::default()),
        vectors,
        keywords,
        Arc::new(NoopSink),
    )
    .unwrap();

    for (name, text) in docs {
        let result = coordinator
            .ingest(text.as_bytes(), name, IngestOptions::default())
            .await;
        assert!(result.success, "seeding {} failed: {:?}", name, result.error);
    }
}

fn corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "retrieval.txt",
            "Hybrid retrieval fuses vector and keyword scores. Weighted fusion \
             ranks chunks by combined relevance. Over-fetching feeds the merge step. ",
        ),
        (
            "ingestion.txt",
            "Documents are split into overlapping chunks. Each chunk is embedded \
             and written to two indexes. Failures are counted per store. ",
        ),
        (
            "gardening.txt",
            "Tomatoes grow best in full sunlight. Water the beds early in the \
             morning. Prune the lower leaves to prevent blight. ",
        ),
    ]
}

#[tokio::test]
async fn test_empty_knowledge_base_short_circuits() {
    let embedder = Arc::new(MockEmbedder::default());
    let sink = Arc::new(RecordingSink::default());
    let engine = engine(
        Arc::new(MockVectorStore::default()),
        Arc::new(MockKeywordStore::default()),
        embedder.clone(),
        sink.clone(),
    );

    let results = engine.retrieve("anything at all", 5, true).await.unwrap();

    assert!(results.is_empty());
    // The guard fires before the query embedding is ever generated.
    assert_eq!(embedder.call_count(), 0);

    let events = sink.retrievals.lock().unwrap();
    assert_eq!(events.as_slice(), &[(SearchType::Hybrid, 0)]);
}

#[tokio::test]
async fn test_semantic_search_returns_ranked_semantic_results() {
    let vectors = Arc::new(MockVectorStore::default());
    let keywords = Arc::new(MockKeywordStore::default());
    seed(vectors.clone(), keywords.clone(), &corpus()).await;

    let engine = engine(
        vectors,
        keywords,
        Arc::new(MockEmbedder::default()),
        Arc::new(NoopSink),
    );
    let results = engine
        .retrieve("hybrid retrieval fusion", 5, false)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 5);
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    for result in &results {
        assert_eq!(result.search_type, SearchType::Semantic);
        assert!((0.0..=1.0).contains(&result.score));
        assert!(!result.content.is_empty());
        assert!(!result.source.is_empty());
    }
}

#[tokio::test]
async fn test_hybrid_search_fuses_and_marks_overlap() {
    let vectors = Arc::new(MockVectorStore::default());
    let keywords = Arc::new(MockKeywordStore::default());
    seed(vectors.clone(), keywords.clone(), &corpus()).await;

    let engine = engine(
        vectors,
        keywords,
        Arc::new(MockEmbedder::default()),
        Arc::new(NoopSink),
    );
    let results = engine.retrieve("weighted fusion", 5, true).await.unwrap();

    assert!(!results.is_empty());
    // A chunk matching both the vector and keyword paths carries the fused type.
    assert!(results.iter().any(|r| r.search_type == SearchType::Hybrid));
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    for result in &results {
        assert!((0.0..=1.0).contains(&result.score));
    }
}

#[tokio::test]
async fn test_top_k_capped_at_max_results() {
    let vectors = Arc::new(MockVectorStore::default());
    let keywords = Arc::new(MockKeywordStore::default());
    seed(vectors.clone(), keywords.clone(), &corpus()).await;

    let config = SearchConfig {
        hybrid: HybridSearchConfig::new(0.6, 0.4, 0.0, 0.3, 2).unwrap(),
        timeout_ms: 1000,
    };
    let engine = RetrievalEngine::new(
        config,
        COLLECTION,
        INDEX,
        Arc::new(MockEmbedder::default()),
        vectors,
        keywords,
        Arc::new(NoopSink),
    )
    .unwrap();

    // Callers cannot page past the configured ceiling.
    let results = engine.retrieve("hybrid retrieval", 10, false).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_keyword_hits_below_floor_are_dropped() {
    let vectors = Arc::new(MockVectorStore::default());
    let keywords = Arc::new(MockKeywordStore::default());
    seed(
        vectors.clone(),
        keywords.clone(),
        &[("alpha.txt", "alpha content only. ")],
    )
    .await;

    let engine = engine(
        vectors,
        keywords,
        Arc::new(MockEmbedder::default()),
        Arc::new(NoopSink),
    );

    // One of four query terms matches: 25/100 normalizes to 0.25, below the
    // 0.3 keyword floor, so the chunk cannot enter through the keyword path.
    let results = engine
        .retrieve("alpha zzzq yyyx wwwv", 5, true)
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.search_type != SearchType::Hybrid));
}

#[tokio::test]
async fn test_hybrid_falls_back_to_semantic_on_keyword_failure() {
    let vectors = Arc::new(MockVectorStore::default());
    let good_keywords = Arc::new(MockKeywordStore::default());
    seed(vectors.clone(), good_keywords, &corpus()).await;

    let engine = engine(
        vectors,
        Arc::new(MockKeywordStore::failing_searches()),
        Arc::new(MockEmbedder::default()),
        Arc::new(NoopSink),
    );
    let results = engine.retrieve("weighted fusion", 5, true).await.unwrap();

    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.search_type, SearchType::Semantic);
    }
}

#[tokio::test]
async fn test_hybrid_falls_back_on_keyword_timeout() {
    let vectors = Arc::new(MockVectorStore::default());
    let good_keywords = Arc::new(MockKeywordStore::default());
    seed(vectors.clone(), good_keywords, &corpus()).await;

    let slow_keywords = Arc::new(MockKeywordStore::with_search_delay(Duration::from_millis(
        300,
    )));
    let config = SearchConfig {
        hybrid: HybridSearchConfig::new(0.6, 0.4, 0.0, 0.3, 10).unwrap(),
        timeout_ms: 50,
    };
    let engine = RetrievalEngine::new(
        config,
        COLLECTION,
        INDEX,
        Arc::new(MockEmbedder::default()),
        vectors,
        slow_keywords,
        Arc::new(NoopSink),
    )
    .unwrap();

    let results = engine.retrieve("weighted fusion", 5, true).await.unwrap();
    assert!(!results.is_empty());
    assert!(results
        .iter()
        .all(|r| r.search_type == SearchType::Semantic));
}

#[tokio::test]
async fn test_total_failure_propagates() {
    let vectors = Arc::new(MockVectorStore::default());
    // Non-empty collection so the empty-KB guard does not short-circuit.
    vectors
        .upsert(
            COLLECTION,
            vec![VectorPoint {
                id: uuid::Uuid::new_v4(),
                vector: embed_vec("seed"),
                payload: serde_json::json!({
                    "content": "seed", "source": "seed.txt", "chunk_index": 0
                }),
            }],
        )
        .await
        .unwrap();

    let engine = engine(
        vectors,
        Arc::new(MockKeywordStore::default()),
        Arc::new(FailingEmbedder),
        Arc::new(NoopSink),
    );

    // The hybrid path fails on the embedding call, and so does the
    // semantic-only fallback; only then does the error reach the caller.
    let result = engine.retrieve("anything", 5, true).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let engine = engine(
        Arc::new(MockVectorStore::default()),
        Arc::new(MockKeywordStore::default()),
        Arc::new(MockEmbedder::default()),
        Arc::new(NoopSink),
    );
    assert!(engine.retrieve("   ", 5, false).await.is_err());
}

#[tokio::test]
async fn test_context_expansion_returns_neighbors() {
    let vectors = Arc::new(MockVectorStore::with_lookup());
    let keywords = Arc::new(MockKeywordStore::default());
    seed(vectors.clone(), keywords.clone(), &corpus()).await;

    let engine = engine(
        vectors,
        keywords,
        Arc::new(MockEmbedder::default()),
        Arc::new(NoopSink),
    );
    // A single primary leaves its neighbors free to appear as context.
    let expanded = engine
        .search_with_context("weighted fusion", 1, false)
        .await
        .unwrap();

    assert_eq!(expanded.len(), 1);
    assert!(expanded.iter().any(|e| !e.context.is_empty()));
    for entry in &expanded {
        for neighbor in &entry.context {
            assert_eq!(neighbor.source, entry.result.source);
            let delta = i64::from(neighbor.chunk_index) - i64::from(entry.result.chunk_index);
            assert!(delta == 1 || delta == -1);
            // Primaries are never duplicated into their own context.
            assert!(expanded.iter().all(|e| e.result.id != neighbor.id));
        }
    }
}

#[tokio::test]
async fn test_context_expansion_degrades_without_lookup() {
    let vectors = Arc::new(MockVectorStore::default());
    let keywords = Arc::new(MockKeywordStore::default());
    seed(vectors.clone(), keywords.clone(), &corpus()).await;

    let engine = engine(
        vectors,
        keywords,
        Arc::new(MockEmbedder::default()),
        Arc::new(NoopSink),
    );
    let expanded = engine
        .search_with_context("weighted fusion", 3, false)
        .await
        .unwrap();

    assert!(!expanded.is_empty());
    assert!(expanded.iter().all(|e| e.context.is_empty()));
}
