//! Hybrid retrieval pipeline
//!
//! Fans out to the vector and graph clients concurrently, fans in at the
//! fusion step, then passes the fused set to the judge reranker. Both
//! clients degrade to empty on their own failures, so a retrieval pass as a
//! whole never errors.

use crate::models::Candidate;
use tracing::debug;

pub mod fusion;
pub mod graph;
pub mod rerank;
pub mod vector;

pub use fusion::{reciprocal_rank_fusion, RRF_K};
pub use graph::{GraphNode, GraphSearchClient, GraphStore, MockGraphStore, Neo4jGraph};
pub use rerank::{parse_judge_indices, RelevanceReranker};
pub use vector::{DocumentIndex, MockDocumentIndex, QdrantIndex, ScoredDocument, VectorSearchClient};

pub struct HybridRetriever {
    vector: VectorSearchClient,
    graph: GraphSearchClient,
    reranker: RelevanceReranker,
}

impl HybridRetriever {
    pub fn new(
        vector: VectorSearchClient,
        graph: GraphSearchClient,
        reranker: RelevanceReranker,
    ) -> Self {
        Self {
            vector,
            graph,
            reranker,
        }
    }

    /// Run the full retrieval pass: concurrent vector + graph search, RRF
    /// fusion with content dedup, judge rerank with order-preserving
    /// fallback.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        speaker_filter: Option<&str>,
    ) -> Vec<Candidate> {
        // The two searches share no data dependency; fusion is the fan-in
        // barrier waiting on both.
        let (vector_results, graph_results) = tokio::join!(
            self.vector.search(query, top_k, speaker_filter),
            self.graph.search(query, top_k),
        );

        debug!(
            vector_hits = vector_results.len(),
            graph_hits = graph_results.len(),
            "Hybrid retrieval fan-in"
        );

        let fused = reciprocal_rank_fusion(vector_results, graph_results, RRF_K, top_k);
        self.reranker.rerank(query, fused).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockChatModel, MockEmbeddingModel};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn doc(content: &str, score: f32) -> ScoredDocument {
        ScoredDocument {
            content: content.to_string(),
            metadata: HashMap::new(),
            score,
        }
    }

    async fn retriever_with_delays(delay: Duration) -> HybridRetriever {
        let vector = VectorSearchClient::connect(
            Arc::new(MockEmbeddingModel::fixed(vec![1.0, 0.0])),
            Arc::new(MockDocumentIndex::with_documents(vec![doc("v1", 0.9)]).with_delay(delay)),
            Duration::from_secs(5),
        )
        .await;

        let graph = GraphSearchClient::new(
            Arc::new(MockChatModel::always("Concept")),
            Arc::new(
                MockGraphStore::with_nodes(vec![GraphNode {
                    name: "Concept".to_string(),
                    definition: "a definition".to_string(),
                }])
                .with_delay(delay),
            ),
            Duration::from_secs(5),
        );

        let reranker = RelevanceReranker::new(
            Arc::new(MockChatModel::always("")),
            Duration::from_secs(5),
        );

        HybridRetriever::new(vector, graph, reranker)
    }

    #[tokio::test]
    async fn test_backends_run_concurrently() {
        let delay = Duration::from_millis(150);
        let retriever = retriever_with_delays(delay).await;

        let started = Instant::now();
        let results = retriever.search("query", 5, None).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 2);
        // Wall clock approximates max(delay, delay), not their sum.
        assert!(
            elapsed < delay * 2,
            "expected concurrent fan-out, took {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_shared_content_fused_to_single_candidate() {
        let vector = VectorSearchClient::connect(
            Arc::new(MockEmbeddingModel::fixed(vec![1.0])),
            Arc::new(MockDocumentIndex::with_documents(vec![doc(
                "Concept: a definition",
                0.9,
            )])),
            Duration::from_secs(5),
        )
        .await;
        let graph = GraphSearchClient::new(
            Arc::new(MockChatModel::always("Concept")),
            Arc::new(MockGraphStore::with_nodes(vec![GraphNode {
                name: "Concept".to_string(),
                definition: "a definition".to_string(),
            }])),
            Duration::from_secs(5),
        );
        let reranker = RelevanceReranker::new(
            Arc::new(MockChatModel::always("")),
            Duration::from_secs(5),
        );

        let retriever = HybridRetriever::new(vector, graph, reranker);
        let results = retriever.search("query", 5, None).await;

        assert_eq!(results.len(), 1);
        let expected = 2.0 / (RRF_K as f32 + 1.0);
        assert!((results[0].score - expected).abs() < 1e-6);
    }
}
