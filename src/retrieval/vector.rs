//! Vector similarity search client
//!
//! Embeds the query and runs a similarity search with an optional
//! speaker-equality filter. Every failure degrades to an empty result; if
//! the index is unreachable when the client is built, a permanent disabled
//! flag short-circuits later calls instead of retrying a dead connection
//! on every query.

use crate::error::AdvisoryError;
use crate::llm::EmbeddingModel;
use crate::models::{Candidate, CandidateOrigin};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// One scored hit from the document store.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub content: String,
    pub metadata: HashMap<String, Value>,
    pub score: f32,
}

/// Similarity index boundary. Read queries are stateless and safe to share
/// across concurrent requests.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Cheap reachability probe used once at client construction.
    async fn ping(&self) -> Result<()>;

    async fn query(
        &self,
        vector: &[f32],
        speaker_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;
}

pub struct VectorSearchClient {
    embeddings: Arc<dyn EmbeddingModel>,
    index: Arc<dyn DocumentIndex>,
    disabled: bool,
    call_timeout: Duration,
}

impl VectorSearchClient {
    /// Probe the index once; an unreachable backend permanently disables
    /// this client so later searches return empty without network traffic.
    pub async fn connect(
        embeddings: Arc<dyn EmbeddingModel>,
        index: Arc<dyn DocumentIndex>,
        call_timeout: Duration,
    ) -> Self {
        let disabled = match timeout(call_timeout, index.ping()).await {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                warn!(stage = "vector", "Vector index unavailable, disabling client: {}", e);
                true
            }
            Err(_) => {
                warn!(stage = "vector", "Vector index probe timed out, disabling client");
                true
            }
        };

        Self {
            embeddings,
            index,
            disabled,
            call_timeout,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns up to `top_k` candidates ordered by descending similarity,
    /// tagged `origin = vector`. Never errors.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        speaker_filter: Option<&str>,
    ) -> Vec<Candidate> {
        if self.disabled {
            debug!("Vector index disabled, skipping search");
            return Vec::new();
        }

        let vector = match timeout(self.call_timeout, self.embeddings.embed(query)).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                warn!(stage = "embed", "Embedding failed: {}", e);
                return Vec::new();
            }
            Err(_) => {
                warn!(stage = "embed", "Embedding timed out");
                return Vec::new();
            }
        };

        match timeout(
            self.call_timeout,
            self.index.query(&vector, speaker_filter, top_k),
        )
        .await
        {
            Ok(Ok(documents)) => documents
                .into_iter()
                .map(|doc| Candidate {
                    content: doc.content,
                    metadata: doc.metadata,
                    score: doc.score,
                    origin: CandidateOrigin::Vector,
                })
                .collect(),
            Ok(Err(e)) => {
                warn!(stage = "vector", "Similarity query failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!(stage = "vector", "Similarity query timed out");
                Vec::new()
            }
        }
    }
}

/// Qdrant-backed index over its REST search endpoint.
pub struct QdrantIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantIndex {
    pub fn new(base_url: String, api_key: Option<String>, collection: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            api_key,
            collection,
        }
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }
}

#[async_trait]
impl DocumentIndex for QdrantIndex {
    async fn ping(&self) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AdvisoryError::BackendUnavailable {
                stage: "vector",
                detail: e.to_string(),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AdvisoryError::BackendUnavailable {
                stage: "vector",
                detail: format!("collection probe returned {}", response.status()),
            })
        }
    }

    async fn query(
        &self,
        vector: &[f32],
        speaker_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(speaker) = speaker_filter {
            body["filter"] = json!({
                "must": [{ "key": "speaker_name", "match": { "value": speaker } }]
            });
        }

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let response = self
            .with_auth(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisoryError::BackendUnavailable {
                stage: "vector",
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AdvisoryError::BackendUnavailable {
                stage: "vector",
                detail: format!("search returned {}", response.status()),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(hits
            .into_iter()
            .map(|hit| {
                let payload: HashMap<String, Value> = hit
                    .get("payload")
                    .and_then(Value::as_object)
                    .map(|obj| obj.clone().into_iter().collect())
                    .unwrap_or_default();
                let content = payload
                    .get("chunk_text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let score = hit
                    .get("score")
                    .and_then(Value::as_f64)
                    .unwrap_or_default() as f32;

                ScoredDocument {
                    content,
                    metadata: payload,
                    score,
                }
            })
            .collect())
    }
}

/// Mock index for development & testing.
pub struct MockDocumentIndex {
    documents: Vec<ScoredDocument>,
    reachable: bool,
    delay: Option<Duration>,
}

impl MockDocumentIndex {
    pub fn with_documents(documents: Vec<ScoredDocument>) -> Self {
        Self {
            documents,
            reachable: true,
            delay: None,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            documents: Vec::new(),
            reachable: false,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl DocumentIndex for MockDocumentIndex {
    async fn ping(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(AdvisoryError::BackendUnavailable {
                stage: "vector",
                detail: "mock index offline".to_string(),
            })
        }
    }

    async fn query(
        &self,
        _vector: &[f32],
        speaker_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .documents
            .iter()
            .filter(|doc| match speaker_filter {
                Some(speaker) => doc
                    .metadata
                    .get("speaker_name")
                    .and_then(Value::as_str)
                    .map(|name| name == speaker)
                    .unwrap_or(false),
                None => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockEmbeddingModel;

    fn doc(content: &str, score: f32) -> ScoredDocument {
        ScoredDocument {
            content: content.to_string(),
            metadata: HashMap::new(),
            score,
        }
    }

    #[tokio::test]
    async fn test_search_returns_tagged_candidates() {
        let client = VectorSearchClient::connect(
            Arc::new(MockEmbeddingModel::fixed(vec![1.0, 0.0])),
            Arc::new(MockDocumentIndex::with_documents(vec![
                doc("alpha", 0.9),
                doc("beta", 0.7),
            ])),
            Duration::from_secs(1),
        )
        .await;

        let hits = client.search("query", 5, None).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].origin, CandidateOrigin::Vector);
        assert_eq!(hits[0].content, "alpha");
    }

    #[tokio::test]
    async fn test_unreachable_index_disables_client() {
        let client = VectorSearchClient::connect(
            Arc::new(MockEmbeddingModel::fixed(vec![1.0])),
            Arc::new(MockDocumentIndex::unreachable()),
            Duration::from_secs(1),
        )
        .await;

        assert!(client.is_disabled());
        assert!(client.search("query", 5, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_empty() {
        let client = VectorSearchClient::connect(
            Arc::new(MockEmbeddingModel::failing()),
            Arc::new(MockDocumentIndex::with_documents(vec![doc("alpha", 0.9)])),
            Duration::from_secs(1),
        )
        .await;

        assert!(!client.is_disabled());
        assert!(client.search("query", 5, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_speaker_filter_applies() {
        let mut speaker_doc = doc("filtered", 0.8);
        speaker_doc
            .metadata
            .insert("speaker_name".to_string(), json!("Park Taewung"));

        let client = VectorSearchClient::connect(
            Arc::new(MockEmbeddingModel::fixed(vec![1.0])),
            Arc::new(MockDocumentIndex::with_documents(vec![
                speaker_doc,
                doc("unfiltered", 0.9),
            ])),
            Duration::from_secs(1),
        )
        .await;

        let hits = client.search("query", 5, Some("Park Taewung")).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "filtered");
    }
}
