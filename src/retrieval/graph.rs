//! Knowledge-graph search client
//!
//! Derives a keyword set with a cheap extraction call, then matches graph
//! nodes whose name contains any keyword. Extraction failure falls back to
//! the raw query as the sole keyword so a search is still attempted; any
//! backend error yields an empty list without propagating.

use crate::error::AdvisoryError;
use crate::llm::ChatModel;
use crate::models::{Candidate, CandidateOrigin};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

const EXTRACTION_SYSTEM_PROMPT: &str = "Extract important keywords or entities from the user query for a \
knowledge graph search. Return only comma-separated keywords.";

/// One matched graph node.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub name: String,
    pub definition: String,
}

/// Graph store boundary. Name matching is case-sensitive substring
/// containment; the store has no native ranking signal.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn query(&self, keywords: &[String], limit: usize) -> Result<Vec<GraphNode>>;
}

pub struct GraphSearchClient {
    extractor: Arc<dyn ChatModel>,
    store: Arc<dyn GraphStore>,
    call_timeout: Duration,
}

impl GraphSearchClient {
    pub fn new(
        extractor: Arc<dyn ChatModel>,
        store: Arc<dyn GraphStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            store,
            call_timeout,
        }
    }

    /// Returns up to `top_k` candidates tagged `origin = graph`, each with
    /// the fixed relevance score 1.0. Never errors.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<Candidate> {
        let keywords = self.extract_keywords(query).await;

        match timeout(self.call_timeout, self.store.query(&keywords, top_k)).await {
            Ok(Ok(nodes)) => nodes
                .into_iter()
                .map(|node| {
                    let mut candidate = Candidate::new(
                        format!("{}: {}", node.name, node.definition),
                        1.0,
                        CandidateOrigin::Graph,
                    );
                    candidate
                        .metadata
                        .insert("source".to_string(), json!("graph"));
                    candidate.metadata.insert("name".to_string(), json!(node.name));
                    candidate
                })
                .collect(),
            Ok(Err(e)) => {
                warn!(stage = "graph", "Graph search failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!(stage = "graph", "Graph search timed out");
                Vec::new()
            }
        }
    }

    async fn extract_keywords(&self, query: &str) -> Vec<String> {
        let reply = match timeout(
            self.call_timeout,
            self.extractor.complete(EXTRACTION_SYSTEM_PROMPT, query),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(stage = "extraction", "Keyword extraction failed: {}", e);
                return vec![query.to_string()];
            }
            Err(_) => {
                warn!(stage = "extraction", "Keyword extraction timed out");
                return vec![query.to_string()];
            }
        };

        let keywords: Vec<String> = reply
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keywords.is_empty() {
            vec![query.to_string()]
        } else {
            keywords
        }
    }
}

/// Neo4j-backed store over the HTTP transaction endpoint.
pub struct Neo4jGraph {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl Neo4jGraph {
    pub fn new(base_url: String, username: String, password: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            username,
            password,
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn query(&self, keywords: &[String], limit: usize) -> Result<Vec<GraphNode>> {
        let body = json!({
            "statements": [{
                "statement": "MATCH (c:Concept) \
                              WHERE any(keyword IN $keywords WHERE c.name CONTAINS keyword) \
                              RETURN c.name as name, c.definition as definition \
                              LIMIT $limit",
                "parameters": { "keywords": keywords, "limit": limit }
            }]
        });

        let response = self
            .client
            .post(format!("{}/db/neo4j/tx/commit", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisoryError::BackendUnavailable {
                stage: "graph",
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AdvisoryError::BackendUnavailable {
                stage: "graph",
                detail: format!("transaction endpoint returned {}", response.status()),
            });
        }

        let parsed: Value = response.json().await?;

        if let Some(errors) = parsed.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(AdvisoryError::BackendUnavailable {
                    stage: "graph",
                    detail: errors[0].to_string(),
                });
            }
        }

        let rows = parsed
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|result| result.get("data"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(rows
            .into_iter()
            .filter_map(|entry| {
                let row = entry.get("row")?.as_array()?;
                Some(GraphNode {
                    name: row.first()?.as_str()?.to_string(),
                    definition: row
                        .get(1)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect())
    }
}

/// Mock store for development & testing; matches nodes by case-sensitive
/// substring, like the Cypher CONTAINS the production store runs.
pub struct MockGraphStore {
    nodes: Vec<GraphNode>,
    fail: bool,
    delay: Option<Duration>,
}

impl MockGraphStore {
    pub fn with_nodes(nodes: Vec<GraphNode>) -> Self {
        Self {
            nodes,
            fail: false,
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            nodes: Vec::new(),
            fail: true,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn query(&self, keywords: &[String], limit: usize) -> Result<Vec<GraphNode>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AdvisoryError::BackendUnavailable {
                stage: "graph",
                detail: "mock graph offline".to_string(),
            });
        }

        Ok(self
            .nodes
            .iter()
            .filter(|node| keywords.iter().any(|kw| node.name.contains(kw.as_str())))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatModel;

    fn node(name: &str, definition: &str) -> GraphNode {
        GraphNode {
            name: name.to_string(),
            definition: definition.to_string(),
        }
    }

    #[tokio::test]
    async fn test_matches_get_uniform_score() {
        let client = GraphSearchClient::new(
            Arc::new(MockChatModel::always("AI, Sovereign AI")),
            Arc::new(MockGraphStore::with_nodes(vec![
                node("Sovereign AI", "National control over AI infrastructure"),
                node("Blockchain", "Distributed ledger"),
            ])),
            Duration::from_secs(1),
        );

        let hits = client.search("what is sovereign AI?", 5).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 1.0);
        assert_eq!(hits[0].origin, CandidateOrigin::Graph);
        assert_eq!(
            hits[0].content,
            "Sovereign AI: National control over AI infrastructure"
        );
    }

    #[tokio::test]
    async fn test_extraction_failure_falls_back_to_raw_query() {
        let client = GraphSearchClient::new(
            Arc::new(MockChatModel::failing("model offline")),
            Arc::new(MockGraphStore::with_nodes(vec![node(
                "Sovereign AI",
                "def",
            )])),
            Duration::from_secs(1),
        );

        // The raw query becomes the sole keyword and still matches the node.
        let hits = client.search("Sovereign AI", 5).await;
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_error_yields_empty() {
        let client = GraphSearchClient::new(
            Arc::new(MockChatModel::always("AI")),
            Arc::new(MockGraphStore::failing()),
            Duration::from_secs(1),
        );

        assert!(client.search("query", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_substring_match_is_case_sensitive() {
        let client = GraphSearchClient::new(
            Arc::new(MockChatModel::always("sovereign ai")),
            Arc::new(MockGraphStore::with_nodes(vec![node(
                "Sovereign AI",
                "def",
            )])),
            Duration::from_secs(1),
        );

        assert!(client.search("query", 5).await.is_empty());
    }
}
