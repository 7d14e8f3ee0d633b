//! Environment-driven configuration
//!
//! Binaries call `dotenv::dotenv().ok()` before constructing this.
//! Defaults match a local docker-compose deployment.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,

    pub neo4j_uri: String,
    pub neo4j_username: String,
    pub neo4j_password: String,

    pub upstage_api_key: String,
    pub chat_model: String,
    pub judge_model: String,
    pub embedding_model: String,

    /// Timeout applied to every external call (embed, search, judge, generate).
    pub call_timeout: Duration,
    pub top_k: usize,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            qdrant_url: env_or("QDRANT_URL", "http://localhost:6333"),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok(),
            qdrant_collection: env_or("QDRANT_COLLECTION", "speaker_knowledge"),

            neo4j_uri: env_or("NEO4J_URI", "http://localhost:7474"),
            neo4j_username: env_or("NEO4J_USERNAME", "neo4j"),
            neo4j_password: env_or("NEO4J_PASSWORD", "password"),

            upstage_api_key: env_or("UPSTAGE_API_KEY", ""),
            chat_model: env_or("CHAT_MODEL", "solar-pro"),
            judge_model: env_or("JUDGE_MODEL", "solar-mini"),
            embedding_model: env_or("EMBEDDING_MODEL", "solar-embedding-1-large"),

            call_timeout: Duration::from_secs(
                env_or("CALL_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            ),
            top_k: env_or("RETRIEVAL_TOP_K", "5").parse().unwrap_or(5),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}
