//! REST API server for the advisory engine
//!
//! Exposes the orchestrators via HTTP endpoints. Transcript persistence
//! happens here, around each core call: the user turn lands before the
//! engine runs and the assistant turn (with its sources) lands after. A
//! write failure on either side is terminal for the request.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::debate::DebateOrchestrator;
use crate::models::{AdvisoryOutcome, AdvisoryRequest, MessageRole};
use crate::orchestrator::AdvisoryEngine;
use crate::transcript::TranscriptStore;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub speaker_id: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoundTableRequest {
    pub topic: String,
    pub speaker_a: String,
    pub speaker_b: String,
    pub conversation_id: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<AdvisoryEngine>,
    pub debate: Arc<DebateOrchestrator>,
    pub transcript: Arc<dyn TranscriptStore>,
}

/// =============================
/// Helpers — Conversation IDs
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

/// Clients send arbitrary strings as conversation handles; anything that is
/// not already a UUID is hashed into a stable one so repeat requests keep
/// landing in the same transcript.
fn parse_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> uuid::Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            uuid::Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Query must not be empty".into())),
        );
    }

    let conversation_id = parse_or_stable_uuid(
        req.conversation_id.as_deref(),
        &format!("speaker-{}", req.speaker_id),
    );
    info!(
        speaker_id = %req.speaker_id,
        conversation_id = %conversation_id,
        "Received chat request"
    );

    if let Err(e) = state
        .transcript
        .append(conversation_id, MessageRole::User, &req.query, &[])
        .await
    {
        error!("Failed to persist user turn: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to persist user message: {}",
                e
            ))),
        );
    }

    let request = AdvisoryRequest {
        query: req.query,
        speaker_id: req.speaker_id,
        conversation_id,
    };

    // A core failure still produces a reply: the conversation gets an
    // apology as the assistant turn instead of a dangling user message.
    let outcome = match state.engine.run(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Advisory request failed, substituting apology: {}", e);
            AdvisoryOutcome {
                response_text: format!(
                    "죄송합니다. AI 엔진에 연결할 수 없습니다. (Error: {})",
                    e
                ),
                source_candidates: Vec::new(),
            }
        }
    };

    if let Err(e) = state
        .transcript
        .append(
            conversation_id,
            MessageRole::Assistant,
            &outcome.response_text,
            &outcome.source_candidates,
        )
        .await
    {
        error!("Failed to persist assistant turn: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to persist assistant message: {}",
                e
            ))),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "answer": outcome.response_text,
            "sources": outcome.source_candidates,
            "conversation_id": conversation_id.to_string(),
        }))),
    )
}

/// =============================
/// Round Table Endpoint
/// =============================

/// Kicks off a debate session and returns immediately; the session streams
/// its records into the transcript as it progresses.
async fn round_table_handler(
    State(state): State<ApiState>,
    Json(req): Json<RoundTableRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.topic.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Topic must not be empty".into())),
        );
    }

    let conversation_id = parse_or_stable_uuid(
        req.conversation_id.as_deref(),
        &format!("round-table-{}-{}", req.speaker_a, req.speaker_b),
    );
    info!(
        topic = %req.topic,
        conversation_id = %conversation_id,
        "Received round-table request"
    );

    let debate = Arc::clone(&state.debate);
    tokio::spawn(async move {
        if let Err(e) = debate
            .run(conversation_id, &req.topic, &req.speaker_a, &req.speaker_b)
            .await
        {
            error!(conversation_id = %conversation_id, "Debate session failed: {}", e);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(serde_json::json!({
            "status": "started",
            "conversation_id": conversation_id.to_string(),
        }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/round-table", post(round_table_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::PersonaConditionedGenerator;
    use crate::llm::{MockChatModel, MockEmbeddingModel};
    use crate::orchestrator::AdvisoryEngine;
    use crate::retrieval::{
        GraphSearchClient, HybridRetriever, MockDocumentIndex, MockGraphStore, RelevanceReranker,
        VectorSearchClient,
    };
    use crate::speakers::InMemorySpeakerDirectory;
    use crate::transcript::{FailingTranscriptStore, InMemoryTranscriptStore};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn state_with(
        generator_model: MockChatModel,
        transcript: Arc<dyn TranscriptStore>,
    ) -> ApiState {
        let vector = VectorSearchClient::connect(
            Arc::new(MockEmbeddingModel::fixed(vec![1.0])),
            Arc::new(MockDocumentIndex::with_documents(vec![])),
            TIMEOUT,
        )
        .await;
        let graph = GraphSearchClient::new(
            Arc::new(MockChatModel::always("nothing")),
            Arc::new(MockGraphStore::with_nodes(vec![])),
            TIMEOUT,
        );
        let reranker = RelevanceReranker::new(Arc::new(MockChatModel::always("")), TIMEOUT);
        let generator = Arc::new(PersonaConditionedGenerator::new(
            Arc::new(generator_model),
            TIMEOUT,
        ));
        let speakers = Arc::new(InMemorySpeakerDirectory::new());

        let engine = Arc::new(AdvisoryEngine::new(
            HybridRetriever::new(vector, graph, reranker),
            Arc::clone(&generator),
            speakers.clone(),
            5,
        ));
        let debate = Arc::new(DebateOrchestrator::new(
            generator,
            speakers,
            Arc::clone(&transcript),
        ));

        ApiState {
            engine,
            debate,
            transcript,
        }
    }

    #[tokio::test]
    async fn test_generation_failure_substitutes_apology_reply() {
        let transcript = Arc::new(InMemoryTranscriptStore::new());
        let state = state_with(
            MockChatModel::failing("model down"),
            Arc::clone(&transcript) as Arc<dyn TranscriptStore>,
        )
        .await;

        let (status, Json(body)) = chat_handler(
            State(state),
            Json(ChatRequest {
                query: "what is sovereign AI?".to_string(),
                speaker_id: "1".to_string(),
                conversation_id: None,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.success);

        let data = body.data.unwrap();
        let answer = data["answer"].as_str().unwrap();
        assert!(answer.contains("죄송합니다"));

        // The conversation closes cleanly: user turn plus the apology reply.
        let conversation_id =
            uuid::Uuid::parse_str(data["conversation_id"].as_str().unwrap()).unwrap();
        let messages = transcript.messages(conversation_id).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(messages[1].content.contains("죄송합니다"));
    }

    #[tokio::test]
    async fn test_persistence_failure_returns_server_error() {
        let state = state_with(
            MockChatModel::always("an answer"),
            Arc::new(FailingTranscriptStore),
        )
        .await;

        let (status, Json(body)) = chat_handler(
            State(state),
            Json(ChatRequest {
                query: "what is sovereign AI?".to_string(),
                speaker_id: "1".to_string(),
                conversation_id: None,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.success);
    }

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("chat-42");
        let b = stable_uuid_from_string("chat-42");
        assert_eq!(a, b);
        assert_ne!(a, stable_uuid_from_string("chat-43"));
    }

    #[test]
    fn test_parse_or_stable_uuid_prefers_valid_uuid() {
        let valid = uuid::Uuid::new_v4();
        assert_eq!(
            parse_or_stable_uuid(Some(&valid.to_string()), "seed"),
            valid
        );

        let hashed = parse_or_stable_uuid(Some("not-a-uuid"), "seed");
        assert_eq!(hashed, stable_uuid_from_string("not-a-uuid"));

        assert_eq!(
            parse_or_stable_uuid(None, "seed"),
            stable_uuid_from_string("seed")
        );
        assert_eq!(
            parse_or_stable_uuid(Some("  "), "seed"),
            stable_uuid_from_string("seed")
        );
    }
}
