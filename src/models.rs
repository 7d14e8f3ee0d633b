//! Core data models for the advisory engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Candidates =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CandidateOrigin {
    Vector,
    Graph,
}

/// One retrieved context item with provenance and a relevance score.
/// Identity within a fusion pass is the exact content string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub score: f32,
    pub origin: CandidateOrigin,
}

impl Candidate {
    pub fn new(content: impl Into<String>, score: f32, origin: CandidateOrigin) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
            score,
            origin,
        }
    }
}

//
// ================= Persona =================
//

/// Per-speaker voice profile conditioning generated text.
/// Immutable per request; owned by the speaker directory, only read here.
/// Missing or empty fields resolve to documented defaults via `resolved()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub core_beliefs: Vec<String>,
    #[serde(default)]
    pub speaking_style: HashMap<String, String>,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub example_outputs: Vec<String>,
}

impl PersonaConfig {
    /// Apply defaults per missing/empty field independently.
    pub fn resolved(&self) -> PersonaConfig {
        let mut resolved = self.clone();
        if resolved.name.trim().is_empty() {
            resolved.name = "Expert".to_string();
        }
        if resolved.core_beliefs.is_empty() {
            resolved.core_beliefs = vec!["Providing accurate information".to_string()];
        }
        resolved
            .speaking_style
            .entry("tone".to_string())
            .or_insert_with(|| "professional".to_string());
        resolved
    }

    pub fn tone(&self) -> &str {
        self.speaking_style
            .get("tone")
            .map(String::as_str)
            .unwrap_or("professional")
    }
}

//
// ================= Routing =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Booking,
    Advisory,
}

/// Computed fresh per request; never persisted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
    pub intent: Intent,
    pub next_agent: AgentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Operations,
    Intelligence,
}

//
// ================= Requests & Outcomes =================
//

/// Entry payload for one advisory request. Request-scoped; the engine owns
/// it for the request's lifetime and discards it after the response.
#[derive(Debug, Clone)]
pub struct AdvisoryRequest {
    pub query: String,
    pub speaker_id: String,
    pub conversation_id: Uuid,
}

/// Terminal state payload of the advisory pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryOutcome {
    pub response_text: String,
    pub source_candidates: Vec<Candidate>,
}

//
// ================= Debate =================
//

/// Ephemeral session state, populated across the three generation stages and
/// handed to the transcript store before being discarded.
#[derive(Debug, Clone)]
pub struct DebateSession {
    pub topic: String,
    pub speaker_a: String,
    pub speaker_b: String,
    pub statement_a: Option<String>,
    pub statement_b: Option<String>,
    pub synthesis: Option<String>,
}

impl DebateSession {
    pub fn new(topic: impl Into<String>, speaker_a: impl Into<String>, speaker_b: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            speaker_a: speaker_a.into(),
            speaker_b: speaker_b.into(),
            statement_a: None,
            statement_b: None,
            synthesis: None,
        }
    }
}

//
// ================= Transcript =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub sources: Vec<Candidate>,
    pub created_at: DateTime<Utc>,
}

impl TranscriptMessage {
    pub fn new(
        conversation_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
        sources: Vec<Candidate>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.into(),
            sources,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intent::Booking => "booking",
            Intent::Advisory => "advisory",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        };
        write!(f, "{}", s)
    }
}
