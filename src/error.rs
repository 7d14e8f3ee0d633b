//! Error types for the speaker advisory engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AdvisoryError>;

#[derive(Error, Debug)]
pub enum AdvisoryError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// A retrieval backend could not be reached. Recovered locally by the
    /// clients; callers never see this abort the pipeline.
    #[error("Backend unavailable ({stage}): {detail}")]
    BackendUnavailable { stage: &'static str, detail: String },

    /// The generation model failed to produce an answer. Terminal for the
    /// affected request; callers decide the user-visible fallback.
    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("Speaker not found: {0}")]
    SpeakerNotFound(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
