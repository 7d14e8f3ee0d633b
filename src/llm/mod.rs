//! Model capability seams
//!
//! Every LLM-touching component depends on these traits rather than a
//! concrete API client, so the pipeline runs against mocks in development
//! and tests without network access.

use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub mod solar;
pub use solar::{SolarChatModel, SolarEmbeddings};

/// Text generation capability. Used by the keyword extractor, the relevance
/// judge, and the persona generator; each holds its own handle so they can
/// be backed by different models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Embedding capability: text in, fixed-length vector out.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Mock chat model for development & testing.
/// Keeps the pipeline functional without an API key.
pub struct MockChatModel {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback: Option<String>,
    fail_reason: Option<String>,
    delay: Option<Duration>,
}

impl MockChatModel {
    /// Always answer with the same text.
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(text.into()),
            fail_reason: None,
            delay: None,
        }
    }

    /// Answer from a fixed script, in order; errors once the script runs out.
    pub fn script(responses: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            fallback: None,
            fail_reason: None,
            delay: None,
        }
    }

    /// Fail every call.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            fail_reason: Some(reason.into()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.lock().expect("mock lock poisoned").pop_front();
        match scripted {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(crate::error::AdvisoryError::LlmError(reason)),
            None => match (&self.fallback, &self.fail_reason) {
                (Some(text), _) => Ok(text.clone()),
                (None, Some(reason)) => {
                    Err(crate::error::AdvisoryError::LlmError(reason.clone()))
                }
                (None, None) => Err(crate::error::AdvisoryError::LlmError(
                    "mock script exhausted".to_string(),
                )),
            },
        }
    }
}

/// Mock embedding model returning a constant vector.
pub struct MockEmbeddingModel {
    vector: Option<Vec<f32>>,
}

impl MockEmbeddingModel {
    pub fn fixed(vector: Vec<f32>) -> Self {
        Self { vector: Some(vector) }
    }

    pub fn failing() -> Self {
        Self { vector: None }
    }
}

#[async_trait]
impl EmbeddingModel for MockEmbeddingModel {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        match &self.vector {
            Some(v) => Ok(v.clone()),
            None => Err(crate::error::AdvisoryError::LlmError(
                "embedding unavailable".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_script_order_then_exhaustion() {
        let model = MockChatModel::script(vec![
            Ok("first".to_string()),
            Err("boom".to_string()),
        ]);

        assert_eq!(model.complete("s", "u").await.unwrap(), "first");
        assert!(model.complete("s", "u").await.is_err());
        assert!(model.complete("s", "u").await.is_err()); // exhausted
    }

    #[tokio::test]
    async fn test_mock_always() {
        let model = MockChatModel::always("hi");
        assert_eq!(model.complete("s", "u").await.unwrap(), "hi");
        assert_eq!(model.complete("s", "u").await.unwrap(), "hi");
    }
}
