//! Upstage Solar API clients
//!
//! Chat completions power generation, judging and keyword extraction;
//! the embeddings endpoint backs vector search. Both use a long-lived
//! reqwest::Client for connection pooling.

use crate::error::AdvisoryError;
use crate::llm::{ChatModel, EmbeddingModel};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://api.upstage.ai/v1/solar";

fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .build()
        .unwrap_or_default()
}

/// Chat-completions client for a single Solar model.
pub struct SolarChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl SolarChatModel {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl ChatModel for SolarChatModel {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AdvisoryError::LlmError(
                "UPSTAGE_API_KEY not configured".to_string(),
            ));
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
        };

        debug!(model = %self.model, "Calling Solar chat completions");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Solar API request failed: {}", e);
                AdvisoryError::LlmError(format!("Solar API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Solar API error response: {}", error_text);
            return Err(AdvisoryError::LlmError(format!(
                "Solar API error: {}",
                error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Solar response: {}", e);
            AdvisoryError::LlmError(format!("Solar parse error: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AdvisoryError::LlmError("Empty response from Solar".to_string()))
    }
}

/// Embeddings client.
pub struct SolarEmbeddings {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl SolarEmbeddings {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl EmbeddingModel for SolarEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.api_key.is_empty() {
            return Err(AdvisoryError::LlmError(
                "UPSTAGE_API_KEY not configured".to_string(),
            ));
        }

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisoryError::LlmError(format!("Embedding API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::LlmError(format!(
                "Embedding API error: {}",
                error_text
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AdvisoryError::LlmError(format!("Embedding parse error: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AdvisoryError::LlmError("Empty embedding response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatCompletionRequest {
            model: "solar-pro".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a relevance judge".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "Query: what is sovereign AI?".to_string(),
                },
            ],
            temperature: 0.0,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("solar-pro"));
        assert!(json.contains("relevance judge"));
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"0, 2"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "0, 2");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let model = SolarChatModel::new(String::new(), "solar-mini".to_string(), Duration::from_secs(5));
        let result = model.complete("system", "user").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().to_lowercase().contains("api"));
    }
}
