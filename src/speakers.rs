//! Speaker/persona lookup
//!
//! The persona config is owned by this collaborator; the core only reads it.
//! A lookup failure on the advisory path degrades to the default persona and
//! never aborts the request.

use crate::models::PersonaConfig;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait SpeakerDirectory: Send + Sync {
    /// Returns the speaker's persona, or `None` when the id is unknown.
    async fn get(&self, speaker_id: &str) -> Result<Option<PersonaConfig>>;
}

/// In-memory directory, seeded at composition time.
pub struct InMemorySpeakerDirectory {
    personas: Arc<RwLock<HashMap<String, PersonaConfig>>>,
}

impl InMemorySpeakerDirectory {
    pub fn new() -> Self {
        Self {
            personas: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, speaker_id: impl Into<String>, persona: PersonaConfig) {
        let mut personas = self.personas.write().await;
        personas.insert(speaker_id.into(), persona);
    }
}

impl Default for InMemorySpeakerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeakerDirectory for InMemorySpeakerDirectory {
    async fn get(&self, speaker_id: &str) -> Result<Option<PersonaConfig>> {
        let personas = self.personas.read().await;
        Ok(personas.get(speaker_id).cloned())
    }
}

/// Directory that fails every lookup; used to exercise the degradation path.
pub struct UnavailableSpeakerDirectory;

#[async_trait]
impl SpeakerDirectory for UnavailableSpeakerDirectory {
    async fn get(&self, speaker_id: &str) -> Result<Option<PersonaConfig>> {
        Err(crate::error::AdvisoryError::SpeakerNotFound(format!(
            "directory unavailable for {}",
            speaker_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_round_trip() {
        let directory = InMemorySpeakerDirectory::new();
        directory
            .insert(
                "1",
                PersonaConfig {
                    name: "Park Taewung".to_string(),
                    ..Default::default()
                },
            )
            .await;

        let persona = directory.get("1").await.unwrap();
        assert_eq!(persona.unwrap().name, "Park Taewung");
        assert!(directory.get("99").await.unwrap().is_none());
    }
}
