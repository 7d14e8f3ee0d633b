//! Round-table debate orchestrator
//!
//! Phase 1 generates two opening-position statements concurrently, one per
//! persona; a failing branch substitutes an explicit error marker without
//! touching its sibling. Both statements are persisted atomically, A then
//! B, before the sequential synthesis pass. Uncaught failures append one
//! terminal "session interrupted" record so a session never silently drops
//! output.

use crate::error::AdvisoryError;
use crate::generation::PersonaConditionedGenerator;
use crate::models::{DebateSession, MessageRole, PersonaConfig, TranscriptMessage};
use crate::speakers::SpeakerDirectory;
use crate::transcript::TranscriptStore;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const INTERRUPTED_NOTICE: &str = "**[System]** The session was interrupted.";

pub struct DebateOrchestrator {
    generator: Arc<PersonaConditionedGenerator>,
    speakers: Arc<dyn SpeakerDirectory>,
    transcript: Arc<dyn TranscriptStore>,
}

impl DebateOrchestrator {
    pub fn new(
        generator: Arc<PersonaConditionedGenerator>,
        speakers: Arc<dyn SpeakerDirectory>,
        transcript: Arc<dyn TranscriptStore>,
    ) -> Self {
        Self {
            generator,
            speakers,
            transcript,
        }
    }

    /// Drive a full debate session: announcement, two concurrent opening
    /// statements, synthesis. Returns the populated session after every
    /// record has been handed to the transcript store.
    pub async fn run(
        &self,
        conversation_id: Uuid,
        topic: &str,
        speaker_a: &str,
        speaker_b: &str,
    ) -> Result<DebateSession> {
        info!(topic, speaker_a, speaker_b, "Starting debate session");

        // Transcript reachability doubles as the session's go/no-go check.
        self.transcript
            .append(
                conversation_id,
                MessageRole::System,
                &format!(
                    "**[System]** Round table initiated for topic: *{}*. \
                     Asking both experts for their position statements simultaneously...",
                    topic
                ),
                &[],
            )
            .await?;

        let mut session = DebateSession::new(topic, speaker_a, speaker_b);
        let persona_a = self.resolve_persona(speaker_a).await;
        let persona_b = self.resolve_persona(speaker_b).await;
        let name_a = persona_a.resolved().name;
        let name_b = persona_b.resolved().name;

        // Phase 1: two mutually independent generation calls. They share no
        // state, so running them concurrently halves wall-clock latency.
        let prompt = position_prompt(topic);
        let handle_a = self.spawn_statement(prompt.clone(), persona_a.clone());
        let handle_b = self.spawn_statement(prompt, persona_b);

        let (joined_a, joined_b) = tokio::join!(handle_a, handle_b);
        let result_a = flatten_branch(joined_a);
        let result_b = flatten_branch(joined_b);

        if result_a.is_err() && result_b.is_err() {
            // Only a full-phase failure is fatal; a single failing branch is
            // isolated by its marker below.
            self.interrupt(conversation_id).await;
            return Err(AdvisoryError::GenerationFailure(
                "both debate branches failed".to_string(),
            ));
        }

        let statement_a = result_a.unwrap_or_else(|e| {
            warn!(speaker = %name_a, "Debate branch failed: {}", e);
            error_marker(&name_a)
        });
        let statement_b = result_b.unwrap_or_else(|e| {
            warn!(speaker = %name_b, "Debate branch failed: {}", e);
            error_marker(&name_b)
        });

        session.statement_a = Some(statement_a.clone());
        session.statement_b = Some(statement_b.clone());

        // Both statements land in fixed A-then-B order, or neither does.
        if let Err(e) = self
            .transcript
            .append_all(vec![
                TranscriptMessage::new(
                    conversation_id,
                    MessageRole::Assistant,
                    format!("**[Position A]**\n{}", statement_a),
                    vec![],
                ),
                TranscriptMessage::new(
                    conversation_id,
                    MessageRole::Assistant,
                    format!("**[Position B]**\n{}", statement_b),
                    vec![],
                ),
            ])
            .await
        {
            self.interrupt(conversation_id).await;
            return Err(e);
        }

        // Phase 2 strictly waits on phase 1: the synthesis consumes both
        // statements. Speaker A's persona acts as moderator.
        let synthesis = match self
            .generator
            .generate(
                &synthesis_prompt(topic, &statement_a, &statement_b),
                &[],
                &persona_a,
            )
            .await
        {
            Ok(synthesis) => synthesis,
            Err(e) => {
                self.interrupt(conversation_id).await;
                return Err(e);
            }
        };

        session.synthesis = Some(synthesis.clone());

        if let Err(e) = self
            .transcript
            .append(
                conversation_id,
                MessageRole::Assistant,
                &format!("**[Strategic Conclusion]**\n{}", synthesis),
                &[],
            )
            .await
        {
            self.interrupt(conversation_id).await;
            return Err(e);
        }

        info!(topic, "Debate session completed");
        Ok(session)
    }

    fn spawn_statement(
        &self,
        prompt: String,
        persona: PersonaConfig,
    ) -> tokio::task::JoinHandle<Result<String>> {
        let generator = Arc::clone(&self.generator);
        tokio::spawn(async move { generator.generate(&prompt, &[], &persona).await })
    }

    async fn resolve_persona(&self, speaker_id: &str) -> PersonaConfig {
        match self.speakers.get(speaker_id).await {
            Ok(Some(persona)) => persona,
            Ok(None) => {
                warn!(speaker_id, "Speaker not found, debating with default persona");
                PersonaConfig::default()
            }
            Err(e) => {
                warn!(speaker_id, "Speaker lookup failed: {}", e);
                PersonaConfig::default()
            }
        }
    }

    /// Best-effort terminal notice; logged but never propagated since the
    /// session is already failing.
    async fn interrupt(&self, conversation_id: Uuid) {
        if let Err(e) = self
            .transcript
            .append(conversation_id, MessageRole::System, INTERRUPTED_NOTICE, &[])
            .await
        {
            warn!("Failed to record session interruption: {}", e);
        }
    }
}

/// A panicked or cancelled task reads as that branch's failure, not the
/// session's.
fn flatten_branch(
    joined: std::result::Result<Result<String>, tokio::task::JoinError>,
) -> Result<String> {
    match joined {
        Ok(inner) => inner,
        Err(e) => Err(AdvisoryError::GenerationFailure(format!(
            "debate branch task failed: {}",
            e
        ))),
    }
}

fn position_prompt(topic: &str) -> String {
    format!(
        "Topic: {}\n\nPlease provide your core perspective on this topic based on \
         your philosophy. Keep it concise (max 3 bullets).",
        topic
    )
}

fn synthesis_prompt(topic: &str, statement_a: &str, statement_b: &str) -> String {
    format!(
        "Review the two expert positions on '{}':\n\n\
         [Expert A]: {}\n\n\
         [Expert B]: {}\n\n\
         As a round-table moderator, compare these views and provide a strategic \
         takeaway for the audience: common ground, the key conflict, and actionable \
         advice. Keep it brief.",
        topic, statement_a, statement_b
    )
}

fn error_marker(speaker_name: &str) -> String {
    format!("(error generating response for speaker {})", speaker_name)
}
