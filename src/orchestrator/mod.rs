//! Advisory orchestrator - drives the request state machine
//!
//! Start → Routed → AgentExecuting → Done
//!
//! The engine is a composition root: router, retrieval clients, generator
//! and speaker directory are injected at construction, one engine value is
//! shared across requests, and all request state lives in the stage enum
//! for the request's lifetime only. No step is retried automatically; every
//! documented fallback is terminal for its step and execution proceeds to
//! the next stage.

use crate::generation::PersonaConditionedGenerator;
use crate::models::{
    AdvisoryOutcome, AdvisoryRequest, AgentKind, Candidate, CandidateOrigin, PersonaConfig,
    RoutingDecision,
};
use crate::retrieval::HybridRetriever;
use crate::router::IntentRouter;
use crate::speakers::SpeakerDirectory;
use crate::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const BOOKING_STUB_RESPONSE: &str =
    "Our operations team will confirm the schedule and help you complete the booking. (Operations Agent)";

const NO_KNOWLEDGE_PLACEHOLDER: &str =
    "No relevant internal knowledge was found for this question. Answering from general expertise.";

/// Pipeline stages, one variant per step so each stage's data is explicit
/// rather than threaded through an open-ended key-value map.
enum Stage {
    Start,
    Routed(RoutingDecision),
    AgentExecuting(RoutingDecision),
    Done(AdvisoryOutcome),
}

pub struct AdvisoryEngine {
    retriever: HybridRetriever,
    generator: Arc<PersonaConditionedGenerator>,
    speakers: Arc<dyn SpeakerDirectory>,
    top_k: usize,
}

impl AdvisoryEngine {
    pub fn new(
        retriever: HybridRetriever,
        generator: Arc<PersonaConditionedGenerator>,
        speakers: Arc<dyn SpeakerDirectory>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            speakers,
            top_k,
        }
    }

    /// Run one request through the state machine to completion.
    pub async fn run(&self, request: &AdvisoryRequest) -> Result<AdvisoryOutcome> {
        let mut stage = Stage::Start;

        loop {
            stage = match stage {
                Stage::Start => {
                    let decision = IntentRouter::route(&request.query);
                    info!(
                        intent = %decision.intent,
                        speaker_id = %request.speaker_id,
                        "Routing decision"
                    );
                    Stage::Routed(decision)
                }
                Stage::Routed(decision) => Stage::AgentExecuting(decision),
                Stage::AgentExecuting(decision) => match decision.next_agent {
                    AgentKind::Operations => Stage::Done(AdvisoryOutcome {
                        response_text: BOOKING_STUB_RESPONSE.to_string(),
                        source_candidates: Vec::new(),
                    }),
                    AgentKind::Intelligence => Stage::Done(self.run_intelligence(request).await?),
                },
                Stage::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// The advisory path: persona resolution, concurrent retrieval, fusion,
    /// rerank, persona-conditioned generation.
    async fn run_intelligence(&self, request: &AdvisoryRequest) -> Result<AdvisoryOutcome> {
        let persona = self.resolve_persona(&request.speaker_id).await;
        let speaker_filter = if persona.name.trim().is_empty() {
            None
        } else {
            Some(persona.name.as_str())
        };

        let mut context = self
            .retriever
            .search(&request.query, self.top_k, speaker_filter)
            .await;

        // Keep generation grounded instead of unconstrained when nothing was
        // retrieved from either backend.
        if context.is_empty() {
            info!("Both backends empty, substituting placeholder context");
            let mut placeholder =
                Candidate::new(NO_KNOWLEDGE_PLACEHOLDER, 0.0, CandidateOrigin::Vector);
            placeholder
                .metadata
                .insert("source".to_string(), json!("fallback"));
            context.push(placeholder);
        }

        let response_text = self
            .generator
            .generate(&request.query, &context, &persona)
            .await?;

        Ok(AdvisoryOutcome {
            response_text,
            source_candidates: context,
        })
    }

    /// Lookup failure degrades to the default persona; it never aborts.
    async fn resolve_persona(&self, speaker_id: &str) -> PersonaConfig {
        match self.speakers.get(speaker_id).await {
            Ok(Some(persona)) => persona,
            Ok(None) => {
                warn!(speaker_id, "Speaker not found, using default persona");
                PersonaConfig::default()
            }
            Err(e) => {
                warn!(
                    speaker_id,
                    "Speaker lookup failed, using default persona: {}", e
                );
                PersonaConfig::default()
            }
        }
    }
}
