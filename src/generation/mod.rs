//! Persona-conditioned answer generation
//!
//! Builds one generation request from persona identity, style directives,
//! key-phrase guidance, core beliefs, few-shot examples, and the retrieved
//! context in fused/reranked order, then the query. Failure surfaces as
//! `GenerationFailure`; this component never substitutes placeholder text,
//! callers decide the user-visible fallback.

use crate::error::AdvisoryError;
use crate::llm::ChatModel;
use crate::models::{Candidate, PersonaConfig};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::error;

pub struct PersonaConditionedGenerator {
    model: Arc<dyn ChatModel>,
    call_timeout: Duration,
}

impl PersonaConditionedGenerator {
    pub fn new(model: Arc<dyn ChatModel>, call_timeout: Duration) -> Self {
        Self {
            model,
            call_timeout,
        }
    }

    /// Render an answer in the speaker's voice. `context` may be empty (the
    /// debate path generates without retrieval); when present, the answer is
    /// constrained to it.
    pub async fn generate(
        &self,
        query: &str,
        context: &[Candidate],
        persona: &PersonaConfig,
    ) -> Result<String> {
        let persona = persona.resolved();
        let system_prompt = build_system_prompt(&persona, !context.is_empty());
        let user_prompt = build_user_prompt(query, context);

        match timeout(
            self.call_timeout,
            self.model.complete(&system_prompt, &user_prompt),
        )
        .await
        {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => {
                error!(stage = "generation", "Generation failed: {}", e);
                Err(AdvisoryError::GenerationFailure(e.to_string()))
            }
            Err(_) => {
                error!(stage = "generation", "Generation timed out");
                Err(AdvisoryError::GenerationFailure(
                    "generation call timed out".to_string(),
                ))
            }
        }
    }
}

/// Persona directives, rendered from a fully resolved config.
fn build_system_prompt(persona: &PersonaConfig, grounded: bool) -> String {
    let mut prompt = format!(
        "You are **{name}**, a leading technology insight expert.\n\
         Answer the question with your own distinctive perspective{grounding}.\n\n\
         ### Persona directives (must follow)\n\
         1. Tone & Manner: {style}\n\
         2. Voice:\n\
         \x20  - Go beyond listing facts; interpret what lies behind them and why it matters.\n",
        name = persona.name,
        grounding = if grounded {
            ", based on the provided [Context]"
        } else {
            ""
        },
        style = render_style(persona),
    );

    if !persona.key_phrases.is_empty() {
        prompt.push_str(&format!(
            "   - Weave in expressions such as \"{}\" to keep your own voice.\n",
            persona.key_phrases.join("\", \"")
        ));
    }
    prompt.push_str(
        "   - Close your answer with a reflective question or a recommendation for the reader.\n",
    );

    prompt.push_str(&format!(
        "3. Core values:\n   - Let these beliefs show throughout the answer: {}\n",
        persona.core_beliefs.join(", ")
    ));

    if !persona.example_outputs.is_empty() {
        prompt.push_str("\n### Example answers (imitate this style and reasoning)\n");
        for example in &persona.example_outputs {
            prompt.push_str(&format!("- {}\n", example));
        }
    }

    prompt.push_str("\n### Writing rules\n");
    if grounded {
        prompt.push_str("- Grounding: base your answer strictly on the [Context] below.\n");
    }
    prompt.push_str(&format!(
        "- Persona integrity: if the context contains opinions from other experts, \
         never present them as your own. Answer only from {}'s point of view.\n\
         - Clarity: use numbering or bullet points when helpful.\n",
        persona.name
    ));

    prompt
}

fn render_style(persona: &PersonaConfig) -> String {
    let mut parts = vec![format!("tone: {}", persona.tone())];
    if let Some(complexity) = persona.speaking_style.get("complexity") {
        parts.push(format!("complexity: {}", complexity));
    }
    for (key, value) in &persona.speaking_style {
        if key != "tone" && key != "complexity" {
            parts.push(format!("{}: {}", key, value));
        }
    }
    parts.join("; ")
}

/// Context candidates concatenated in order, separated by blank lines,
/// followed by the query.
fn build_user_prompt(query: &str, context: &[Candidate]) -> String {
    if context.is_empty() {
        return query.to_string();
    }

    let context_text = context
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("[Context]\n{}\n\n[Question]\n{}", context_text, query)
}
