//! Response classifier: decides the single affordance shown for a step.
//!
//! Precedence, first match wins:
//! 1. the last system turn is a clarification → free text
//! 2. a modality-specific override for (modality, step)
//! 3. the registry's declared type for the step
//! 4. unknown step → free text

use super::registry::StepRegistry;
use super::{Modality, ResponseType};
use crate::session::Turn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Clarifying-question phrasings used when the authority does not flag a
/// clarification itself. Matching is lowercase substring.
///
/// Keep this list explicit and reviewed: a false positive hides a real button.
pub const CLARIFICATION_PHRASES: &[&str] = &[
    "could you clarify",
    "can you clarify",
    "could you say more about",
    "can you tell me more about what you mean",
    "what do you mean by",
    "i'm not sure i understood",
    "i am not sure i understood",
    "could you rephrase",
    "can you rephrase",
    "could you be more specific",
    "can you be more specific",
    "just to clarify",
    "to make sure i understand",
];

/// Returns true if `text` reads like an open clarifying question.
pub fn looks_like_clarification(text: &str) -> bool {
    let lower = text.to_lowercase();
    CLARIFICATION_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// Custom copy for a structured affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffordanceCopy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// One label per choice, in choice order.
    pub labels: Vec<String>,
}

impl AffordanceCopy {
    pub fn labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: None,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Which precedence rule produced an affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffordanceSource {
    Clarification,
    Override,
    Registry,
    Fallback,
}

/// The affordance presented for the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAffordance {
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<AffordanceCopy>,
    pub source: AffordanceSource,
}

impl ResponseAffordance {
    pub fn free_text(source: AffordanceSource) -> Self {
        Self {
            response_type: ResponseType::FreeText,
            copy: None,
            source,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.response_type == ResponseType::Auto
    }
}

impl Default for ResponseAffordance {
    fn default() -> Self {
        Self::free_text(AffordanceSource::Fallback)
    }
}

/// Ordered-precedence classifier backed by a [`StepRegistry`].
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    registry: Arc<StepRegistry>,
}

impl ResponseClassifier {
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Classifies the affordance for `step_id`.
    ///
    /// `modality` is the session's selected method, if any. `last_system_turn`
    /// is the system turn that introduced the step.
    pub fn classify(
        &self,
        step_id: &str,
        modality: Option<Modality>,
        last_system_turn: Option<&Turn>,
    ) -> ResponseAffordance {
        if last_system_turn.is_some_and(|turn| turn.used_clarification) {
            return ResponseAffordance::free_text(AffordanceSource::Clarification);
        }

        if let Some(response_override) =
            modality.and_then(|m| self.registry.override_for(m, step_id))
        {
            return ResponseAffordance {
                response_type: response_override.response_type,
                copy: response_override.copy.clone(),
                source: AffordanceSource::Override,
            };
        }

        match self.registry.get(step_id) {
            Some(step) => ResponseAffordance {
                response_type: step.response_type,
                copy: None,
                source: AffordanceSource::Registry,
            },
            None => {
                tracing::debug!(step_id, "Unregistered step, falling back to free text");
                ResponseAffordance::free_text(AffordanceSource::Fallback)
            }
        }
    }
}
