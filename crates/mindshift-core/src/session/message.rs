//! Turn types.
//!
//! A turn is one exchanged message in the session's turn log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnAuthor {
    /// Typed, spoken or selected by the user.
    User,
    /// Produced by the authority, or an inline error report.
    System,
}

/// Audio timing recorded on a system turn revealed after speech began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioTiming {
    /// Milliseconds from speech request to the speech-started signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_start_ms: Option<u64>,
    /// Milliseconds from speech request to the text becoming visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_reveal_ms: Option<u64>,
}

/// A single entry in the turn log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub author: TurnAuthor,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// The step this turn belongs to: the step answered (user) or the step
    /// introduced (system).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Round-trip time of the authority exchange that produced this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_latency_ms: Option<u64>,
    /// The authority answered with a clarifying question instead of the
    /// scripted step message.
    #[serde(default)]
    pub used_clarification: bool,
    /// Inline, recoverable error report.
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTiming>,
}

impl Turn {
    fn new(author: TurnAuthor, text: impl Into<String>, step_id: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            text: text.into(),
            created_at: Utc::now(),
            step_id: step_id.map(str::to_string),
            response_latency_ms: None,
            used_clarification: false,
            is_error: false,
            audio: None,
        }
    }

    pub fn user(text: impl Into<String>, step_id: Option<&str>) -> Self {
        Self::new(TurnAuthor::User, text, step_id)
    }

    pub fn system(text: impl Into<String>, step_id: Option<&str>) -> Self {
        Self::new(TurnAuthor::System, text, step_id)
    }

    /// A visible system message reporting a recoverable failure.
    pub fn error(text: impl Into<String>) -> Self {
        let mut turn = Self::new(TurnAuthor::System, text, None);
        turn.is_error = true;
        turn
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.response_latency_ms = Some(latency_ms);
        self
    }

    pub fn is_system(&self) -> bool {
        self.author == TurnAuthor::System
    }

    /// A system turn that introduced a step (not an error report).
    pub fn is_step_message(&self) -> bool {
        self.is_system() && !self.is_error && self.step_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_turn_is_system_but_not_step_message() {
        let turn = Turn::error("The session service is unreachable.");
        assert!(turn.is_system());
        assert!(turn.is_error);
        assert!(!turn.is_step_message());
    }

    #[test]
    fn test_turn_serializes_without_empty_optionals() {
        let turn = Turn::user("yes", Some("check_if_still_problem"));
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["author"], "user");
        assert_eq!(json["step_id"], "check_if_still_problem");
        assert!(json.get("audio").is_none());
        assert!(json.get("response_latency_ms").is_none());
    }
}
