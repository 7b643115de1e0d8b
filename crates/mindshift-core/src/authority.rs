//! Remote session authority contract.
//!
//! The authority owns the canonical step and produces every system message.
//! The orchestrator exchanges one request/reply per user action.

use crate::error::{Result, ShiftError};
use crate::session::{Turn, TurnAuthor};
use crate::step::ResponseType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The action requested from the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthorityAction {
    Start,
    Continue,
    Resume,
    Undo,
}

/// Request body sent to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityRequest {
    pub session_id: String,
    pub user_id: String,
    pub action: AuthorityAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_to_step_id: Option<String>,
}

impl AuthorityRequest {
    fn new(session_id: &str, user_id: &str, action: AuthorityAction) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            action,
            user_input: None,
            undo_to_step_id: None,
        }
    }

    pub fn start(session_id: &str, user_id: &str) -> Self {
        Self::new(session_id, user_id, AuthorityAction::Start)
    }

    pub fn resume(session_id: &str, user_id: &str) -> Self {
        Self::new(session_id, user_id, AuthorityAction::Resume)
    }

    /// A forward request. `None` input is a bare continue (auto-advance).
    pub fn continue_with(session_id: &str, user_id: &str, user_input: Option<String>) -> Self {
        let mut request = Self::new(session_id, user_id, AuthorityAction::Continue);
        request.user_input = user_input;
        request
    }

    pub fn undo(session_id: &str, user_id: &str, undo_to_step_id: impl Into<String>) -> Self {
        let mut request = Self::new(session_id, user_id, AuthorityAction::Undo);
        request.undo_to_step_id = Some(undo_to_step_id.into());
        request
    }
}

/// A prior turn replayed by the authority on resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayedTurn {
    pub author: TurnAuthor,
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default)]
    pub step_id: Option<String>,
    #[serde(default)]
    pub used_clarification: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ReplayedTurn> for Turn {
    fn from(replayed: ReplayedTurn) -> Self {
        let mut turn = match replayed.author {
            TurnAuthor::User => Turn::user(replayed.text, replayed.step_id.as_deref()),
            TurnAuthor::System => Turn::system(replayed.text, replayed.step_id.as_deref()),
        };
        turn.used_clarification = replayed.used_clarification;
        if let Some(created_at) = replayed.created_at {
            turn.created_at = created_at;
        }
        turn
    }
}

/// Reply body, success or failure, exactly as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub current_step_id: Option<String>,
    #[serde(default)]
    pub expected_response_type: Option<String>,
    #[serde(default)]
    pub used_clarification: bool,
    #[serde(default)]
    pub session_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_snapshot: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ReplayedTurn>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthorityReply {
    /// A successful reply moving to `step_id`.
    pub fn ok(message: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            current_step_id: Some(step_id.into()),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_expected(mut self, response_type: ResponseType) -> Self {
        self.expected_response_type = Some(response_type.to_string());
        self
    }

    pub fn with_clarification(mut self) -> Self {
        self.used_clarification = true;
        self
    }

    pub fn completing(mut self) -> Self {
        self.session_complete = true;
        self
    }

    /// Validates the reply.
    ///
    /// # Errors
    ///
    /// - `ShiftError::Authority` for `success: false`, or a success reply
    ///   without `currentStepId`
    pub fn into_outcome(self) -> Result<AuthorityOutcome> {
        if !self.success {
            return Err(ShiftError::authority(
                self.error
                    .unwrap_or_else(|| "the session service reported a failure".to_string()),
            ));
        }
        let current_step_id = self
            .current_step_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ShiftError::authority("reply is missing currentStepId"))?;

        let expected_response_type = self.expected_response_type.as_deref().and_then(|raw| {
            raw.parse::<ResponseType>()
                .map_err(|_| tracing::debug!(hint = raw, "Ignoring unknown expectedResponseType"))
                .ok()
        });

        Ok(AuthorityOutcome {
            message: self.message.unwrap_or_default(),
            current_step_id,
            expected_response_type,
            used_clarification: self.used_clarification,
            session_complete: self.session_complete,
            performance_snapshot: self.performance_snapshot,
            messages: self.messages,
        })
    }
}

/// A validated successful reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorityOutcome {
    pub message: String,
    pub current_step_id: String,
    /// Advisory only; never overrides classification.
    pub expected_response_type: Option<ResponseType>,
    pub used_clarification: bool,
    pub session_complete: bool,
    pub performance_snapshot: Option<Value>,
    pub messages: Vec<ReplayedTurn>,
}

/// The remote session authority.
///
/// Implementations map unreachable hosts and non-2xx statuses to
/// `ShiftError::Transport`, and return every parsed body (including
/// `success: false`) as `Ok`.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    async fn exchange(&self, request: &AuthorityRequest) -> Result<AuthorityReply>;
}
