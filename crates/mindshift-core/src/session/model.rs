//! Session state model.

use super::message::Turn;
use crate::step::{Modality, ResponseAffordance, ResponseType, WorkType};
use serde::{Deserialize, Serialize};

/// The orchestrator's mirror of one session at the remote authority.
///
/// Mutated only by the orchestrator, in response to authority replies or a
/// local undo. The busy flag lives beside it in [`super::BusyFlag`] so that a
/// restored snapshot can never resurrect an in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub current_step_id: Option<String>,
    #[serde(default)]
    pub selected_work_type: Option<WorkType>,
    #[serde(default)]
    pub selected_method: Option<Modality>,
    #[serde(default)]
    pub turn_log: Vec<Turn>,
    #[serde(default)]
    pub awaiting_response_type: Option<ResponseType>,
    /// The authority reported a terminal step.
    #[serde(default)]
    pub is_complete: bool,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            current_step_id: None,
            selected_work_type: None,
            selected_method: None,
            turn_log: Vec::new(),
            awaiting_response_type: None,
            is_complete: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.current_step_id.is_some()
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current_step_id.as_deref()
    }

    /// The most recent non-error system turn.
    pub fn last_system_turn(&self) -> Option<&Turn> {
        self.turn_log.iter().rev().find(|t| t.is_system() && !t.is_error)
    }

    /// Step ids of system step messages, oldest first.
    pub fn system_step_ids(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.turn_log
            .iter()
            .filter(|t| t.is_step_message())
            .filter_map(|t| t.step_id.as_deref())
    }
}

/// Read-only view handed to hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub user_id: String,
    pub current_step_id: Option<String>,
    pub selected_work_type: Option<WorkType>,
    pub selected_method: Option<Modality>,
    pub affordance: ResponseAffordance,
    pub turn_count: usize,
    pub history_depth: usize,
    pub is_busy: bool,
    pub is_complete: bool,
    pub last_error: Option<String>,
}
