//! Modality router: maps the active step to the sub-flow that owns it.

use super::guardrail::Guardrail;
use super::registry::StepRegistry;
use super::{FlowId, Modality, Phase, StepDefinition, StepOwner};
use crate::config::GuardrailConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// A sub-flow handler: one owner in one phase, with its guardrails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFlow {
    pub flow: FlowId,
    pub guardrails: Vec<Guardrail>,
}

impl SubFlow {
    pub fn modality(&self) -> Option<Modality> {
        self.flow.owner.modality()
    }

    pub fn phase(&self) -> Phase {
        self.flow.phase
    }

    /// Whether this sub-flow may render while `session_method` is selected.
    ///
    /// Digging-deeper and integration steps owned by a modality are only
    /// active for the session's selected method.
    pub fn is_active_for(&self, session_method: Option<Modality>) -> bool {
        match (self.flow.owner, self.flow.phase) {
            (StepOwner::Shared, _) | (_, Phase::Main) => true,
            (StepOwner::Modality(owner), _) => session_method == Some(owner),
        }
    }
}

/// Outcome of resolving a step to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Exactly one sub-flow owns the step and it is active.
    Owned {
        step: &'a StepDefinition,
        handler: &'a SubFlow,
    },
    /// The owning sub-flow belongs to a modality other than the session method.
    Inactive {
        step: &'a StepDefinition,
        owner: Modality,
        session_method: Option<Modality>,
    },
    /// No sub-flow registered this step.
    Unregistered,
}

/// Resolves steps to sub-flows using the registry's ownership table.
///
/// Ownership uniqueness is guaranteed by [`StepRegistry`] construction, so
/// a step can never resolve to two handlers.
#[derive(Debug, Clone)]
pub struct ModalityRouter {
    registry: Arc<StepRegistry>,
    handlers: HashMap<FlowId, SubFlow>,
}

impl ModalityRouter {
    pub fn new(registry: Arc<StepRegistry>, guardrails: &GuardrailConfig) -> Self {
        let handlers = registry
            .flows()
            .iter()
            .map(|flow| {
                let mut rails = vec![
                    Guardrail::MaxInputChars(guardrails.max_input_chars),
                    Guardrail::StepLoopLimit(guardrails.step_loop_limit),
                ];
                if flow.phase != Phase::Integration || flow.owner != StepOwner::Shared {
                    rails.insert(0, Guardrail::NonEmptyInput);
                }
                (
                    *flow,
                    SubFlow {
                        flow: *flow,
                        guardrails: rails,
                    },
                )
            })
            .collect();

        Self { registry, handlers }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn handler(&self, flow: FlowId) -> Option<&SubFlow> {
        self.handlers.get(&flow)
    }

    /// Resolves the owner of `step_id` given the session's selected method.
    pub fn resolve_owner(&self, step_id: &str, session_method: Option<Modality>) -> Resolution<'_> {
        let Some(step) = self.registry.get(step_id) else {
            return Resolution::Unregistered;
        };
        let Some(handler) = self.handlers.get(&step.flow) else {
            return Resolution::Unregistered;
        };

        if handler.is_active_for(session_method) {
            Resolution::Owned { step, handler }
        } else {
            // Only modality-owned flows can be inactive.
            match step.flow.owner {
                StepOwner::Modality(owner) => Resolution::Inactive {
                    step,
                    owner,
                    session_method,
                },
                StepOwner::Shared => Resolution::Owned { step, handler },
            }
        }
    }

    /// Guardrails for `step_id`; unregistered steps get the shared main-flow set.
    pub fn guardrails_for(&self, step_id: &str, session_method: Option<Modality>) -> Vec<Guardrail> {
        match self.resolve_owner(step_id, session_method) {
            Resolution::Owned { handler, .. } => handler.guardrails.clone(),
            Resolution::Inactive { .. } | Resolution::Unregistered => self
                .handlers
                .get(&FlowId::shared(Phase::Main))
                .map(|h| h.guardrails.clone())
                .unwrap_or_else(|| vec![Guardrail::NonEmptyInput]),
        }
    }
}
