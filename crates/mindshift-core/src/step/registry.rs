//! Build-time ownership table for steps.

use super::classifier::AffordanceCopy;
use super::{FlowId, Modality, Phase, ResponseType, StepDefinition, StepOwner};
use crate::error::{Result, ShiftError};
use std::collections::HashMap;

/// Steps declared by one sub-flow.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    pub flow: FlowId,
    pub steps: Vec<(String, ResponseType)>,
}

impl FlowDefinition {
    pub fn new(owner: StepOwner, phase: Phase, steps: &[(&str, ResponseType)]) -> Self {
        Self {
            flow: FlowId::new(owner, phase),
            steps: steps
                .iter()
                .map(|(id, response_type)| (id.to_string(), *response_type))
                .collect(),
        }
    }
}

/// A modality-specific affordance that replaces a step's registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOverride {
    pub modality: Modality,
    pub step_id: String,
    pub response_type: ResponseType,
    pub copy: Option<AffordanceCopy>,
}

impl ResponseOverride {
    pub fn new(modality: Modality, step_id: impl Into<String>, response_type: ResponseType) -> Self {
        Self {
            modality,
            step_id: step_id.into(),
            response_type,
            copy: None,
        }
    }

    pub fn with_copy(mut self, copy: AffordanceCopy) -> Self {
        self.copy = Some(copy);
        self
    }
}

/// Collects flow declarations and overrides, then validates them in `build`.
#[derive(Debug, Default)]
pub struct StepRegistryBuilder {
    flows: Vec<FlowDefinition>,
    overrides: Vec<ResponseOverride>,
}

impl StepRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the steps owned by `owner` in `phase`.
    pub fn flow(mut self, owner: StepOwner, phase: Phase, steps: &[(&str, ResponseType)]) -> Self {
        self.flows.push(FlowDefinition::new(owner, phase, steps));
        self
    }

    pub fn flow_definition(mut self, definition: FlowDefinition) -> Self {
        self.flows.push(definition);
        self
    }

    pub fn override_response(mut self, response_override: ResponseOverride) -> Self {
        self.overrides.push(response_override);
        self
    }

    /// Builds the ownership table.
    ///
    /// # Errors
    ///
    /// - `ShiftError::DuplicateStep` if two sub-flows (or one sub-flow twice)
    ///   claim the same step id
    /// - `ShiftError::Registry` if an override targets an unregistered step,
    ///   or two overrides target the same (modality, step) pair
    pub fn build(self) -> Result<StepRegistry> {
        let mut steps: HashMap<String, StepDefinition> = HashMap::new();
        let mut flows = Vec::with_capacity(self.flows.len());

        for definition in self.flows {
            for (step_id, response_type) in &definition.steps {
                if let Some(existing) = steps.get(step_id) {
                    return Err(ShiftError::DuplicateStep {
                        step_id: step_id.clone(),
                        first: existing.flow.to_string(),
                        second: definition.flow.to_string(),
                    });
                }
                steps.insert(
                    step_id.clone(),
                    StepDefinition {
                        id: step_id.clone(),
                        flow: definition.flow,
                        response_type: *response_type,
                    },
                );
            }
            if !flows.contains(&definition.flow) {
                flows.push(definition.flow);
            }
        }

        let mut overrides: HashMap<(Modality, String), ResponseOverride> = HashMap::new();
        for response_override in self.overrides {
            if !steps.contains_key(&response_override.step_id) {
                return Err(ShiftError::registry(format!(
                    "override for {} targets unregistered step '{}'",
                    response_override.modality.id(),
                    response_override.step_id
                )));
            }
            let key = (response_override.modality, response_override.step_id.clone());
            if overrides.contains_key(&key) {
                return Err(ShiftError::registry(format!(
                    "duplicate override for {} on step '{}'",
                    key.0.id(),
                    key.1
                )));
            }
            overrides.insert(key, response_override);
        }

        tracing::debug!(
            steps = steps.len(),
            flows = flows.len(),
            overrides = overrides.len(),
            "Step registry built"
        );

        Ok(StepRegistry {
            steps,
            flows,
            overrides,
        })
    }
}

/// Static classification of every known step into (owner, phase, response type).
///
/// Construct through [`StepRegistryBuilder`] or [`StepRegistry::standard`];
/// both validate step ownership uniqueness up front.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: HashMap<String, StepDefinition>,
    flows: Vec<FlowId>,
    overrides: HashMap<(Modality, String), ResponseOverride>,
}

impl StepRegistry {
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::new()
    }

    /// Builds the standard six-modality catalog.
    pub fn standard() -> Result<Self> {
        super::catalog::standard_catalog().build()
    }

    pub fn get(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.get(step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.steps.contains_key(step_id)
    }

    pub fn override_for(&self, modality: Modality, step_id: &str) -> Option<&ResponseOverride> {
        self.overrides.get(&(modality, step_id.to_string()))
    }

    /// Sub-flows in declaration order.
    pub fn flows(&self) -> &[FlowId] {
        &self.flows
    }

    /// Steps owned by `flow`, sorted by id.
    pub fn steps_in(&self, flow: FlowId) -> Vec<&StepDefinition> {
        let mut owned: Vec<&StepDefinition> =
            self.steps.values().filter(|s| s.flow == flow).collect();
        owned.sort_by(|a, b| a.id.cmp(&b.id));
        owned
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResponseType::*;

    #[test]
    fn test_build_registers_steps_with_owner() {
        let registry = StepRegistry::builder()
            .flow(StepOwner::Shared, Phase::Main, &[("choose_method", MethodSelect)])
            .flow(
                StepOwner::Modality(Modality::ProblemShifting),
                Phase::Main,
                &[("check_if_still_problem", YesNo)],
            )
            .build()
            .unwrap();

        let step = registry.get("check_if_still_problem").unwrap();
        assert_eq!(step.modality(), Some(Modality::ProblemShifting));
        assert_eq!(step.phase(), Phase::Main);
        assert_eq!(step.response_type, YesNo);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.flows().len(), 2);
    }

    #[test]
    fn test_duplicate_step_across_flows_fails() {
        let result = StepRegistry::builder()
            .flow(
                StepOwner::Modality(Modality::ProblemShifting),
                Phase::DiggingDeeper,
                &[("scenario_check", YesNo)],
            )
            .flow(
                StepOwner::Modality(Modality::BeliefShifting),
                Phase::DiggingDeeper,
                &[("scenario_check", YesNo)],
            )
            .build();

        match result {
            Err(ShiftError::DuplicateStep {
                step_id,
                first,
                second,
            }) => {
                assert_eq!(step_id, "scenario_check");
                assert_eq!(first, "problem_shifting/digging_deeper");
                assert_eq!(second, "belief_shifting/digging_deeper");
            }
            other => panic!("expected DuplicateStep, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_step_within_one_flow_fails() {
        let result = StepRegistry::builder()
            .flow(
                StepOwner::Shared,
                Phase::Main,
                &[("choose_method", MethodSelect), ("choose_method", FreeText)],
            )
            .build();
        assert!(matches!(result, Err(ShiftError::DuplicateStep { .. })));
    }

    #[test]
    fn test_override_for_unknown_step_fails() {
        let result = StepRegistry::builder()
            .flow(StepOwner::Shared, Phase::Main, &[("choose_method", MethodSelect)])
            .override_response(ResponseOverride::new(
                Modality::TraumaShifting,
                "no_such_step",
                YesNo,
            ))
            .build();
        assert!(matches!(result, Err(ShiftError::Registry(_))));
    }

    #[test]
    fn test_steps_in_flow_sorted() {
        let flow = FlowId::of(Modality::RealityShifting, Phase::Integration);
        let registry = StepRegistry::builder()
            .flow(
                StepOwner::Modality(Modality::RealityShifting),
                Phase::Integration,
                &[("reality_integration_b", FreeText), ("reality_integration_a", FreeText)],
            )
            .build()
            .unwrap();
        let ids: Vec<&str> = registry.steps_in(flow).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["reality_integration_a", "reality_integration_b"]);
    }
}
