//! Step domain module.
//!
//! A session is a walk through named steps. Every step belongs to exactly one
//! sub-flow (an owner plus a phase) and declares the response affordance the
//! user is offered while it is current.
//!
//! # Module Structure
//!
//! - `registry`: build-time ownership table (`StepRegistry`, `StepRegistryBuilder`)
//! - `catalog`: the standard step catalog for the six modalities
//! - `classifier`: ordered-precedence affordance resolution (`ResponseClassifier`)
//! - `router`: step → owning sub-flow resolution (`ModalityRouter`)
//! - `guardrail`: input and turn-log validation

mod catalog;
mod classifier;
mod guardrail;
mod registry;
mod router;

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub use catalog::standard_catalog;
pub use classifier::{
    AffordanceCopy, AffordanceSource, CLARIFICATION_PHRASES, ResponseAffordance,
    ResponseClassifier, looks_like_clarification,
};
pub use guardrail::{Guardrail, GuardrailWarning, check_input, check_step_loop, normalize_choice};
pub use registry::{FlowDefinition, ResponseOverride, StepRegistry, StepRegistryBuilder};
pub use router::{ModalityRouter, Resolution, SubFlow};

/// One of the six therapeutic method sub-flows.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Modality {
    #[strum(to_string = "Problem Shifting", serialize = "problem_shifting")]
    ProblemShifting,
    #[strum(to_string = "Identity Shifting", serialize = "identity_shifting")]
    IdentityShifting,
    #[strum(to_string = "Belief Shifting", serialize = "belief_shifting")]
    BeliefShifting,
    #[strum(to_string = "Blockage Shifting", serialize = "blockage_shifting")]
    BlockageShifting,
    #[strum(to_string = "Reality Shifting", serialize = "reality_shifting")]
    RealityShifting,
    #[strum(to_string = "Trauma Shifting", serialize = "trauma_shifting")]
    TraumaShifting,
}

impl Modality {
    /// Stable snake_case identifier used in flow ids and logs.
    pub fn id(&self) -> &'static str {
        match self {
            Self::ProblemShifting => "problem_shifting",
            Self::IdentityShifting => "identity_shifting",
            Self::BeliefShifting => "belief_shifting",
            Self::BlockageShifting => "blockage_shifting",
            Self::RealityShifting => "reality_shifting",
            Self::TraumaShifting => "trauma_shifting",
        }
    }

    /// Modalities offered for a work type, in display order.
    pub fn offered_for(work_type: WorkType) -> &'static [Modality] {
        match work_type {
            WorkType::Problem => &[
                Self::ProblemShifting,
                Self::IdentityShifting,
                Self::BeliefShifting,
                Self::BlockageShifting,
            ],
            WorkType::Goal => &[Self::RealityShifting],
            WorkType::NegativeExperience => &[Self::TraumaShifting],
        }
    }
}

/// The user's top-level choice, gating which modalities are offered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum WorkType {
    Problem,
    Goal,
    NegativeExperience,
}

impl WorkType {
    /// The value the authority expects for this selection.
    pub fn selection_code(&self) -> &'static str {
        match self {
            Self::Problem => "1",
            Self::Goal => "2",
            Self::NegativeExperience => "3",
        }
    }

    /// Human-readable label for the turn log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Problem => "Problem",
            Self::Goal => "Goal",
            Self::NegativeExperience => "Negative experience",
        }
    }

    /// Parses a selection code ("1"), enum name ("PROBLEM") or label
    /// ("negative experience").
    pub fn from_selection(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        match trimmed {
            "1" => return Some(Self::Problem),
            "2" => return Some(Self::Goal),
            "3" => return Some(Self::NegativeExperience),
            _ => {}
        }
        let normalized = trimmed.replace([' ', '-'], "_");
        normalized.parse().ok()
    }
}

/// Sub-phase of a modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Main,
    DiggingDeeper,
    Integration,
}

/// The response affordance a step expects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResponseType {
    YesNo,
    YesNoMaybe,
    MethodSelect,
    WorkTypeSelect,
    FreeText,
    /// No user input; the step advances on its own.
    Auto,
}

impl ResponseType {
    /// True for affordances rendered as fixed buttons.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::FreeText | Self::Auto)
    }
}

/// Who owns a step: a single modality, or the shared session scaffolding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOwner {
    Shared,
    Modality(Modality),
}

impl StepOwner {
    pub fn modality(&self) -> Option<Modality> {
        match self {
            Self::Shared => None,
            Self::Modality(m) => Some(*m),
        }
    }
}

impl fmt::Display for StepOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Modality(m) => write!(f, "{}", m.id()),
        }
    }
}

/// Identifies one sub-flow: an owner in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId {
    pub owner: StepOwner,
    pub phase: Phase,
}

impl FlowId {
    pub fn new(owner: StepOwner, phase: Phase) -> Self {
        Self { owner, phase }
    }

    pub fn shared(phase: Phase) -> Self {
        Self::new(StepOwner::Shared, phase)
    }

    pub fn of(modality: Modality, phase: Phase) -> Self {
        Self::new(StepOwner::Modality(modality), phase)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.phase)
    }
}

/// A registered step. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    pub flow: FlowId,
    pub response_type: ResponseType,
}

impl StepDefinition {
    pub fn modality(&self) -> Option<Modality> {
        self.flow.owner.modality()
    }

    pub fn phase(&self) -> Phase {
        self.flow.phase
    }
}
