//! The standard step catalog.
//!
//! Adding a step is a data change here; no dispatch code needs to know about it.
//! Steps the authority emits that are missing from this table degrade to free
//! text input.

use super::classifier::AffordanceCopy;
use super::registry::{ResponseOverride, StepRegistryBuilder};
use super::{Modality, Phase, ResponseType::*, StepOwner};

const SHARED_MAIN: &[(&str, super::ResponseType)] = &[
    ("mind_shifting_explanation", WorkTypeSelect),
    ("work_type_description", FreeText),
    ("confirm_statement", YesNo),
    ("choose_method", MethodSelect),
    ("method_selection_intro", Auto),
];

const SHARED_DIGGING_DEEPER: &[(&str, super::ResponseType)] = &[
    ("digging_deeper_start", YesNo),
    ("future_problem_check", YesNoMaybe),
    ("restore_problem_statement", FreeText),
    ("scenario_check_1", YesNo),
    ("scenario_check_2", YesNo),
    ("scenario_check_3", YesNo),
    ("anything_else_check_1", YesNo),
    ("anything_else_check_2", YesNo),
    ("anything_else_check_3", YesNo),
    ("clear_anything_else_problem", FreeText),
];

const SHARED_INTEGRATION: &[(&str, super::ResponseType)] = &[
    ("integration_start", Auto),
    ("action_followup", FreeText),
    ("session_wrap_up", Auto),
];

const PROBLEM_MAIN: &[(&str, super::ResponseType)] = &[
    ("problem_shifting_intro", Auto),
    ("body_sensation_check", FreeText),
    ("what_needs_to_happen_step", FreeText),
    ("feel_solution_state", FreeText),
    ("feel_good_state", FreeText),
    ("what_happens_step", FreeText),
    ("check_if_still_problem", YesNo),
];

const PROBLEM_DIGGING_DEEPER: &[(&str, super::ResponseType)] = &[
    ("problem_dig_deeper_statement", FreeText),
    ("problem_dig_deeper_recheck", YesNo),
];

const PROBLEM_INTEGRATION: &[(&str, super::ResponseType)] = &[
    ("problem_integration_awareness_1", FreeText),
    ("problem_integration_awareness_2", FreeText),
    ("problem_integration_action_1", FreeText),
];

const IDENTITY_MAIN: &[(&str, super::ResponseType)] = &[
    ("identity_shifting_intro", Auto),
    ("identity_dissolve_step_a", FreeText),
    ("identity_dissolve_step_b", FreeText),
    ("identity_dissolve_step_c", FreeText),
    ("identity_dissolve_step_d", FreeText),
    ("identity_dissolve_step_e", FreeText),
    ("identity_check", YesNo),
    ("identity_problem_check", YesNo),
];

const IDENTITY_DIGGING_DEEPER: &[(&str, super::ResponseType)] = &[
    ("identity_future_check", YesNo),
    ("identity_scenario_check", YesNo),
];

const IDENTITY_INTEGRATION: &[(&str, super::ResponseType)] = &[
    ("identity_integration_awareness_1", FreeText),
    ("identity_integration_action_1", FreeText),
];

const BELIEF_MAIN: &[(&str, super::ResponseType)] = &[
    ("belief_shifting_intro", Auto),
    ("belief_step_a", FreeText),
    ("belief_step_b", FreeText),
    ("belief_step_c", FreeText),
    ("belief_step_d", FreeText),
    ("belief_step_e", FreeText),
    ("belief_check_1", YesNo),
    ("belief_check_2", YesNo),
    ("belief_check_3", YesNo),
    ("belief_check_4", YesNo),
    ("belief_problem_check", YesNo),
];

const BELIEF_DIGGING_DEEPER: &[(&str, super::ResponseType)] = &[
    ("belief_future_check", YesNoMaybe),
];

const BELIEF_INTEGRATION: &[(&str, super::ResponseType)] = &[
    ("belief_integration_awareness_1", FreeText),
    ("belief_integration_action_1", FreeText),
];

const BLOCKAGE_MAIN: &[(&str, super::ResponseType)] = &[
    ("blockage_shifting_intro", Auto),
    ("blockage_step_a", FreeText),
    ("blockage_step_b", FreeText),
    ("blockage_step_c", FreeText),
    ("blockage_step_d", FreeText),
    ("blockage_step_e", FreeText),
    ("blockage_check_if_still_problem", YesNo),
];

const BLOCKAGE_DIGGING_DEEPER: &[(&str, super::ResponseType)] = &[
    ("blockage_future_check", YesNo),
];

const BLOCKAGE_INTEGRATION: &[(&str, super::ResponseType)] = &[
    ("blockage_integration_awareness_1", FreeText),
    ("blockage_integration_action_1", FreeText),
];

const REALITY_MAIN: &[(&str, super::ResponseType)] = &[
    ("reality_shifting_intro", Auto),
    ("reality_goal_capture", FreeText),
    ("goal_deadline_check", YesNo),
    ("goal_deadline_date", FreeText),
    ("goal_certainty", FreeText),
    ("reality_step_a1", FreeText),
    ("reality_step_a2", FreeText),
    ("reality_step_a3", FreeText),
    ("reality_step_b", FreeText),
    ("reality_doubts_check", YesNo),
    ("reality_certainty_check", FreeText),
];

const REALITY_DIGGING_DEEPER: &[(&str, super::ResponseType)] = &[
    ("reality_doubt_reason", FreeText),
    ("reality_cycle_b4", YesNo),
];

const REALITY_INTEGRATION: &[(&str, super::ResponseType)] = &[
    ("reality_integration_intro", Auto),
    ("reality_integration_helped", FreeText),
    ("reality_integration_awareness", FreeText),
    ("reality_integration_action", FreeText),
];

const TRAUMA_MAIN: &[(&str, super::ResponseType)] = &[
    ("trauma_shifting_intro", Auto),
    ("trauma_identity_step", FreeText),
    ("trauma_dissolve_step_a", FreeText),
    ("trauma_dissolve_step_b", FreeText),
    ("trauma_dissolve_step_c", FreeText),
    ("trauma_dissolve_step_d", FreeText),
    ("trauma_dissolve_step_e", FreeText),
    ("trauma_identity_check", YesNo),
    ("trauma_experience_check", YesNo),
];

const TRAUMA_DIGGING_DEEPER: &[(&str, super::ResponseType)] = &[
    ("trauma_dig_deeper", YesNo),
    ("trauma_dig_deeper_2", YesNo),
];

const TRAUMA_INTEGRATION: &[(&str, super::ResponseType)] = &[
    ("trauma_integration_awareness_1", FreeText),
    ("trauma_integration_action_1", FreeText),
];

fn yes_no_copy(yes: &str, no: &str) -> AffordanceCopy {
    AffordanceCopy::labels([yes, no])
}

/// Returns a builder preloaded with the standard catalog.
///
/// Call `build()` once at startup; a duplicated step id fails there.
pub fn standard_catalog() -> StepRegistryBuilder {
    use Modality::*;

    let modality_flows: [(Modality, [&[(&str, super::ResponseType)]; 3]); 6] = [
        (
            ProblemShifting,
            [PROBLEM_MAIN, PROBLEM_DIGGING_DEEPER, PROBLEM_INTEGRATION],
        ),
        (
            IdentityShifting,
            [IDENTITY_MAIN, IDENTITY_DIGGING_DEEPER, IDENTITY_INTEGRATION],
        ),
        (
            BeliefShifting,
            [BELIEF_MAIN, BELIEF_DIGGING_DEEPER, BELIEF_INTEGRATION],
        ),
        (
            BlockageShifting,
            [BLOCKAGE_MAIN, BLOCKAGE_DIGGING_DEEPER, BLOCKAGE_INTEGRATION],
        ),
        (
            RealityShifting,
            [REALITY_MAIN, REALITY_DIGGING_DEEPER, REALITY_INTEGRATION],
        ),
        (
            TraumaShifting,
            [TRAUMA_MAIN, TRAUMA_DIGGING_DEEPER, TRAUMA_INTEGRATION],
        ),
    ];

    let mut builder = StepRegistryBuilder::new()
        .flow(StepOwner::Shared, Phase::Main, SHARED_MAIN)
        .flow(StepOwner::Shared, Phase::DiggingDeeper, SHARED_DIGGING_DEEPER)
        .flow(StepOwner::Shared, Phase::Integration, SHARED_INTEGRATION);

    for (modality, [main, digging_deeper, integration]) in modality_flows {
        let owner = StepOwner::Modality(modality);
        builder = builder
            .flow(owner, Phase::Main, main)
            .flow(owner, Phase::DiggingDeeper, digging_deeper)
            .flow(owner, Phase::Integration, integration);
    }

    builder
        .override_response(
            ResponseOverride::new(TraumaShifting, "trauma_dig_deeper", YesNo)
                .with_copy(yes_no_copy("Yes, let's dig deeper", "No, I feel complete")),
        )
        .override_response(
            ResponseOverride::new(TraumaShifting, "trauma_experience_check", YesNo).with_copy(
                AffordanceCopy::labels(["Yes, it still feels real", "No, it feels different now"])
                    .with_prompt("Does the experience still feel the same?"),
            ),
        )
        .override_response(
            ResponseOverride::new(RealityShifting, "goal_deadline_check", YesNo)
                .with_copy(yes_no_copy("Yes, there is a deadline", "No deadline")),
        )
        // Goals are either in the future or they are not; no "maybe".
        .override_response(ResponseOverride::new(
            RealityShifting,
            "future_problem_check",
            YesNo,
        ))
        .override_response(
            ResponseOverride::new(ProblemShifting, "digging_deeper_start", YesNo)
                .with_copy(yes_no_copy("Yes, dig deeper", "No, move on")),
        )
}
