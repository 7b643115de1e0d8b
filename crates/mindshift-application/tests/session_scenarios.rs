mod common;

use common::Harness;
use mindshift_application::{SyncSignal, Transition, UndoOutcome};
use mindshift_core::ShiftError;
use mindshift_core::authority::{AuthorityAction, AuthorityReply, ReplayedTurn};
use mindshift_core::config::OrchestratorConfig;
use mindshift_core::session::TurnAuthor;
use mindshift_core::speech::SpeechEvent;
use mindshift_core::step::{AffordanceSource, GuardrailWarning, Modality, ResponseType, WorkType};
use serde_json::json;

fn continue_count(h: &Harness) -> usize {
    h.authority
        .requests()
        .iter()
        .filter(|r| r.action == AuthorityAction::Continue)
        .count()
}

#[tokio::test]
async fn test_start_work_type_then_method_scenario() {
    let mut h = Harness::new(false);
    h.authority.reply(
        AuthorityReply::ok(
            "Welcome. What would you like to work on today?",
            "mind_shifting_explanation",
        )
        .with_expected(ResponseType::WorkTypeSelect),
    );
    h.authority.reply(
        AuthorityReply::ok("Which method would you like to use?", "choose_method")
            .with_expected(ResponseType::MethodSelect),
    );
    h.authority.reply(
        AuthorityReply::ok(
            "Feel the problem. Is it still a problem?",
            "check_if_still_problem",
        )
        .with_expected(ResponseType::YesNo),
    );

    let started = h.orchestrator.start().await.unwrap();
    assert!(started.is_applied());
    assert_eq!(
        h.orchestrator.affordance().response_type,
        ResponseType::WorkTypeSelect
    );
    // Nothing to undo to from the first step.
    assert_eq!(h.orchestrator.history_depth(), 0);

    h.orchestrator.select_affordance("PROBLEM").await.unwrap();
    assert_eq!(
        serde_json::to_value(h.authority.last_request()).unwrap(),
        json!({
            "sessionId": "session-1",
            "userId": "user-1",
            "action": "continue",
            "userInput": "1"
        })
    );
    assert_eq!(h.orchestrator.current_step(), Some("choose_method"));
    assert_eq!(
        h.orchestrator.affordance().response_type,
        ResponseType::MethodSelect
    );
    assert_eq!(
        h.orchestrator.state().selected_work_type,
        Some(WorkType::Problem)
    );

    let transition = h
        .orchestrator
        .select_affordance("Problem Shifting")
        .await
        .unwrap();
    assert_eq!(
        h.authority.last_request().user_input.as_deref(),
        Some("Problem Shifting")
    );
    match transition {
        Transition::Applied {
            step_id,
            affordance,
            warnings,
            complete,
        } => {
            assert_eq!(step_id, "check_if_still_problem");
            assert_eq!(affordance.response_type, ResponseType::YesNo);
            assert_eq!(affordance.source, AffordanceSource::Registry);
            assert!(warnings.is_empty());
            assert!(!complete);
        }
        other => panic!("expected applied transition, got {:?}", other),
    }
    assert_eq!(
        h.orchestrator.state().selected_method,
        Some(Modality::ProblemShifting)
    );
    assert_eq!(h.orchestrator.history_depth(), 2);

    let authors: Vec<TurnAuthor> = h.orchestrator.turn_log().iter().map(|t| t.author).collect();
    assert_eq!(
        authors,
        vec![
            TurnAuthor::System,
            TurnAuthor::User,
            TurnAuthor::System,
            TurnAuthor::User,
            TurnAuthor::System
        ]
    );
}

#[tokio::test]
async fn test_speech_is_stopped_before_next_request() {
    let mut h = Harness::new(true);
    h.authority
        .reply(AuthorityReply::ok("Is it still a problem?", "check_if_still_problem"));
    h.authority.reply(AuthorityReply::ok(
        "Would you like to dig deeper?",
        "digging_deeper_start",
    ));

    h.orchestrator.start().await.unwrap();
    // Text stays hidden until speech starts.
    assert!(h.orchestrator.turn_log().is_empty());

    let utterance = h.synthesizer.last_utterance();
    h.orchestrator
        .handle_signal(SyncSignal::Speech(SpeechEvent::started(utterance)))
        .await
        .unwrap();
    assert_eq!(h.orchestrator.turn_log().len(), 1);
    assert!(h.orchestrator.turn_log()[0].audio.is_some());

    // The user clicks "yes" while the question is still being spoken.
    h.orchestrator.select_affordance("yes").await.unwrap();

    assert_eq!(
        h.events(),
        vec!["exchange:start", "speak", "stop", "exchange:continue", "speak"]
    );
    assert_eq!(h.authority.last_request().user_input.as_deref(), Some("yes"));
}

#[tokio::test]
async fn test_answer_before_speech_starts_reveals_held_text_first() {
    let mut h = Harness::new(true);
    h.authority
        .reply(AuthorityReply::ok("Is it still a problem?", "check_if_still_problem"));
    h.authority.reply(AuthorityReply::ok(
        "Would you like to dig deeper?",
        "digging_deeper_start",
    ));

    h.orchestrator.start().await.unwrap();
    h.orchestrator.submit("no").await.unwrap();

    let log = h.orchestrator.turn_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].text, "Is it still a problem?");
    assert_eq!(log[1].author, TurnAuthor::User);
    assert_eq!(h.authority.last_request().user_input.as_deref(), Some("no"));
}

#[tokio::test]
async fn test_undo_rejected_leaves_state_unchanged_and_discards_entry() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "What would you like to work on?",
        "mind_shifting_explanation",
    ));
    h.authority
        .reply(AuthorityReply::ok("Which method?", "choose_method"));
    h.orchestrator.start().await.unwrap();
    h.orchestrator.select_affordance("1").await.unwrap();
    assert_eq!(h.orchestrator.history_depth(), 1);

    h.authority
        .reply(AuthorityReply::failure("Cannot roll back this session"));
    let before = h.orchestrator.state().clone();
    let affordance_before = h.orchestrator.affordance().clone();

    let outcome = h.orchestrator.undo().await.unwrap();
    assert_eq!(
        outcome,
        UndoOutcome::Rejected {
            error: ShiftError::UndoRejected("Cannot roll back this session".into())
        }
    );
    assert_eq!(h.orchestrator.state(), &before);
    assert_eq!(h.orchestrator.affordance(), &affordance_before);
    assert_eq!(h.orchestrator.history_depth(), 0);
    assert!(h.orchestrator.last_error().is_some());

    let request = h.authority.last_request();
    assert_eq!(request.action, AuthorityAction::Undo);
    assert_eq!(
        request.undo_to_step_id.as_deref(),
        Some("mind_shifting_explanation")
    );

    // The discarded entry is not retried.
    let sent = h.authority.request_count();
    assert_eq!(h.orchestrator.undo().await.unwrap(), UndoOutcome::NothingToUndo);
    assert_eq!(h.authority.request_count(), sent);
}

#[tokio::test]
async fn test_undo_on_empty_history_sends_nothing() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "What would you like to work on?",
        "mind_shifting_explanation",
    ));
    h.orchestrator.start().await.unwrap();
    let before = h.orchestrator.state().clone();

    for _ in 0..3 {
        assert_eq!(h.orchestrator.undo().await.unwrap(), UndoOutcome::NothingToUndo);
    }
    assert_eq!(h.authority.request_count(), 1);
    assert_eq!(h.orchestrator.state(), &before);
}

#[tokio::test]
async fn test_undo_success_restores_previous_step_and_selections() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "What would you like to work on?",
        "mind_shifting_explanation",
    ));
    h.authority
        .reply(AuthorityReply::ok("Which method?", "choose_method"));
    h.orchestrator.start().await.unwrap();
    h.orchestrator.select_affordance("GOAL").await.unwrap();
    assert_eq!(
        h.orchestrator.state().selected_work_type,
        Some(WorkType::Goal)
    );

    h.authority
        .reply(AuthorityReply::ok("", "mind_shifting_explanation"));
    let outcome = h.orchestrator.undo().await.unwrap();
    assert_eq!(
        outcome,
        UndoOutcome::Restored {
            step_id: "mind_shifting_explanation".into()
        }
    );
    assert_eq!(h.orchestrator.current_step(), Some("mind_shifting_explanation"));
    assert_eq!(
        h.orchestrator.affordance().response_type,
        ResponseType::WorkTypeSelect
    );
    assert_eq!(h.orchestrator.state().selected_work_type, None);
    assert_eq!(h.orchestrator.turn_log().len(), 1);
    assert_eq!(h.orchestrator.history_depth(), 0);
}

#[tokio::test]
async fn test_undo_transport_failure_is_a_rejection() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "What would you like to work on?",
        "mind_shifting_explanation",
    ));
    h.authority
        .reply(AuthorityReply::ok("Which method?", "choose_method"));
    h.orchestrator.start().await.unwrap();
    h.orchestrator.select_affordance("1").await.unwrap();

    h.authority
        .fail(ShiftError::transport("connection reset"));
    let before = h.orchestrator.state().clone();
    match h.orchestrator.undo().await.unwrap() {
        UndoOutcome::Rejected {
            error: ShiftError::UndoRejected(message),
        } => assert!(message.contains("connection reset")),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(h.orchestrator.state(), &before);
}

#[tokio::test(start_paused = true)]
async fn test_auto_advance_fires_once_on_repeated_speech_finished() {
    let mut h = Harness::new(true);
    h.authority.reply(AuthorityReply::ok(
        "Let's begin Problem Shifting.",
        "problem_shifting_intro",
    ));
    h.authority.reply(AuthorityReply::ok(
        "Feel the problem. What does it feel like?",
        "body_sensation_check",
    ));

    h.orchestrator.start().await.unwrap();
    assert!(h.orchestrator.affordance().is_auto());
    let utterance = h.synthesizer.last_utterance();

    let started = h
        .orchestrator
        .handle_signal(SyncSignal::Speech(SpeechEvent::started(utterance)))
        .await
        .unwrap();
    assert!(started.is_none());

    let first = h
        .orchestrator
        .handle_signal(SyncSignal::Speech(SpeechEvent::finished(utterance)))
        .await
        .unwrap();
    assert!(matches!(
        first,
        Some(Transition::Applied { ref step_id, .. }) if step_id == "body_sensation_check"
    ));

    let second = h
        .orchestrator
        .handle_signal(SyncSignal::Speech(SpeechEvent::finished(utterance)))
        .await
        .unwrap();
    assert!(second.is_none());

    assert_eq!(continue_count(&h), 1);
    let request = h.authority.last_request();
    assert_eq!(request.user_input, None);
    // Auto steps are not rollback targets.
    assert_eq!(h.orchestrator.history_depth(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_advance_on_reading_delay_without_speech() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "Let's begin Problem Shifting.",
        "problem_shifting_intro",
    ));
    h.authority.reply(AuthorityReply::ok(
        "Feel the problem. What does it feel like?",
        "body_sensation_check",
    ));

    h.orchestrator.start().await.unwrap();
    assert_eq!(h.orchestrator.turn_log().len(), 1);

    let signal = h.signals.recv().await.unwrap();
    assert!(matches!(signal, SyncSignal::ReadingDelayElapsed { .. }));

    let first = h.orchestrator.handle_signal(signal).await.unwrap();
    assert!(first.is_some());
    let replay = h.orchestrator.handle_signal(signal).await.unwrap();
    assert!(replay.is_none());

    assert_eq!(continue_count(&h), 1);
    assert!(h.synthesizer.spoken().is_empty());
    assert_eq!(h.orchestrator.current_step(), Some("body_sensation_check"));
}

#[tokio::test]
async fn test_history_depth_is_bounded() {
    let mut h = Harness::new(false);
    h.authority
        .reply(AuthorityReply::ok("Tell me about it.", "custom_step_0"));
    h.orchestrator.start().await.unwrap();

    for i in 1..=12 {
        h.authority.reply(AuthorityReply::ok(
            format!("Question {}", i),
            format!("custom_step_{}", i),
        ));
        let transition = h.orchestrator.submit("an answer").await.unwrap();
        assert!(transition.is_applied());
        assert!(h.orchestrator.history_depth() <= 10);
    }
    assert_eq!(h.orchestrator.history_depth(), 10);

    h.authority.reply(AuthorityReply::ok("", "custom_step_11"));
    assert_eq!(
        h.orchestrator.undo().await.unwrap(),
        UndoOutcome::Restored {
            step_id: "custom_step_11".into()
        }
    );
}

#[tokio::test]
async fn test_failed_request_on_full_history_keeps_every_undo_level() {
    let mut config = OrchestratorConfig::default();
    config.history_capacity = 2;
    let mut h = Harness::with_config(config);
    h.authority
        .reply(AuthorityReply::ok("Tell me about it.", "custom_step_0"));
    h.orchestrator.start().await.unwrap();

    for i in 1..=2 {
        h.authority.reply(AuthorityReply::ok(
            format!("Question {}", i),
            format!("custom_step_{}", i),
        ));
        assert!(h.orchestrator.submit("an answer").await.unwrap().is_applied());
    }
    assert_eq!(h.orchestrator.history_depth(), 2);

    h.authority.fail(ShiftError::transport("connection reset"));
    let failed = h.orchestrator.submit("another answer").await.unwrap();
    assert!(!failed.is_applied());
    assert_eq!(h.orchestrator.history_depth(), 2);

    for step in ["custom_step_1", "custom_step_0"] {
        h.authority.reply(AuthorityReply::ok("", step));
        assert_eq!(
            h.orchestrator.undo().await.unwrap(),
            UndoOutcome::Restored {
                step_id: step.into()
            }
        );
    }
    assert_eq!(h.orchestrator.history_depth(), 0);
}

#[tokio::test]
async fn test_transport_failure_is_reported_inline_and_retryable() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "Feel the problem. What does it feel like?",
        "body_sensation_check",
    ));
    h.orchestrator.start().await.unwrap();

    h.authority
        .fail(ShiftError::transport("connection refused"));
    let transition = h.orchestrator.submit("a tight feeling").await.unwrap();
    assert!(matches!(
        transition,
        Transition::Failed {
            error: ShiftError::Transport(_)
        }
    ));
    assert_eq!(h.orchestrator.current_step(), Some("body_sensation_check"));
    assert_eq!(h.orchestrator.history_depth(), 0);
    assert!(!h.orchestrator.is_busy());
    let last = h.orchestrator.turn_log().last().unwrap();
    assert!(last.is_error);

    h.authority.reply(AuthorityReply::ok(
        "What needs to happen for it to not be a problem?",
        "what_needs_to_happen_step",
    ));
    let retry = h.orchestrator.submit("a tight feeling").await.unwrap();
    assert!(retry.is_applied());
    assert_eq!(h.orchestrator.history_depth(), 1);
    assert!(h.orchestrator.last_error().is_none());
}

#[tokio::test]
async fn test_authority_failure_restores_selection() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "What would you like to work on?",
        "mind_shifting_explanation",
    ));
    h.orchestrator.start().await.unwrap();

    h.authority.reply(AuthorityReply::failure("Session expired"));
    let transition = h.orchestrator.select_affordance("3").await.unwrap();
    assert_eq!(
        transition,
        Transition::Failed {
            error: ShiftError::Authority("Session expired".into())
        }
    );
    assert_eq!(h.orchestrator.state().selected_work_type, None);
    assert!(
        h.orchestrator
            .turn_log()
            .last()
            .unwrap()
            .text
            .contains("Session expired")
    );
}

#[tokio::test]
async fn test_clarification_forces_free_text() {
    let mut h = Harness::new(false);
    h.authority.reply(
        AuthorityReply::ok(
            "When you say it is still there, what do you mean?",
            "check_if_still_problem",
        )
        .with_clarification()
        .with_expected(ResponseType::YesNo),
    );
    h.orchestrator.start().await.unwrap();
    assert_eq!(
        h.orchestrator.affordance().response_type,
        ResponseType::FreeText
    );
    assert_eq!(
        h.orchestrator.affordance().source,
        AffordanceSource::Clarification
    );

    h.authority.reply(AuthorityReply::ok(
        "Is it still a problem?",
        "check_if_still_problem",
    ));
    h.orchestrator
        .submit("I mean it still bothers me at work")
        .await
        .unwrap();
    assert_eq!(
        h.authority.last_request().user_input.as_deref(),
        Some("I mean it still bothers me at work")
    );
    assert_eq!(h.orchestrator.affordance().response_type, ResponseType::YesNo);
}

#[tokio::test]
async fn test_clarifying_phrase_detected_without_flag() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "Could you clarify which part still feels like a problem?",
        "check_if_still_problem",
    ));
    h.orchestrator.start().await.unwrap();
    assert_eq!(
        h.orchestrator.affordance().response_type,
        ResponseType::FreeText
    );
    assert!(h.orchestrator.turn_log()[0].used_clarification);
}

#[tokio::test]
async fn test_second_request_while_busy_is_rejected() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "Feel the problem. What does it feel like?",
        "body_sensation_check",
    ));
    h.orchestrator.start().await.unwrap();

    let permit = h.orchestrator.busy_flag().try_acquire().unwrap();
    assert!(h.orchestrator.is_busy());
    assert_eq!(
        h.orchestrator.submit("heavy").await.unwrap_err(),
        ShiftError::Busy
    );
    assert_eq!(h.authority.request_count(), 1);

    drop(permit);
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn test_guardrails_reject_locally() {
    let mut h = Harness::new(false);
    h.authority
        .reply(AuthorityReply::ok("Is it still a problem?", "check_if_still_problem"));
    h.orchestrator.start().await.unwrap();

    assert!(h.orchestrator.submit("purple").await.unwrap_err().is_guardrail());
    assert_eq!(h.authority.request_count(), 1);
    assert_eq!(h.orchestrator.turn_log().len(), 1);

    h.authority.reply(AuthorityReply::ok(
        "Feel the problem. What does it feel like?",
        "body_sensation_check",
    ));
    h.orchestrator.submit("Yeah!").await.unwrap();
    assert_eq!(h.authority.last_request().user_input.as_deref(), Some("yes"));

    assert!(h.orchestrator.submit("   ").await.unwrap_err().is_guardrail());
    let too_long = "x".repeat(OrchestratorConfig::default().guardrails.max_input_chars + 1);
    assert!(h.orchestrator.submit(&too_long).await.unwrap_err().is_guardrail());
    assert_eq!(h.authority.request_count(), 2);
}

#[tokio::test]
async fn test_method_must_be_offered_for_work_type() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "What would you like to work on?",
        "mind_shifting_explanation",
    ));
    h.authority
        .reply(AuthorityReply::ok("Which method?", "choose_method"));
    h.authority.reply(AuthorityReply::ok(
        "Let's begin Reality Shifting.",
        "reality_shifting_intro",
    ));
    h.orchestrator.start().await.unwrap();
    h.orchestrator.select_affordance("2").await.unwrap();
    assert_eq!(
        h.orchestrator.offered_methods(),
        &[Modality::RealityShifting]
    );

    let rejected = h
        .orchestrator
        .select_affordance("Problem Shifting")
        .await
        .unwrap_err();
    assert!(rejected.is_guardrail());

    h.orchestrator.select_affordance("1").await.unwrap();
    assert_eq!(
        h.authority.last_request().user_input.as_deref(),
        Some("Reality Shifting")
    );
}

#[tokio::test]
async fn test_modality_override_applies_for_selected_method() {
    let mut h = Harness::new(false);
    h.authority.reply(AuthorityReply::ok(
        "What would you like to work on?",
        "mind_shifting_explanation",
    ));
    h.authority
        .reply(AuthorityReply::ok("Which method?", "choose_method"));
    h.authority.reply(AuthorityReply::ok(
        "Would you like to dig deeper?",
        "trauma_dig_deeper",
    ));
    h.orchestrator.start().await.unwrap();
    h.orchestrator.select_affordance("NEGATIVE_EXPERIENCE").await.unwrap();
    h.orchestrator.select_affordance("Trauma Shifting").await.unwrap();

    let affordance = h.orchestrator.affordance();
    assert_eq!(affordance.response_type, ResponseType::YesNo);
    assert_eq!(affordance.source, AffordanceSource::Override);
    assert_eq!(affordance.copy.as_ref().unwrap().labels.len(), 2);
}

#[tokio::test]
async fn test_step_of_inactive_modality_degrades_to_free_text() {
    let mut h = Harness::new(false);
    h.authority
        .reply(AuthorityReply::ok("Which method?", "choose_method"));
    h.authority.reply(AuthorityReply::ok(
        "Would you like to dig deeper?",
        "trauma_dig_deeper",
    ));
    h.orchestrator.start().await.unwrap();
    h.orchestrator.select_affordance("Problem Shifting").await.unwrap();

    assert_eq!(
        h.orchestrator.affordance().response_type,
        ResponseType::FreeText
    );
    assert_eq!(
        h.orchestrator.affordance().source,
        AffordanceSource::Fallback
    );
}

#[tokio::test]
async fn test_completed_session_rejects_mutation() {
    let mut h = Harness::new(false);
    h.authority.reply(
        AuthorityReply::ok("Thank you, the session is complete.", "session_wrap_up").completing(),
    );
    h.orchestrator.start().await.unwrap();
    assert!(h.orchestrator.is_complete());

    assert!(matches!(
        h.orchestrator.submit("hello").await,
        Err(ShiftError::SessionComplete(_))
    ));
    assert!(matches!(
        h.orchestrator.undo().await,
        Err(ShiftError::SessionComplete(_))
    ));
    assert_eq!(h.authority.request_count(), 1);
}

#[tokio::test]
async fn test_step_loop_warning() {
    let mut config = OrchestratorConfig::default();
    config.guardrails.step_loop_limit = 2;
    let mut h = Harness::with_config(config);

    for _ in 0..3 {
        h.authority.reply(AuthorityReply::ok(
            "Feel the problem. What does it feel like?",
            "body_sensation_check",
        ));
    }
    h.orchestrator.start().await.unwrap();
    let second = h.orchestrator.submit("heavy").await.unwrap();
    assert!(matches!(second, Transition::Applied { ref warnings, .. } if warnings.is_empty()));

    match h.orchestrator.submit("still heavy").await.unwrap() {
        Transition::Applied { warnings, .. } => assert_eq!(
            warnings,
            vec![GuardrailWarning::StepLoop {
                step_id: "body_sensation_check".into(),
                repeats: 3
            }]
        ),
        other => panic!("expected applied transition, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resume_rehydrates_turn_log_and_method() {
    let mut h = Harness::new(false);
    let mut reply = AuthorityReply::ok("Is it still a problem?", "check_if_still_problem");
    reply.messages = vec![
        ReplayedTurn {
            author: TurnAuthor::System,
            text: "What would you like to work on?".into(),
            step_id: Some("mind_shifting_explanation".into()),
            used_clarification: false,
            created_at: None,
        },
        ReplayedTurn {
            author: TurnAuthor::User,
            text: "Problem".into(),
            step_id: Some("mind_shifting_explanation".into()),
            used_clarification: false,
            created_at: None,
        },
        ReplayedTurn {
            author: TurnAuthor::System,
            text: "Is it still a problem?".into(),
            step_id: Some("check_if_still_problem".into()),
            used_clarification: false,
            created_at: None,
        },
    ];
    h.authority.reply(reply);

    h.orchestrator.resume().await.unwrap();
    assert_eq!(h.authority.last_request().action, AuthorityAction::Resume);
    assert_eq!(h.orchestrator.turn_log().len(), 3);
    assert_eq!(
        h.orchestrator.state().selected_method,
        Some(Modality::ProblemShifting)
    );
    assert_eq!(
        h.orchestrator.state().selected_work_type,
        Some(WorkType::Problem)
    );
    assert_eq!(h.orchestrator.affordance().response_type, ResponseType::YesNo);
    assert!(matches!(
        h.orchestrator.start().await,
        Err(ShiftError::AlreadyStarted(_))
    ));
}
