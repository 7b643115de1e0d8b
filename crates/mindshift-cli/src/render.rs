//! Terminal rendering of turns and affordances.

use colored::Colorize;
use mindshift_core::session::{SessionView, Turn, TurnAuthor};
use mindshift_core::step::{Modality, ResponseAffordance, ResponseType, WorkType};

/// One line for a turn in the transcript.
pub fn turn_line(turn: &Turn) -> String {
    if turn.is_error {
        return format!("!! {}", turn.text).red().to_string();
    }
    match turn.author {
        TurnAuthor::System => format!("{} {}", "guide:".bright_blue().bold(), turn.text),
        TurnAuthor::User => format!("{} {}", "you:".green().bold(), turn.text),
    }
}

/// Labels for the numbered choices of the current affordance.
///
/// Empty for free text and auto-advancing steps.
pub fn choices(view: &SessionView) -> Vec<String> {
    choices_for(&view.affordance, view.selected_work_type)
}

fn choices_for(affordance: &ResponseAffordance, work_type: Option<WorkType>) -> Vec<String> {
    if let Some(copy) = &affordance.copy {
        if !copy.labels.is_empty() {
            return copy.labels.clone();
        }
    }
    match affordance.response_type {
        ResponseType::WorkTypeSelect => [WorkType::Problem, WorkType::Goal, WorkType::NegativeExperience]
            .iter()
            .map(|w| w.label().to_string())
            .collect(),
        ResponseType::MethodSelect => work_type
            .map(Modality::offered_for)
            .unwrap_or_default()
            .iter()
            .map(|m| m.to_string())
            .collect(),
        ResponseType::YesNo => vec!["Yes".to_string(), "No".to_string()],
        ResponseType::YesNoMaybe => vec!["Yes".to_string(), "No".to_string(), "Maybe".to_string()],
        ResponseType::FreeText | ResponseType::Auto => Vec::new(),
    }
}

/// Numbered choice list, one per line.
pub fn choice_menu(view: &SessionView) -> Option<String> {
    let labels = choices(view);
    if labels.is_empty() {
        return None;
    }
    let lines: Vec<String> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("  {} {}", format!("{}.", i + 1).bright_cyan(), label))
        .collect();
    Some(lines.join("\n"))
}

/// Translates what the user typed into the value sent as a selection.
///
/// Work types and methods go through as typed (the orchestrator accepts
/// numbers and names). Yes/no answers typed as a number are mapped to the
/// matching word; anything else passes through for the orchestrator to
/// normalize or reject.
pub fn selection_value(affordance: &ResponseAffordance, input: &str) -> String {
    let trimmed = input.trim();
    let words: &[&str] = match affordance.response_type {
        ResponseType::YesNo => &["yes", "no"],
        ResponseType::YesNoMaybe => &["yes", "no", "maybe"],
        _ => return trimmed.to_string(),
    };
    trimmed
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| words.get(i))
        .map(|w| w.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// A short multi-line status block for `/status`.
pub fn status(view: &SessionView) -> String {
    let mut lines = vec![
        format!("session   {}", view.session_id),
        format!("step      {}", view.current_step_id.as_deref().unwrap_or("-")),
        format!(
            "work type {}",
            view.selected_work_type.map(|w| w.label()).unwrap_or("-")
        ),
        format!(
            "method    {}",
            view.selected_method
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        format!("expects   {}", view.affordance.response_type.as_ref()),
        format!("turns     {}  undo depth {}", view.turn_count, view.history_depth),
    ];
    if view.is_complete {
        lines.push("complete".to_string());
    }
    if let Some(error) = &view.last_error {
        lines.push(format!("last error {}", error).red().to_string());
    }
    lines.join("\n")
}
