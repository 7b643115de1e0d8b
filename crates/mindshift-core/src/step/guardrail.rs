//! Guardrails: validation checks run against user input and recent turns.

use super::ResponseType;
use crate::error::{Result, ShiftError};
use serde::{Deserialize, Serialize};

/// A single validation rule attached to a sub-flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guardrail {
    /// Free text must contain something other than whitespace.
    NonEmptyInput,
    /// Free text is capped at this many characters.
    MaxInputChars(usize),
    /// Warn when the authority emits the same step more than this many times in a row.
    StepLoopLimit(usize),
}

/// A non-blocking finding about recent protocol state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardrailWarning {
    StepLoop { step_id: String, repeats: usize },
}

/// Checks `input` against the input guardrails in `guardrails`.
pub fn check_input(guardrails: &[Guardrail], input: &str) -> Result<()> {
    for guardrail in guardrails {
        match guardrail {
            Guardrail::NonEmptyInput if input.trim().is_empty() => {
                return Err(ShiftError::guardrail("a response is required"));
            }
            Guardrail::MaxInputChars(limit) => {
                let length = input.chars().count();
                if length > *limit {
                    return Err(ShiftError::guardrail(format!(
                        "response is {} characters, limit is {}",
                        length, limit
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Checks the most recent system step ids (oldest first) for a loop.
pub fn check_step_loop<'a, I>(guardrails: &[Guardrail], recent_step_ids: I) -> Option<GuardrailWarning>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: DoubleEndedIterator,
{
    let limit = guardrails.iter().find_map(|g| match g {
        Guardrail::StepLoopLimit(limit) => Some(*limit),
        _ => None,
    })?;

    let mut ids = recent_step_ids.into_iter().rev();
    let last = ids.next()?;
    let repeats = 1 + ids.take_while(|id| *id == last).count();
    (repeats > limit).then(|| GuardrailWarning::StepLoop {
        step_id: last.to_string(),
        repeats,
    })
}

const YES_WORDS: &[&str] = &["yes", "y", "yeah", "yep", "yup", "sure", "correct", "it is"];
const NO_WORDS: &[&str] = &["no", "n", "nope", "nah", "not really", "it isn't", "it is not"];
const MAYBE_WORDS: &[&str] = &["maybe", "not sure", "possibly", "perhaps", "i don't know"];

/// Normalizes a yes/no(/maybe) answer to `"yes"`, `"no"` or `"maybe"`.
///
/// Other response types pass through trimmed.
pub fn normalize_choice(response_type: ResponseType, raw: &str) -> Result<String> {
    let answer = raw
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase();

    let allows_maybe = match response_type {
        ResponseType::YesNo => false,
        ResponseType::YesNoMaybe => true,
        _ => return Ok(raw.trim().to_string()),
    };

    if YES_WORDS.contains(&answer.as_str()) {
        Ok("yes".to_string())
    } else if NO_WORDS.contains(&answer.as_str()) {
        Ok("no".to_string())
    } else if allows_maybe && MAYBE_WORDS.contains(&answer.as_str()) {
        Ok("maybe".to_string())
    } else {
        let expected = if allows_maybe {
            "yes, no or maybe"
        } else {
            "yes or no"
        };
        Err(ShiftError::guardrail(format!(
            "'{}' is not an answer to a {} question",
            raw.trim(),
            expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_input() {
        let guards = [Guardrail::NonEmptyInput];
        assert!(check_input(&guards, "   ").unwrap_err().is_guardrail());
        assert!(check_input(&guards, "a heavy feeling").is_ok());
    }

    #[test]
    fn test_max_input_chars_counts_characters() {
        let guards = [Guardrail::MaxInputChars(5)];
        assert!(check_input(&guards, "héllo").is_ok());
        assert!(check_input(&guards, "héllo!").is_err());
    }

    #[test]
    fn test_step_loop_detection() {
        let guards = [Guardrail::StepLoopLimit(2)];
        assert_eq!(check_step_loop(&guards, ["a", "b", "b"]), None);
        assert_eq!(
            check_step_loop(&guards, ["a", "b", "b", "b"]),
            Some(GuardrailWarning::StepLoop {
                step_id: "b".into(),
                repeats: 3
            })
        );
        assert_eq!(check_step_loop(&[], ["b", "b", "b"]), None);
        assert_eq!(check_step_loop(&guards, Vec::<&str>::new()), None);
    }

    #[test]
    fn test_normalize_yes_no() {
        assert_eq!(normalize_choice(ResponseType::YesNo, "Yeah!").unwrap(), "yes");
        assert_eq!(normalize_choice(ResponseType::YesNo, " nope ").unwrap(), "no");
        assert!(normalize_choice(ResponseType::YesNo, "maybe").is_err());
        assert_eq!(
            normalize_choice(ResponseType::YesNoMaybe, "Not sure.").unwrap(),
            "maybe"
        );
        assert_eq!(
            normalize_choice(ResponseType::FreeText, "  it feels tight ").unwrap(),
            "it feels tight"
        );
    }
}
