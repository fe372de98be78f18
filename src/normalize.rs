//! Response normalizer - from raw completion text to a validated workout
//!
//! Model output is parsed as JSON and nothing else. Syntax problems become
//! [`LabError::MalformedResponse`], shape problems [`LabError::Validation`];
//! neither is ever passed through partially.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{LabError, Result};
use crate::exercises::{GeneratedExercise, GeneratedWorkout};

const FENCE: &str = "```";

/// Keys a wrapping object may use for the exercise list
const LIST_KEYS: &[&str] = &["exercises", "workout"];
const WARM_UP_KEYS: &[&str] = &["warm_up", "warmup", "Warm-up"];
const FINISHER_KEYS: &[&str] = &["finisher", "Finisher"];

/// Return the contents of the first fenced block, or the trimmed text if
/// there is no fence. A language tag on the opening line is dropped, and
/// prose around the block is ignored.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find(FENCE) else {
        return text;
    };

    let mut inner = &text[start + FENCE.len()..];

    // ```json\n... : the first line is a tag only if it's a bare word
    if let Some((first, rest)) = inner.split_once('\n') {
        let tag = first.trim();
        if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            inner = rest;
        }
    }

    match inner.find(FENCE) {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}

/// Parse and validate a completion
pub fn normalize(text: &str) -> Result<GeneratedWorkout> {
    let body = strip_code_fences(text);
    debug!(raw_len = text.len(), body_len = body.len(), "normalizing completion");

    let value: Value = serde_json::from_str(body).map_err(|e| LabError::malformed(e.to_string()))?;

    let workout = match value {
        Value::Array(items) => GeneratedWorkout::new(parse_exercises(items)?),
        Value::Object(obj) => parse_wrapped(obj)?,
        other => {
            return Err(LabError::validation(format!(
                "expected a JSON array or object, got {}",
                type_name(&other)
            )));
        }
    };

    if workout.is_empty() {
        return Err(LabError::validation("model returned no exercises"));
    }
    Ok(workout)
}

fn parse_wrapped(mut obj: Map<String, Value>) -> Result<GeneratedWorkout> {
    let list = LIST_KEYS
        .iter()
        .find_map(|k| obj.remove(*k))
        .ok_or_else(|| LabError::validation("object has no 'exercises' array"))?;

    let Value::Array(items) = list else {
        return Err(LabError::validation(format!(
            "'exercises' must be an array, got {}",
            type_name(&list)
        )));
    };

    Ok(GeneratedWorkout {
        exercises: parse_exercises(items)?,
        warm_up: optional_text(&mut obj, WARM_UP_KEYS)?,
        finisher: optional_text(&mut obj, FINISHER_KEYS)?,
    })
}

fn optional_text(obj: &mut Map<String, Value>, keys: &[&str]) -> Result<Option<String>> {
    match keys.iter().find_map(|k| obj.remove(*k)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        // Some models list warm-up steps instead of writing a sentence
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
        )),
        Some(other) => Err(LabError::validation(format!(
            "'{}' must be text, got {}",
            keys[0],
            type_name(&other)
        ))),
    }
}

fn parse_exercises(items: Vec<Value>) -> Result<Vec<GeneratedExercise>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(LabError::validation(format!(
                    "exercise {}: expected an object, got {}",
                    i + 1,
                    type_name(&item)
                )));
            }
            let ex: GeneratedExercise = serde_json::from_value(item)
                .map_err(|e| LabError::validation(format!("exercise {}: {}", i + 1, e)))?;
            check_exercise(i, &ex)?;
            Ok(ex)
        })
        .collect()
}

fn check_exercise(i: usize, ex: &GeneratedExercise) -> Result<()> {
    let fail = |what: &str| Err(LabError::validation(format!("exercise {}: {}", i + 1, what)));

    if ex.name.trim().is_empty() {
        return fail("empty name");
    }
    if ex.primary_muscle.trim().is_empty() {
        return fail("empty primary_muscle");
    }
    if ex.sets < 1 {
        return fail("sets must be at least 1");
    }
    if ex.reps.trim().is_empty() {
        return fail("empty reps");
    }
    Ok(())
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn exercise(name: &str) -> GeneratedExercise {
        GeneratedExercise {
            name: name.to_string(),
            primary_muscle: "Chest".to_string(),
            target_muscle_detail: Some("Upper chest".to_string()),
            equipment: Some("Dumbbells".to_string()),
            sets: 3,
            reps: "8-12".to_string(),
            weight: Some("Auto".to_string()),
            superset_group_id: Some(1),
        }
    }

    const BODY: &str = r#"[{"name":"Bench Press","primary_muscle":"Chest","sets":4,"reps":"5"}]"#;

    #[test]
    fn test_strip_plain_text_untouched() {
        assert_eq!(strip_code_fences("  [1, 2]\n"), "[1, 2]");
    }

    #[test]
    fn test_strip_fence_with_language_tag() {
        let text = format!("```json\n{}\n```", BODY);
        assert_eq!(strip_code_fences(&text), BODY);
    }

    #[test]
    fn test_strip_fence_without_tag() {
        let text = format!("```\n{}\n```", BODY);
        assert_eq!(strip_code_fences(&text), BODY);
    }

    #[test]
    fn test_strip_inline_fence() {
        let text = format!("```{}```", BODY);
        assert_eq!(strip_code_fences(&text), BODY);
    }

    #[test]
    fn test_strip_ignores_surrounding_prose() {
        let text = format!(
            "Here is your workout:\n```json\n{}\n```\nFocus on slow eccentrics!",
            BODY
        );
        assert_eq!(strip_code_fences(&text), BODY);
    }

    #[test]
    fn test_strip_unterminated_fence() {
        let text = format!("```json\n{}", BODY);
        assert_eq!(strip_code_fences(&text), BODY);
    }

    #[test]
    fn test_fenced_parses_like_body() {
        let fenced = normalize(&format!("```json\n{}\n```", BODY)).unwrap();
        let plain = normalize(BODY).unwrap();
        assert_eq!(fenced, plain);
    }

    #[test]
    fn test_normalize_is_idempotent_on_clean_json() {
        let list = vec![exercise("Bench Press"), exercise("Cable Fly"), exercise("Dips")];
        let text = serde_json::to_string(&list).unwrap();
        assert_eq!(normalize(&text).unwrap().exercises, list);
    }

    #[test]
    fn test_normalize_object_with_extras() {
        let text = r#"{
            "warm_up": "5 min bike",
            "finisher": ["push-ups to failure", "plank 60s"],
            "exercises": [{"name":"Squat","muscle":"Quads","sets":5,"reps":"5","weight":"80%"}]
        }"#;
        let workout = normalize(text).unwrap();
        assert_eq!(workout.warm_up.as_deref(), Some("5 min bike"));
        assert_eq!(workout.finisher.as_deref(), Some("push-ups to failure; plank 60s"));
        assert_eq!(workout.exercises[0].weight.as_deref(), Some("80%"));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = normalize(r#"[{"name": "Bench Press", "sets": 3,"#).unwrap_err();
        assert!(matches!(err, LabError::MalformedResponse(_)));
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_eval_style_output_is_rejected() {
        // Python literal, not JSON
        let err = normalize("[{'name': 'Bench Press', 'sets': 3}]").unwrap_err();
        assert!(matches!(err, LabError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_required_key_is_validation_error() {
        let raw = r#"[{"name":"Bench Press","primary_muscle":"Chest","reps":"5"}]"#;
        let err = normalize(raw).unwrap_err();
        match err {
            LabError::Validation(msg) => {
                assert!(msg.contains("exercise 1"));
                assert!(msg.contains("sets"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_top_level_type() {
        let err = normalize(r#""just a string""#).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));

        let err = normalize(r#"{"plan": []}"#).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_non_object_item() {
        let raw = r#"[{"name":"Dips","primary_muscle":"Triceps","sets":3,"reps":"8"}, 42]"#;
        let err = normalize(raw).unwrap_err();
        match err {
            LabError::Validation(msg) => assert!(msg.contains("exercise 2")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_sets_rejected() {
        let raw = r#"[{"name":"Dips","primary_muscle":"Triceps","sets":0,"reps":"8"}]"#;
        let err = normalize(raw).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(normalize("[]").unwrap_err(), LabError::Validation(_)));
    }
}
