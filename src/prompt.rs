//! Prompt builder - turns a workout request into one instruction string

use serde_json::json;

use crate::exercises::WorkoutRequest;

/// Placeholder for a missing PR map
pub const NO_PRS: &str = "N/A";

/// Placeholder for missing workout history
pub const NO_HISTORY: &str = "None";

/// Fields every exercise object must carry, in the order the log stores them
pub const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("name", "string"),
    ("primary_muscle", "string"),
    ("target_muscle_detail", "string"),
    ("equipment", "string"),
    ("sets", "integer >= 1"),
    ("reps", "string, e.g. \"8-12\" or \"5 @ RPE 8\""),
    ("weight", "string, \"Auto\" or a percentage of the PR"),
    ("superset_group_id", "integer, 1 = not in a superset, exercises sharing another value are paired"),
];

fn prs_section(req: &WorkoutRequest) -> String {
    match &req.prs {
        Some(prs) if !prs.is_empty() => {
            serde_json::to_string(prs).unwrap_or_else(|_| NO_PRS.to_string())
        }
        _ => NO_PRS.to_string(),
    }
}

fn history_section(req: &WorkoutRequest) -> String {
    match &req.history {
        Some(rows) if !rows.is_empty() => {
            let entries: Vec<_> = rows
                .iter()
                .map(|r| {
                    json!({
                        "date": r.date,
                        "exercise": r.exercise,
                        "sets": r.sets,
                        "reps": r.reps,
                        "weight": r.weight,
                        "notes": r.notes,
                    })
                })
                .collect();
            serde_json::to_string(&entries).unwrap_or_else(|_| NO_HISTORY.to_string())
        }
        _ => NO_HISTORY.to_string(),
    }
}

/// Build the generation prompt. Pure templating, never fails.
pub fn build_prompt(req: &WorkoutRequest) -> String {
    let fields = REQUIRED_FIELDS
        .iter()
        .map(|(name, kind)| format!("  - {} ({})", name, kind))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an elite strength coach designing a {goal} workout for a {day} day, following progressive overload principles with evidence-based set and rep schemes for intermediate lifters.

Rules:
- Exactly {count} exercises, balancing compound and isolation movements.
- Scale prescribed weights from the personal records when available.
- Progress from the previous sessions, do not repeat them verbatim.

PERSONAL RECORDS (exercise -> best load):
{prs}

PREVIOUS {day_upper} SESSIONS:
{history}

OUTPUT FORMAT:
Return ONLY a single JSON object, no prose and no code fences:
{{"warm_up": string, "finisher": string, "exercises": [ ... ]}}
Each item of "exercises" must have exactly these fields:
{fields}"#,
        goal = req.goal.as_str().to_lowercase(),
        day = req.day_type,
        day_upper = req.day_type.as_str().to_uppercase(),
        count = req.exercise_count,
        prs = prs_section(req),
        history = history_section(req),
        fields = fields,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sample_row;
    use crate::exercises::{DayType, Goal};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn request(day: DayType, goal: Goal) -> WorkoutRequest {
        WorkoutRequest::new(day, goal, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_prompt_contains_goal_and_day() {
        for day in DayType::all() {
            for goal in Goal::all() {
                let prompt = build_prompt(&request(*day, *goal));
                assert!(!prompt.is_empty());
                assert!(prompt.contains(day.as_str()), "missing {} in prompt", day);
                assert!(prompt.to_lowercase().contains(&goal.as_str().to_lowercase()));
            }
        }
    }

    #[test]
    fn test_placeholders_when_context_missing() {
        let prompt = build_prompt(&request(DayType::Pull, Goal::Strength));
        assert!(prompt.contains("PERSONAL RECORDS (exercise -> best load):\nN/A"));
        assert!(prompt.contains("PREVIOUS PULL SESSIONS:\nNone"));
    }

    #[test]
    fn test_empty_context_still_uses_placeholders() {
        let req = request(DayType::Legs, Goal::Endurance)
            .with_prs(BTreeMap::new())
            .with_history(Vec::new());
        let prompt = build_prompt(&req);
        assert!(prompt.contains(NO_PRS));
        assert!(prompt.contains(NO_HISTORY));
    }

    #[test]
    fn test_context_is_serialized() {
        let mut prs = BTreeMap::new();
        prs.insert("Bench Press".to_string(), "100 x 5".to_string());
        let req = request(DayType::Push, Goal::Hypertrophy)
            .with_prs(prs)
            .with_history(vec![sample_row("2024-05-28", "Push", "Incline Press")]);

        let prompt = build_prompt(&req);
        assert!(prompt.contains(r#"{"Bench Press":"100 x 5"}"#));
        assert!(prompt.contains(r#""exercise":"Incline Press""#));
        assert!(!prompt.contains("\nN/A\n"));
    }

    #[test]
    fn test_lists_every_required_field() {
        let prompt = build_prompt(&request(DayType::Push, Goal::Hypertrophy));
        for (field, _) in REQUIRED_FIELDS {
            assert!(prompt.contains(field), "prompt should mention {}", field);
        }
        assert!(prompt.contains("Exactly 5 exercises"));
    }
}
