//! Row mapper - generated exercises to log rows
//!
//! The only place defaults are applied. Superset ids are checked per batch:
//! a group id nobody else shares is folded back to [`SUPERSET_NONE`].

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::db::WorkoutLogRow;
use crate::error::{LabError, Result};
use crate::exercises::{
    DEFAULT_WEIGHT, GeneratedExercise, GeneratedWorkout, SUPERSET_NONE, WorkoutRequest,
};

fn group_or_none(id: Option<i64>) -> i64 {
    match id {
        None | Some(0) => SUPERSET_NONE,
        Some(id) => id,
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Map one exercise. Superset pairing is not checked here.
pub fn map_exercise(req: &WorkoutRequest, ex: &GeneratedExercise, notes: &str) -> WorkoutLogRow {
    WorkoutLogRow {
        workout_id: req.workout_id(),
        date: req.date_string(),
        workout_type: req.day_type.to_string(),
        exercise: ex.name.trim().to_string(),
        primary_muscle: ex.primary_muscle.trim().to_string(),
        target_muscle_detail: non_empty_or(ex.target_muscle_detail.as_deref(), ""),
        sets: ex.sets,
        reps: ex.reps.trim().to_string(),
        weight: non_empty_or(ex.weight.as_deref(), DEFAULT_WEIGHT),
        superset_group_id: group_or_none(ex.superset_group_id),
        notes: notes.trim().to_string(),
    }
}

/// Map a whole workout. `notes[i]` belongs to exercise `i`; missing notes are empty.
pub fn map_workout(
    req: &WorkoutRequest,
    workout: &GeneratedWorkout,
    notes: &[String],
) -> Result<Vec<WorkoutLogRow>> {
    if notes.len() > workout.exercises.len() {
        warn!(
            notes = notes.len(),
            exercises = workout.exercises.len(),
            "more notes than exercises, extra notes dropped"
        );
    }

    let mut rows: Vec<WorkoutLogRow> = workout
        .exercises
        .iter()
        .enumerate()
        .map(|(i, ex)| map_exercise(req, ex, notes.get(i).map(String::as_str).unwrap_or("")))
        .collect();

    let mut group_sizes: HashMap<i64, usize> = HashMap::new();
    for row in &rows {
        *group_sizes.entry(row.superset_group_id).or_insert(0) += 1;
    }
    for row in rows.iter_mut() {
        if row.superset_group_id != SUPERSET_NONE && group_sizes[&row.superset_group_id] < 2 {
            warn!(
                exercise = %row.exercise,
                group = row.superset_group_id,
                "superset group has a single member, unpairing"
            );
            row.superset_group_id = SUPERSET_NONE;
        }
    }

    for row in &rows {
        row.validate()?;
    }
    Ok(rows)
}

/// Field overrides for an already logged exercise
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowEdit {
    pub sets: Option<u32>,
    pub reps: Option<String>,
    pub weight: Option<String>,
    /// Replaces the whole Notes cell, stored in canonical `SetNotes` form
    pub notes: Option<String>,
}

impl RowEdit {
    pub fn is_empty(&self) -> bool {
        *self == RowEdit::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sets == Some(0) {
            return Err(LabError::invalid_input("sets must be at least 1"));
        }
        if self.reps.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(LabError::invalid_input("reps can't be empty"));
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut WorkoutLogRow) {
        if let Some(sets) = self.sets {
            row.sets = sets;
        }
        if let Some(reps) = &self.reps {
            row.reps = reps.trim().to_string();
        }
        if let Some(weight) = &self.weight {
            row.weight = non_empty_or(Some(weight), DEFAULT_WEIGHT);
        }
        if let Some(notes) = &self.notes {
            row.notes = SetNotes::parse(notes).to_string();
        }
    }
}

/// Structured notes packed into the free-text Notes column as
/// `key=value` pairs joined with `; `, free comment last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetNotes {
    pub weight: Option<String>,
    pub reps: Option<String>,
    pub rpe: Option<String>,
    pub technique: Option<String>,
    pub fatigue: Option<String>,
    pub comment: Option<String>,
}

impl SetNotes {
    /// Lenient: unknown keys and bare text end up in `comment`
    pub fn parse(notes: &str) -> Self {
        let mut parsed = SetNotes::default();
        let mut comment: Vec<&str> = Vec::new();

        for part in notes.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                comment.push(part);
                continue;
            };
            let field = match key.trim().to_ascii_lowercase().as_str() {
                "weight" | "wt" => &mut parsed.weight,
                "reps" => &mut parsed.reps,
                "rpe" => &mut parsed.rpe,
                "technique" | "tech" => &mut parsed.technique,
                "fatigue" => &mut parsed.fatigue,
                _ => {
                    comment.push(part);
                    continue;
                }
            };
            let value = value.trim();
            if !value.is_empty() {
                *field = Some(value.to_string());
            }
        }

        if !comment.is_empty() {
            parsed.comment = Some(comment.join("; "));
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        *self == SetNotes::default()
    }
}

impl fmt::Display for SetNotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = [
            ("weight", &self.weight),
            ("reps", &self.reps),
            ("rpe", &self.rpe),
            ("technique", &self.technique),
            ("fatigue", &self.fatigue),
        ];
        let mut parts: Vec<String> = pairs
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| format!("{}={}", k, v.replace(';', ","))))
            .collect();
        if let Some(c) = &self.comment {
            parts.push(c.clone());
        }
        f.write_str(&parts.join("; "))
    }
}
