//! Database module - the durable workout log and PR baselines
//!
//! Two interchangeable backends: a local SQLite file and a Google Sheets
//! spreadsheet. Both speak the same positional 11-column row schema.

pub mod sheets;
pub mod sqlite;

pub use sheets::{SheetsSink, sheet_key_from_url};
pub use sqlite::Database;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LabError, Result};
use crate::exercises::SUPERSET_NONE;

/// Worksheet / table holding the workout log
pub const WORKOUT_LOG: &str = "WorkoutLog";

/// Worksheet / table holding personal records
pub const PR_BASELINE: &str = "PR_Baseline";

/// Column order of the workout log. Stores write positional arrays,
/// so this order is the schema.
pub const LOG_HEADER: [&str; 11] = [
    "Workout ID",
    "Date",
    "Workout Type",
    "Exercise",
    "Primary Muscle",
    "Target Muscle Detail",
    "Sets",
    "Reps",
    "Weight",
    "Superset Group ID",
    "Notes",
];

pub const PR_HEADER: [&str; 3] = ["Exercise", "Max Weight", "Reps"];

/// One logged exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutLogRow {
    pub workout_id: String,
    pub date: String, // YYYY-MM-DD
    pub workout_type: String,
    pub exercise: String,
    pub primary_muscle: String,
    pub target_muscle_detail: String,
    pub sets: u32,
    pub reps: String,
    pub weight: String,
    pub superset_group_id: i64,
    pub notes: String,
}

impl WorkoutLogRow {
    /// Rows must carry a date and a workout type before they hit a store
    pub fn validate(&self) -> Result<()> {
        if self.date.trim().is_empty() {
            return Err(LabError::validation(format!("'{}' has no date", self.exercise)));
        }
        if self.workout_type.trim().is_empty() {
            return Err(LabError::validation(format!(
                "'{}' has no workout type",
                self.exercise
            )));
        }
        Ok(())
    }

    pub fn date_naive(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }

    pub fn is_superset(&self) -> bool {
        self.superset_group_id != SUPERSET_NONE && self.superset_group_id != 0
    }

    /// Cells in `LOG_HEADER` order
    pub fn to_cells(&self) -> Vec<serde_json::Value> {
        use serde_json::Value;
        vec![
            Value::from(self.workout_id.as_str()),
            Value::from(self.date.as_str()),
            Value::from(self.workout_type.as_str()),
            Value::from(self.exercise.as_str()),
            Value::from(self.primary_muscle.as_str()),
            Value::from(self.target_muscle_detail.as_str()),
            Value::from(self.sets),
            Value::from(self.reps.as_str()),
            Value::from(self.weight.as_str()),
            Value::from(self.superset_group_id),
            Value::from(self.notes.as_str()),
        ]
    }

    /// Parse a positional row. Short rows are padded with empty cells.
    pub fn from_cells(cells: &[String]) -> std::result::Result<Self, String> {
        let cell = |i: usize| cells.get(i).map(|s| s.trim()).unwrap_or("");

        let sets = cell(6)
            .parse::<u32>()
            .map_err(|_| format!("Sets '{}' is not a whole number", cell(6)))?;
        let superset_group_id = match cell(9) {
            "" => SUPERSET_NONE,
            v => v
                .parse::<i64>()
                .map_err(|_| format!("Superset Group ID '{}' is not an integer", v))?,
        };

        Ok(Self {
            workout_id: cell(0).to_string(),
            date: cell(1).to_string(),
            workout_type: cell(2).to_string(),
            exercise: cell(3).to_string(),
            primary_muscle: cell(4).to_string(),
            target_muscle_detail: cell(5).to_string(),
            sets,
            reps: cell(7).to_string(),
            weight: cell(8).to_string(),
            superset_group_id,
            notes: cell(10).to_string(),
        })
    }
}

/// Best known performance for an exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrBaseline {
    pub exercise: String,
    pub max_weight: f64,
    pub reps: u32,
}

impl PrBaseline {
    /// Load string handed to the prompt, e.g. "100 x 5"
    pub fn load(&self) -> String {
        format!("{} x {}", format_weight(self.max_weight), self.reps)
    }
}

fn format_weight(w: f64) -> String {
    if w.fract().abs() > f64::EPSILON {
        format!("{:.1}", w)
    } else {
        format!("{:.0}", w)
    }
}

/// Durable, append-only-or-rewrite store for workout rows
#[allow(async_fn_in_trait)]
pub trait LogSink {
    /// Add rows after the existing content, in order
    async fn append(&self, rows: &[WorkoutLogRow]) -> Result<()>;

    /// Swap the whole log for `rows`, header first when the store has one
    async fn replace(&self, rows: &[WorkoutLogRow]) -> Result<()>;

    /// Every row, in store order
    async fn read_all(&self) -> Result<Vec<WorkoutLogRow>>;
}

#[allow(async_fn_in_trait)]
pub trait PrStore {
    async fn list_prs(&self) -> Result<Vec<PrBaseline>>;
    async fn add_pr(&self, pr: &PrBaseline) -> Result<()>;
}

#[cfg(test)]
pub(crate) fn sample_row(date: &str, day: &str, exercise: &str) -> WorkoutLogRow {
    WorkoutLogRow {
        workout_id: format!("{}-{}", date.replace('-', ""), day),
        date: date.to_string(),
        workout_type: day.to_string(),
        exercise: exercise.to_string(),
        primary_muscle: "Chest".to_string(),
        target_muscle_detail: String::new(),
        sets: 3,
        reps: "8-12".to_string(),
        weight: "Auto".to_string(),
        superset_group_id: SUPERSET_NONE,
        notes: String::new(),
    }
}
