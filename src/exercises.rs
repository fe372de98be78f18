//! Workout vocabulary - day types, goals and what the model hands back

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::WorkoutLogRow;
use crate::error::LabError;

/// Superset group id meaning "not part of a superset"
pub const SUPERSET_NONE: i64 = 1;

/// Weight prescribed when the model leaves it out
pub const DEFAULT_WEIGHT: &str = "Auto";

/// Which muscle groups a session targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DayType {
    Push,
    Pull,
    Legs,
}

impl DayType {
    pub fn all() -> &'static [DayType] {
        &[DayType::Push, DayType::Pull, DayType::Legs]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Push => "Push",
            DayType::Pull => "Pull",
            DayType::Legs => "Legs",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            DayType::Push => "💪",
            DayType::Pull => "🏋️",
            DayType::Legs => "🦵",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayType {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayType::all()
            .iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                LabError::invalid_input(format!("unknown day type '{}' (Push, Pull, Legs)", s))
            })
    }
}

/// Training goal, steers rep ranges and loading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Goal {
    Hypertrophy,
    Strength,
    Endurance,
}

impl Goal {
    pub fn all() -> &'static [Goal] {
        &[Goal::Hypertrophy, Goal::Strength, Goal::Endurance]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Hypertrophy => "Hypertrophy",
            Goal::Strength => "Strength",
            Goal::Endurance => "Endurance",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Goal {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Goal::all()
            .iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                LabError::invalid_input(format!(
                    "unknown goal '{}' (Hypertrophy, Strength, Endurance)",
                    s
                ))
            })
    }
}

/// One exercise as returned by the model.
///
/// Field names drift between model releases, so every field accepts the
/// aliases seen in the wild. Optional fields stay `None` here; defaults are
/// applied by the row mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExercise {
    #[serde(alias = "exercise", alias = "Exercise", alias = "exercise_name")]
    pub name: String,

    #[serde(alias = "muscle", alias = "Primary Muscle", alias = "primary_muscle_group")]
    pub primary_muscle: String,

    #[serde(
        default,
        alias = "target_detail",
        alias = "Target Muscle Detail",
        alias = "target_muscle",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_muscle_detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,

    #[serde(alias = "Sets", deserialize_with = "lenient_count")]
    pub sets: u32,

    #[serde(alias = "Reps", deserialize_with = "lenient_text")]
    pub reps: String,

    #[serde(
        default,
        alias = "Weight",
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,

    #[serde(
        default,
        alias = "superset_group",
        alias = "superset_id",
        alias = "Superset Group ID",
        deserialize_with = "lenient_opt_group",
        skip_serializing_if = "Option::is_none"
    )]
    pub superset_group_id: Option<i64>,
}

/// A complete generated session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratedWorkout {
    pub exercises: Vec<GeneratedExercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warm_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finisher: Option<String>,
}

impl GeneratedWorkout {
    pub fn new(exercises: Vec<GeneratedExercise>) -> Self {
        Self {
            exercises,
            warm_up: None,
            finisher: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// Exercises asked for when the caller doesn't say
pub const DEFAULT_EXERCISE_COUNT: usize = 5;

/// Everything needed to ask for one workout
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRequest {
    pub day_type: DayType,
    pub goal: Goal,
    pub date: NaiveDate,
    /// Exercise name -> best known load
    pub prs: Option<BTreeMap<String, String>>,
    /// Most recent sessions of the same day type
    pub history: Option<Vec<WorkoutLogRow>>,
    pub exercise_count: usize,
}

impl WorkoutRequest {
    pub fn new(day_type: DayType, goal: Goal, date: NaiveDate) -> Self {
        Self {
            day_type,
            goal,
            date,
            prs: None,
            history: None,
            exercise_count: DEFAULT_EXERCISE_COUNT,
        }
    }

    pub fn with_prs(mut self, prs: BTreeMap<String, String>) -> Self {
        self.prs = Some(prs);
        self
    }

    pub fn with_history(mut self, history: Vec<WorkoutLogRow>) -> Self {
        self.history = Some(history);
        self
    }

    /// `YYYYMMDD-<DayType>`. Two sessions of the same type on one day share it.
    pub fn workout_id(&self) -> String {
        format!("{}-{}", self.date.format("%Y%m%d"), self.day_type)
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Models emit counts as `3`, `3.0` or `"3"`
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let n = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.fract() == 0.0 && n >= 0.0 && n <= u32::MAX as f64 => Ok(n as u32),
        _ => Err(D::Error::custom(format!("expected a whole number, got {}", value))),
    }
}

/// Rep schemes are free text, but `10` sometimes arrives as a number
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected text, got {}", other))),
    }
}

fn lenient_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!("expected text, got {}", other))),
    }
}

fn lenient_opt_group<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let n = match &value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => return Ok(None),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(id) => return Ok(Some(id)),
            None => n.as_f64(),
        },
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 => Ok(Some(n as i64)),
        _ => Err(D::Error::custom(format!(
            "expected an integer group id, got {}",
            value
        ))),
    }
}
