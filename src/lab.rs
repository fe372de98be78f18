//! Lab - the generate / log / edit cycle behind every user action
//!
//! `Logbook` wraps the store alone, so history, deletes and PR commands
//! work without generation credentials. `Lab` adds the client on top.
//! Nothing is cached between calls; every read goes to the store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::client::{GenerationClient, RetryPolicy, complete_with_retry};
use crate::db::{LogSink, PrBaseline, PrStore, WorkoutLogRow};
use crate::error::{LabError, Result};
use crate::exercises::{DayType, GeneratedWorkout, Goal, WorkoutRequest};
use crate::mapper::{RowEdit, map_workout};
use crate::normalize::normalize;
use crate::prompt::build_prompt;

/// Parse a user-supplied `YYYY-MM-DD` date
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| {
            LabError::invalid_input(format!("invalid date '{}', expected YYYY-MM-DD", date))
        })
}

fn sort_key(row: &WorkoutLogRow) -> (Option<NaiveDate>, String) {
    (row.date_naive(), row.date.clone())
}

/// Store-side operations: history, edits, deletes, PR baselines
pub struct Logbook<S> {
    sink: S,
}

impl<S> Logbook<S>
where
    S: LogSink + PrStore,
{
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Validated append
    pub async fn append(&self, rows: &[WorkoutLogRow]) -> Result<()> {
        for row in rows {
            row.validate()?;
        }
        self.sink.append(rows).await
    }

    /// Rows of the `n` most recent dates for `day_type`, by date then exercise
    pub async fn previous_workouts(
        &self,
        day_type: DayType,
        n: usize,
    ) -> Result<Vec<WorkoutLogRow>> {
        let rows: Vec<WorkoutLogRow> = self
            .sink
            .read_all()
            .await?
            .into_iter()
            .filter(|r| r.workout_type.trim().eq_ignore_ascii_case(day_type.as_str()))
            .collect();

        let dates: BTreeSet<(Option<NaiveDate>, String)> = rows.iter().map(sort_key).collect();
        let latest: BTreeSet<String> = dates.into_iter().rev().take(n).map(|(_, d)| d).collect();

        let mut recent: Vec<WorkoutLogRow> =
            rows.into_iter().filter(|r| latest.contains(&r.date)).collect();
        recent.sort_by(|a, b| {
            sort_key(a)
                .cmp(&sort_key(b))
                .then_with(|| a.exercise.cmp(&b.exercise))
        });
        Ok(recent)
    }

    pub async fn rows_for_date(&self, date: &str) -> Result<Vec<WorkoutLogRow>> {
        let date = date.trim();
        Ok(self
            .sink
            .read_all()
            .await?
            .into_iter()
            .filter(|r| r.date.trim() == date)
            .collect())
    }

    /// Remove every row dated `date`; returns how many went
    pub async fn delete_date(&self, date: &str) -> Result<usize> {
        let date = parse_date(date)?.format("%Y-%m-%d").to_string();
        let all = self.sink.read_all().await?;
        let before = all.len();
        let kept: Vec<WorkoutLogRow> = all.into_iter().filter(|r| r.date.trim() != date).collect();
        let removed = before - kept.len();

        if removed == 0 {
            info!(%date, "nothing to delete");
            return Ok(0);
        }

        self.sink.replace(&kept).await?;
        info!(%date, removed, "deleted rows");
        Ok(removed)
    }

    /// Swap the `day_type` rows on `dates` for `edited`, then rewrite the
    /// log sorted by date
    pub async fn save_edits(
        &self,
        day_type: DayType,
        dates: &[String],
        edited: Vec<WorkoutLogRow>,
    ) -> Result<()> {
        for row in &edited {
            row.validate()?;
        }

        let mut rows: Vec<WorkoutLogRow> = self
            .sink
            .read_all()
            .await?
            .into_iter()
            .filter(|r| {
                !(r.workout_type.trim().eq_ignore_ascii_case(day_type.as_str())
                    && dates.iter().any(|d| d.trim() == r.date.trim()))
            })
            .collect();
        rows.extend(edited);
        rows.sort_by_key(sort_key);

        self.sink.replace(&rows).await?;
        info!(day = %day_type, dates = dates.len(), total = rows.len(), "saved edits");
        Ok(())
    }

    /// Change or drop `exercise` in the `day_type` session on `date`.
    /// Returns how many rows matched.
    pub async fn edit_exercise(
        &self,
        day_type: DayType,
        date: &str,
        exercise: &str,
        edit: &RowEdit,
        remove: bool,
    ) -> Result<usize> {
        if !remove && edit.is_empty() {
            return Err(LabError::invalid_input("nothing to change"));
        }
        edit.validate()?;

        let date = parse_date(date)?.format("%Y-%m-%d").to_string();
        let mut session: Vec<WorkoutLogRow> = self
            .rows_for_date(&date)
            .await?
            .into_iter()
            .filter(|r| r.workout_type.trim().eq_ignore_ascii_case(day_type.as_str()))
            .collect();
        if session.is_empty() {
            return Err(LabError::invalid_input(format!(
                "no {} session logged on {}",
                day_type, date
            )));
        }

        let target = exercise.trim();
        let is_target = |r: &WorkoutLogRow| r.exercise.trim().eq_ignore_ascii_case(target);
        let matched = session.iter().filter(|&r| is_target(r)).count();
        if matched == 0 {
            return Err(LabError::invalid_input(format!(
                "no '{}' in the {} session on {}",
                target, day_type, date
            )));
        }

        if remove {
            session.retain(|r| !is_target(r));
        } else {
            for row in session.iter_mut() {
                if is_target(row) {
                    edit.apply(row);
                }
            }
        }

        self.save_edits(day_type, &[date], session).await?;
        Ok(matched)
    }

    /// Best load per exercise, ready for the prompt
    pub async fn pr_map(&self) -> Result<BTreeMap<String, String>> {
        let mut best: BTreeMap<String, PrBaseline> = BTreeMap::new();
        for pr in self.sink.list_prs().await? {
            let name = pr.exercise.trim().to_string();
            if name.is_empty() {
                continue;
            }
            match best.get(&name) {
                Some(current) if current.max_weight >= pr.max_weight => {}
                _ => {
                    best.insert(name, pr);
                }
            }
        }
        Ok(best.into_iter().map(|(name, pr)| (name, pr.load())).collect())
    }

    pub async fn list_prs(&self) -> Result<Vec<PrBaseline>> {
        self.sink.list_prs().await
    }

    pub async fn add_pr(&self, pr: &PrBaseline) -> Result<()> {
        if pr.exercise.trim().is_empty() {
            return Err(LabError::invalid_input("exercise name is empty"));
        }
        if pr.reps < 1 || !pr.max_weight.is_finite() || pr.max_weight < 0.0 {
            return Err(LabError::invalid_input("weight must be >= 0 and reps >= 1"));
        }
        self.sink.add_pr(pr).await?;
        info!(exercise = %pr.exercise, "PR added");
        Ok(())
    }
}

/// Generation plus logging
pub struct Lab<C, S> {
    client: C,
    book: Logbook<S>,
    retry: RetryPolicy,
}

impl<C, S> Lab<C, S>
where
    C: GenerationClient,
    S: LogSink + PrStore,
{
    pub fn new(client: C, sink: S) -> Self {
        Self {
            client,
            book: Logbook::new(sink),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn book(&self) -> &Logbook<S> {
        &self.book
    }

    /// Request with PR and history context pulled from the store
    pub async fn build_request(
        &self,
        day_type: DayType,
        goal: Goal,
        date: NaiveDate,
        history_sessions: usize,
    ) -> Result<WorkoutRequest> {
        let mut req = WorkoutRequest::new(day_type, goal, date);

        let prs = self.book.pr_map().await?;
        if !prs.is_empty() {
            req = req.with_prs(prs);
        }

        if history_sessions > 0 {
            let history = self.book.previous_workouts(day_type, history_sessions).await?;
            if !history.is_empty() {
                req = req.with_history(history);
            }
        }

        Ok(req)
    }

    /// Prompt, call the model, normalize. Nothing is written.
    pub async fn generate(&self, req: &WorkoutRequest) -> Result<GeneratedWorkout> {
        let prompt = build_prompt(req);
        let text = complete_with_retry(&self.client, &prompt, &self.retry).await?;
        let workout = normalize(&text).inspect_err(|e| {
            warn!(error = %e, "model output rejected");
        })?;

        info!(
            day = %req.day_type,
            goal = %req.goal,
            exercises = workout.exercises.len(),
            "workout generated"
        );
        Ok(workout)
    }

    /// Map and append. On any mapping error nothing is appended.
    pub async fn log_workout(
        &self,
        req: &WorkoutRequest,
        workout: &GeneratedWorkout,
        notes: &[String],
    ) -> Result<Vec<WorkoutLogRow>> {
        let rows = map_workout(req, workout, notes)?;
        self.book.append(&rows).await?;
        info!(workout_id = %req.workout_id(), rows = rows.len(), "workout logged");
        Ok(rows)
    }
}
