//! SQLite storage for the workout log

use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use super::{LogSink, PrBaseline, PrStore, WorkoutLogRow};
use crate::error::Result;

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS workout_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id TEXT NOT NULL,
                date TEXT NOT NULL,
                workout_type TEXT NOT NULL,
                exercise TEXT NOT NULL,
                primary_muscle TEXT NOT NULL DEFAULT '',
                target_muscle_detail TEXT NOT NULL DEFAULT '',
                sets INTEGER NOT NULL,
                reps TEXT NOT NULL,
                weight TEXT NOT NULL,
                superset_group_id INTEGER NOT NULL DEFAULT 1,
                notes TEXT NOT NULL DEFAULT ''
            )",
            [],
        )?;

        // Migration: logs created before muscle and superset tracking
        for (column, ddl) in [
            (
                "primary_muscle",
                "ALTER TABLE workout_log ADD COLUMN primary_muscle TEXT NOT NULL DEFAULT ''",
            ),
            (
                "target_muscle_detail",
                "ALTER TABLE workout_log ADD COLUMN target_muscle_detail TEXT NOT NULL DEFAULT ''",
            ),
            (
                "superset_group_id",
                "ALTER TABLE workout_log ADD COLUMN superset_group_id INTEGER NOT NULL DEFAULT 1",
            ),
        ] {
            let present = self
                .conn
                .prepare(&format!("SELECT {} FROM workout_log LIMIT 1", column))
                .is_ok();
            if !present {
                info!(column, "migrating workout_log");
                self.conn.execute(ddl, [])?;
            }
        }

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS pr_baseline (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exercise TEXT NOT NULL,
                max_weight REAL NOT NULL,
                reps INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn insert_rows(conn: &Connection, rows: &[WorkoutLogRow]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO workout_log (workout_id, date, workout_type, exercise, primary_muscle, target_muscle_detail, sets, reps, weight, superset_group_id, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for row in rows {
            row.validate()?;
            stmt.execute(params![
                row.workout_id,
                row.date,
                row.workout_type,
                row.exercise,
                row.primary_muscle,
                row.target_muscle_detail,
                row.sets,
                row.reps,
                row.weight,
                row.superset_group_id,
                row.notes,
            ])?;
        }
        Ok(())
    }

    /// Append rows in one transaction
    pub fn append_rows(&self, rows: &[WorkoutLogRow]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::insert_rows(&tx, rows)?;
        tx.commit()?;
        info!(count = rows.len(), "appended rows to workout_log");
        Ok(())
    }

    /// Delete everything and insert `rows`. Rolls back as a whole on failure.
    pub fn replace_rows(&self, rows: &[WorkoutLogRow]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM workout_log", [])?;
        Self::insert_rows(&tx, rows)?;
        tx.commit()?;
        info!(count = rows.len(), "rewrote workout_log");
        Ok(())
    }

    /// Get all rows in insertion order
    pub fn get_rows(&self) -> Result<Vec<WorkoutLogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT workout_id, date, workout_type, exercise, primary_muscle, target_muscle_detail, sets, reps, weight, superset_group_id, notes FROM workout_log ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map([], row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn add_pr_baseline(&self, pr: &PrBaseline) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pr_baseline (exercise, max_weight, reps) VALUES (?1, ?2, ?3)",
            params![pr.exercise, pr.max_weight, pr.reps],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_pr_baselines(&self) -> Result<Vec<PrBaseline>> {
        let mut stmt = self
            .conn
            .prepare("SELECT exercise, max_weight, reps FROM pr_baseline ORDER BY id ASC")?;

        let prs = stmt
            .query_map([], |row| {
                Ok(PrBaseline {
                    exercise: row.get(0)?,
                    max_weight: row.get(1)?,
                    reps: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(prs)
    }
}

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<WorkoutLogRow> {
    Ok(WorkoutLogRow {
        workout_id: row.get(0)?,
        date: row.get(1)?,
        workout_type: row.get(2)?,
        exercise: row.get(3)?,
        primary_muscle: row.get(4)?,
        target_muscle_detail: row.get(5)?,
        sets: row.get(6)?,
        reps: row.get(7)?,
        weight: row.get(8)?,
        superset_group_id: row.get(9)?,
        notes: row.get(10)?,
    })
}

impl LogSink for Database {
    async fn append(&self, rows: &[WorkoutLogRow]) -> Result<()> {
        self.append_rows(rows)
    }

    async fn replace(&self, rows: &[WorkoutLogRow]) -> Result<()> {
        self.replace_rows(rows)
    }

    async fn read_all(&self) -> Result<Vec<WorkoutLogRow>> {
        self.get_rows()
    }
}

impl PrStore for Database {
    async fn list_prs(&self) -> Result<Vec<PrBaseline>> {
        self.get_pr_baselines()
    }

    async fn add_pr(&self, pr: &PrBaseline) -> Result<()> {
        self.add_pr_baseline(pr).map(|_| ())
    }
}
