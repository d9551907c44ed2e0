use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::error::ReportError;
use crate::level::GridPattern;
use crate::report::{ResultReporter, SessionSummary};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS session_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        finished_at TEXT NOT NULL,
        grid_cols INTEGER NOT NULL,
        grid_rows INTEGER NOT NULL,
        correct_count INTEGER NOT NULL,
        incorrect_count INTEGER NOT NULL,
        attempts_used INTEGER NOT NULL,
        max_speed_achieved INTEGER NOT NULL,
        accuracy_percent INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_session_results_finished_at
        ON session_results(finished_at);
"#;

/// A summary as persisted, with the moment it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResult {
    pub finished_at: DateTime<Local>,
    #[serde(flatten)]
    pub summary: SessionSummary,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    finished_at: String,
    grid: String,
    correct_count: u32,
    incorrect_count: u32,
    attempts_used: u32,
    max_speed_achieved: u32,
    accuracy_percent: u32,
}

/// Session history backed by SQLite.
#[derive(Debug)]
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Opens the store at the default state location.
    pub fn new() -> Result<Self, ReportError> {
        let path = AppDirs::db_path().unwrap_or_else(|| "flashword_results.db".into());
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ReportError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ReportError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn record(&self, summary: &SessionSummary) -> Result<(), ReportError> {
        self.record_at(summary, Local::now())
    }

    /// Timestamps are stored as UTC so rows sort chronologically across
    /// offset changes.
    pub fn record_at<Tz: TimeZone>(
        &self,
        summary: &SessionSummary,
        finished_at: DateTime<Tz>,
    ) -> Result<(), ReportError> {
        self.conn.execute(
            r#"
            INSERT INTO session_results
            (finished_at, grid_cols, grid_rows, correct_count, incorrect_count,
             attempts_used, max_speed_achieved, accuracy_percent)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                finished_at
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                summary.grid_pattern.cols,
                summary.grid_pattern.rows,
                summary.correct_count,
                summary.incorrect_count,
                summary.attempts_used,
                summary.max_speed_achieved,
                summary.accuracy_percent,
            ],
        )?;
        debug!(max_speed = summary.max_speed_achieved, "session result stored");
        Ok(())
    }

    /// Most recent results first.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredResult>, ReportError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT finished_at, grid_cols, grid_rows, correct_count, incorrect_count,
                   attempts_used, max_speed_achieved, accuracy_percent
            FROM session_results
            ORDER BY finished_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let timestamp_str: String = row.get(0)?;
            let finished_at = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "finished_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(StoredResult {
                finished_at,
                summary: SessionSummary {
                    grid_pattern: GridPattern::new(row.get(1)?, row.get(2)?),
                    correct_count: row.get(3)?,
                    incorrect_count: row.get(4)?,
                    attempts_used: row.get(5)?,
                    max_speed_achieved: row.get(6)?,
                    accuracy_percent: row.get(7)?,
                },
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Fastest pace ever reached on a grid pattern.
    pub fn best_speed(&self, pattern: GridPattern) -> Result<Option<u32>, ReportError> {
        let best: Option<u32> = self
            .conn
            .query_row(
                r#"
                SELECT MAX(max_speed_achieved) FROM session_results
                WHERE grid_cols = ?1 AND grid_rows = ?2
                "#,
                params![pattern.cols, pattern.rows],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()?
            .flatten();
        Ok(best)
    }

    pub fn count(&self) -> Result<usize, ReportError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM session_results", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Clear all results (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<(), ReportError> {
        self.conn.execute("DELETE FROM session_results", [])?;
        Ok(())
    }

    /// Writes the full history, oldest first, as CSV with a header row.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, ReportError> {
        let mut results = self.recent(usize::MAX >> 1)?;
        results.reverse();

        let mut csv = csv::Writer::from_writer(writer);
        for result in &results {
            csv.serialize(CsvRow {
                finished_at: result.finished_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                grid: result.summary.grid_pattern.to_string(),
                correct_count: result.summary.correct_count,
                incorrect_count: result.summary.incorrect_count,
                attempts_used: result.summary.attempts_used,
                max_speed_achieved: result.summary.max_speed_achieved,
                accuracy_percent: result.summary.accuracy_percent,
            })?;
        }
        csv.flush()?;
        Ok(results.len())
    }
}

impl ResultReporter for ResultStore {
    fn report(&mut self, summary: &SessionSummary) -> Result<(), ReportError> {
        self.record(summary)
    }
}
