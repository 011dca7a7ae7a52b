use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, Params, Row};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::session::{GameMode, SessionResult};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS aim_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        mode TEXT NOT NULL,
        movement TEXT NOT NULL,
        score INTEGER NOT NULL,
        total_clicks INTEGER NOT NULL,
        accuracy REAL NOT NULL,
        duration_ms REAL NOT NULL,
        avg_time_per_target_ms REAL NOT NULL,
        recorded_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_aim_results_mode ON aim_results(mode);
    CREATE INDEX IF NOT EXISTS idx_aim_results_recorded_at ON aim_results(recorded_at);
"#;

const SELECT_ENTRIES: &str = r#"
    SELECT id, mode, movement, score, total_clicks, accuracy, duration_ms,
           avg_time_per_target_ms, recorded_at
    FROM aim_results
"#;

/// A stored run.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub recorded_at: DateTime<Local>,
    pub result: SessionResult,
}

/// Aggregates over every stored run of one mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeSummary {
    pub runs: i64,
    pub best_score: Option<u32>,
    /// Fastest average time per target among runs with at least one hit.
    pub best_avg_time_ms: Option<f64>,
    pub mean_accuracy: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    id: i64,
    recorded_at: String,
    mode: String,
    movement: String,
    score: u32,
    total_clicks: u32,
    accuracy: f64,
    duration_ms: f64,
    avg_time_per_target_ms: f64,
}

/// Sqlite-backed store of finished runs.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Opens the database at the default state location.
    pub fn new() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("flick_history.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Stores a finished run and returns its row id.
    ///
    /// Timestamps are stored as fixed-width UTC text, so the column sorts
    /// chronologically whatever offset a run was recorded under.
    pub fn record(
        &self,
        result: &SessionResult,
        recorded_at: impl Into<DateTime<Utc>>,
    ) -> Result<i64> {
        let recorded_at: DateTime<Utc> = recorded_at.into();
        self.conn.execute(
            r#"
            INSERT INTO aim_results
            (mode, movement, score, total_clicks, accuracy, duration_ms, avg_time_per_target_ms, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                result.mode.to_string(),
                result.movement.to_string(),
                result.score,
                result.total_clicks,
                result.accuracy,
                result.duration_ms,
                result.avg_time_per_target_ms,
                recorded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, score = result.score, "recorded run");
        Ok(id)
    }

    /// Most recent runs first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_entries(
            &format!("{SELECT_ENTRIES} ORDER BY recorded_at DESC, id DESC LIMIT ?1"),
            [limit],
        )
    }

    /// Every stored run, oldest first.
    pub fn all(&self) -> Result<Vec<HistoryEntry>> {
        self.query_entries(
            &format!("{SELECT_ENTRIES} ORDER BY recorded_at ASC, id ASC"),
            [],
        )
    }

    fn query_entries<P: Params>(&self, sql: &str, params: P) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, entry_from_row)?;
        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Consecutive days with at least one run, counted back from `today`.
    ///
    /// A streak stays alive through the day after the last run: with no run
    /// yet today, a run yesterday still counts. Days are local calendar days.
    pub fn streak(&self, today: NaiveDate) -> Result<u32> {
        let mut stmt = self.conn.prepare("SELECT recorded_at FROM aim_results")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut days = BTreeSet::new();
        for text in rows {
            days.insert(parse_timestamp(&text?, 0)?.date_naive());
        }
        Ok(consecutive_days(&days, today))
    }

    pub fn summary(&self, mode: GameMode) -> Result<ModeSummary> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                COUNT(*),
                MAX(score),
                MIN(CASE WHEN score > 0 THEN avg_time_per_target_ms END),
                AVG(accuracy)
            FROM aim_results
            WHERE mode = ?1
            "#,
        )?;

        let summary = stmt.query_row([mode.to_string()], |row| {
            Ok(ModeSummary {
                runs: row.get(0)?,
                best_score: row.get(1)?,
                best_avg_time_ms: row.get(2)?,
                mean_accuracy: row.get(3)?,
            })
        })?;
        Ok(summary)
    }

    pub fn count(&self) -> Result<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM aim_results", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM aim_results", [])?;
        Ok(())
    }

    /// Writes every stored run as CSV, oldest first. Returns the row count.
    pub fn export_csv<W: Write>(&self, out: W) -> Result<usize> {
        let entries = self.all()?;

        let mut writer = csv::Writer::from_writer(out);
        for entry in &entries {
            writer.serialize(CsvRow {
                id: entry.id,
                recorded_at: entry.recorded_at.to_rfc3339(),
                mode: entry.result.mode.to_string(),
                movement: entry.result.movement.to_string(),
                score: entry.result.score,
                total_clicks: entry.result.total_clicks,
                accuracy: entry.result.accuracy,
                duration_ms: entry.result.duration_ms,
                avg_time_per_target_ms: entry.result.avg_time_per_target_ms,
            })?;
        }
        writer.flush()?;
        Ok(entries.len())
    }
}

fn invalid_text(col: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(col, name.to_string(), rusqlite::types::Type::Text)
}

fn parse_timestamp(text: &str, col: usize) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Local))
        .map_err(|_| invalid_text(col, "recorded_at"))
}

fn consecutive_days(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(&last) = days.range(..=today).next_back() else {
        return 0;
    };
    if (today - last).num_days() > 1 {
        return 0;
    }

    let mut count = 0;
    let mut day = Some(last);
    while let Some(d) = day.filter(|d| days.contains(d)) {
        count += 1;
        day = d.pred_opt();
    }
    count
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let mode: String = row.get(1)?;
    let movement: String = row.get(2)?;
    let recorded_at = parse_timestamp(&row.get::<_, String>(8)?, 8)?;

    Ok(HistoryEntry {
        id: row.get(0)?,
        recorded_at,
        result: SessionResult {
            mode: mode.parse().map_err(|_| invalid_text(1, "mode"))?,
            movement: movement.parse().map_err(|_| invalid_text(2, "movement"))?,
            score: row.get(3)?,
            total_clicks: row.get(4)?,
            accuracy: row.get(5)?,
            duration_ms: row.get(6)?,
            avg_time_per_target_ms: row.get(7)?,
        },
    })
}
