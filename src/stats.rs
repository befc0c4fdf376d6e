use crate::analytics::{AnalyticsSink, SessionSummary};
use crate::app_dirs::AppDirs;
use crate::error::AnalyticsError;
use crate::reference::Phoneme;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

/// Aggregate performance for one target sound
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSummary {
    pub sound: Phoneme,
    pub avg_success_rate: f64,
    pub sessions: i64,
}

/// SQLite store for session summaries
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database in the default state directory
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("sound_safari_stats.db"));
        Self::open(&db_path)
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {e}")),
                )
            })?;
        }

        Self::init(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                target_sound TEXT NOT NULL,
                sound_position TEXT NOT NULL,
                environment TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                creatures_shown INTEGER NOT NULL,
                correct_selections INTEGER NOT NULL,
                incorrect_selections INTEGER NOT NULL,
                success_rate_percent REAL NOT NULL,
                time_spent_seconds INTEGER NOT NULL,
                completed BOOLEAN NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_summaries_sound ON session_summaries(target_sound)",
            [],
        )?;

        Ok(StatsDb { conn })
    }

    pub fn record_summary(&self, summary: &SessionSummary, recorded_at: DateTime<Local>) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO session_summaries
            (target_sound, sound_position, environment, difficulty, creatures_shown,
             correct_selections, incorrect_selections, success_rate_percent,
             time_spent_seconds, completed, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                summary.target_sound.as_str(),
                summary.sound_position.to_string(),
                summary.environment,
                summary.difficulty,
                summary.creatures_shown,
                summary.correct_selections,
                summary.incorrect_selections,
                summary.success_rate_percent,
                summary.time_spent_seconds,
                summary.completed,
                recorded_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Number of recorded sessions; `completed_only` skips abandoned ones
    pub fn sessions_played(&self, completed_only: bool) -> Result<i64> {
        let sql = if completed_only {
            "SELECT COUNT(*) FROM session_summaries WHERE completed = 1"
        } else {
            "SELECT COUNT(*) FROM session_summaries"
        };
        self.conn.query_row(sql, [], |row| row.get(0))
    }

    /// Average success rate over completed sessions for a sound
    pub fn avg_success_rate(&self, sound: &Phoneme) -> Result<Option<f64>> {
        let mut stmt = self.conn.prepare(
            "SELECT AVG(success_rate_percent) FROM session_summaries WHERE target_sound = ?1 AND completed = 1",
        )?;

        stmt.query_row([sound.as_str()], |row| row.get(0))
    }

    /// Per-sound summary over completed sessions, weakest sound first
    pub fn sound_summary(&self) -> Result<Vec<SoundSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT target_sound, AVG(success_rate_percent), COUNT(*)
            FROM session_summaries
            WHERE completed = 1
            GROUP BY target_sound
            ORDER BY AVG(success_rate_percent) ASC, target_sound ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SoundSummary {
                sound: Phoneme::new(row.get::<_, String>(0)?),
                avg_success_rate: row.get(1)?,
                sessions: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Clear all statistics (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session_summaries", [])?;
        Ok(())
    }
}

impl AnalyticsSink for StatsDb {
    fn record(&mut self, summary: &SessionSummary) -> std::result::Result<(), AnalyticsError> {
        Ok(self.record_summary(summary, Local::now())?)
    }
}
