//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::normalizer::ConversionRequest;

use super::store::JobStore;
use super::types::{ConversionOutcome, JobError, JobRecord, JobState};

const SELECT_COLUMNS: &str =
    "id, created_at, updated_at, state, progress, request, result, failure_reason";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobError> {
        let conn = Connection::open(path).map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                state TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                request TEXT NOT NULL,
                result TEXT,
                failure_reason TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
            "#,
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(())
    }

    fn parse_state(raw: &str) -> JobState {
        match raw {
            "active" => JobState::Active,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Waiting,
        }
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
        let id: String = row.get(0)?;
        let created_at_str: String = row.get(1)?;
        let updated_at_str: String = row.get(2)?;
        let state_str: String = row.get(3)?;
        let progress: u8 = row.get(4)?;
        let request_json: String = row.get(5)?;
        let result_json: Option<String> = row.get(6)?;
        let failure_reason: Option<String> = row.get(7)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let request: ConversionRequest = serde_json::from_str(&request_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        let result: Option<ConversionOutcome> =
            result_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(JobRecord {
            id,
            created_at,
            updated_at,
            state: Self::parse_state(&state_str),
            progress,
            request,
            result,
            failure_reason,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<JobRecord, JobError> {
        let result = conn.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        );

        match result {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(JobError::NotFound(id.to_string())),
            Err(e) => Err(JobError::Database(e.to_string())),
        }
    }

    fn check_transition(record: &JobRecord, to: JobState) -> Result<(), JobError> {
        if !record.state.can_transition_to(to) {
            return Err(JobError::InvalidTransition {
                job_id: record.id.clone(),
                from: record.state,
                to,
            });
        }
        Ok(())
    }
}

impl JobStore for SqliteJobStore {
    fn create(&self, request: &ConversionRequest) -> Result<JobRecord, JobError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let request_json =
            serde_json::to_string(request).map_err(|e| JobError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO jobs (id, created_at, updated_at, state, progress, request) VALUES (?, ?, ?, ?, 0, ?)",
            params![
                id,
                now.to_rfc3339(),
                now.to_rfc3339(),
                JobState::Waiting.as_str(),
                request_json,
            ],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(JobRecord {
            id,
            created_at: now,
            updated_at: now,
            state: JobState::Waiting,
            progress: 0,
            request: request.clone(),
            result: None,
            failure_reason: None,
        })
    }

    fn get(&self, id: &str) -> Result<Option<JobRecord>, JobError> {
        let conn = self.conn.lock().unwrap();

        match Self::fetch(&conn, id) {
            Ok(record) => Ok(Some(record)),
            Err(JobError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self, limit: u32) -> Result<Vec<JobRecord>, JobError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM jobs ORDER BY created_at DESC LIMIT ?",
                SELECT_COLUMNS
            ))
            .map_err(|e| JobError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit], Self::row_to_record)
            .map_err(|e| JobError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            records.push(row_result.map_err(|e| JobError::Database(e.to_string()))?);
        }

        Ok(records)
    }

    fn delete(&self, id: &str) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM jobs WHERE id = ?", params![id])
            .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(())
    }

    fn mark_active(&self, id: &str) -> Result<JobRecord, JobError> {
        let conn = self.conn.lock().unwrap();

        let record = Self::fetch(&conn, id)?;
        Self::check_transition(&record, JobState::Active)?;

        let now = Utc::now();
        conn.execute(
            "UPDATE jobs SET state = ?, updated_at = ? WHERE id = ?",
            params![JobState::Active.as_str(), now.to_rfc3339(), id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(JobRecord {
            state: JobState::Active,
            updated_at: now,
            ..record
        })
    }

    fn set_progress(&self, id: &str, percent: u8) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();

        let percent = percent.min(100);
        // MAX keeps progress monotonic; the state guard keeps terminal and
        // waiting records untouched. Late or out-of-order writes are no-ops.
        conn.execute(
            "UPDATE jobs SET progress = MAX(progress, ?), updated_at = ? WHERE id = ? AND state = 'active'",
            params![percent, Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(())
    }

    fn complete(&self, id: &str, outcome: &ConversionOutcome) -> Result<JobRecord, JobError> {
        let conn = self.conn.lock().unwrap();

        let record = Self::fetch(&conn, id)?;
        Self::check_transition(&record, JobState::Completed)?;

        let now = Utc::now();
        let outcome_json =
            serde_json::to_string(outcome).map_err(|e| JobError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE jobs SET state = ?, progress = 100, result = ?, updated_at = ? WHERE id = ?",
            params![
                JobState::Completed.as_str(),
                outcome_json,
                now.to_rfc3339(),
                id
            ],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(JobRecord {
            state: JobState::Completed,
            progress: 100,
            result: Some(outcome.clone()),
            updated_at: now,
            ..record
        })
    }

    fn fail(&self, id: &str, reason: &str) -> Result<JobRecord, JobError> {
        let conn = self.conn.lock().unwrap();

        let record = Self::fetch(&conn, id)?;
        Self::check_transition(&record, JobState::Failed)?;

        let now = Utc::now();
        conn.execute(
            "UPDATE jobs SET state = ?, failure_reason = ?, updated_at = ? WHERE id = ?",
            params![JobState::Failed.as_str(), reason, now.to_rfc3339(), id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(JobRecord {
            state: JobState::Failed,
            failure_reason: Some(reason.to_string()),
            updated_at: now,
            ..record
        })
    }

    fn recover_interrupted(&self) -> Result<Vec<String>, JobError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE jobs SET state = 'waiting', updated_at = ? WHERE state = 'active'",
            params![Utc::now().to_rfc3339()],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare("SELECT id FROM jobs WHERE state = 'waiting' ORDER BY created_at ASC")
            .map_err(|e| JobError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| JobError::Database(e.to_string()))?;

        let mut ids = Vec::new();
        for row_result in rows {
            ids.push(row_result.map_err(|e| JobError::Database(e.to_string()))?);
        }

        Ok(ids)
    }
}
