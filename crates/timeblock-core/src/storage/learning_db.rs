//! SQLite persistence for the learning store.
//!
//! Three tables mirror the store: duration estimates and time-of-day
//! preferences are upserted per key, reschedule events are append-only.
//! A missing keyword signature is stored as the empty string so that the
//! composite primary keys stay unique.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::learning::{
    DurationEstimate, LearningStore, RescheduleEvent, RescheduleReason, TimeOfDayPreference,
};

/// Current schema version.
const SCHEMA_VERSION: i32 = 1;

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(table: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table: table.into(),
            message: format!("bad timestamp '{value}': {e}"),
        })
}

fn signature_to_sql(signature: &Option<String>) -> &str {
    signature.as_deref().unwrap_or("")
}

fn signature_from_sql(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Row of `reschedule_events` before its text columns are decoded.
struct RawEvent {
    id: String,
    task_id: String,
    list_name: String,
    keyword_signature: Option<String>,
    reason: String,
    scheduled_start: String,
    scheduled_end: String,
    hour_of_day: u32,
    day_of_week: u32,
    timestamp: String,
}

impl RawEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            list_name: row.get(2)?,
            keyword_signature: row.get(3)?,
            reason: row.get(4)?,
            scheduled_start: row.get(5)?,
            scheduled_end: row.get(6)?,
            hour_of_day: row.get(7)?,
            day_of_week: row.get(8)?,
            timestamp: row.get(9)?,
        })
    }

    fn decode(self) -> Result<RescheduleEvent, DatabaseError> {
        const TABLE: &str = "reschedule_events";
        let reason = RescheduleReason::parse(&self.reason).ok_or_else(|| DatabaseError::CorruptRow {
            table: TABLE.into(),
            message: format!("unknown reason '{}'", self.reason),
        })?;
        Ok(RescheduleEvent {
            id: self.id,
            task_id: self.task_id,
            list_name: self.list_name,
            keyword_signature: self.keyword_signature.filter(|s| !s.is_empty()),
            reason,
            scheduled_start: parse_ts(TABLE, &self.scheduled_start)?,
            scheduled_end: parse_ts(TABLE, &self.scheduled_end)?,
            hour_of_day: self.hour_of_day,
            day_of_week: self.day_of_week,
            timestamp: parse_ts(TABLE, &self.timestamp)?,
        })
    }
}

const EVENT_COLUMNS: &str = "id, task_id, list_name, keyword_signature, reason, scheduled_start,
     scheduled_end, hour_of_day, day_of_week, timestamp";

/// SQLite database holding learned records.
pub struct LearningDb {
    conn: Connection,
}

impl LearningDb {
    /// Open the database at `<data_dir>/learning.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        Self::open_at(&data_dir()?.join("learning.db"))
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "opened learning database");
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn schema_version(&self) -> i32 {
        self.conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0))
            .unwrap_or_else(|e| {
                if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                    tracing::warn!(error = %e, "failed to read schema_version");
                }
                0
            })
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        let run = || -> rusqlite::Result<()> {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY
                );",
            )?;
            let current = self.schema_version();
            if current < 1 {
                self.migrate_v1()?;
            }
            if current < SCHEMA_VERSION {
                tracing::info!(from = current, to = SCHEMA_VERSION, "migrated learning database");
            }
            Ok(())
        };
        run().map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Migration v1: learning tables.
    fn migrate_v1(&self) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS duration_estimates (
                list_name         TEXT NOT NULL,
                keyword_signature TEXT NOT NULL DEFAULT '',
                samples           TEXT NOT NULL,
                average_minutes   REAL NOT NULL,
                PRIMARY KEY (list_name, keyword_signature)
            );

            CREATE TABLE IF NOT EXISTS time_preferences (
                list_name         TEXT NOT NULL,
                keyword_signature TEXT NOT NULL DEFAULT '',
                morning           REAL NOT NULL DEFAULT 0,
                afternoon         REAL NOT NULL DEFAULT 0,
                evening           REAL NOT NULL DEFAULT 0,
                sample_count      INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (list_name, keyword_signature)
            );

            CREATE TABLE IF NOT EXISTS reschedule_events (
                id                TEXT PRIMARY KEY,
                task_id           TEXT NOT NULL,
                list_name         TEXT NOT NULL,
                keyword_signature TEXT,
                reason            TEXT NOT NULL,
                scheduled_start   TEXT NOT NULL,
                scheduled_end     TEXT NOT NULL,
                hour_of_day       INTEGER NOT NULL,
                day_of_week       INTEGER NOT NULL,
                timestamp         TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reschedule_events_timestamp ON reschedule_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_reschedule_events_list_reason ON reschedule_events(list_name, reason);

            DELETE FROM schema_version;
            INSERT INTO schema_version (version) VALUES (1);",
        )?;
        tx.commit()
    }

    /// Read every table into a fresh [`LearningStore`].
    ///
    /// # Errors
    /// Returns an error if a query fails or a row cannot be decoded.
    pub fn load_store(&self) -> Result<LearningStore, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT list_name, keyword_signature, samples, average_minutes FROM duration_estimates",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;
        let mut durations = Vec::new();
        for row in rows {
            let (list_name, signature, samples, average_minutes) = row?;
            let samples: Vec<i64> =
                serde_json::from_str(&samples).map_err(|e| DatabaseError::CorruptRow {
                    table: "duration_estimates".into(),
                    message: e.to_string(),
                })?;
            durations.push(DurationEstimate {
                list_name,
                keyword_signature: signature_from_sql(signature),
                samples,
                average_minutes,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT list_name, keyword_signature, morning, afternoon, evening, sample_count
             FROM time_preferences",
        )?;
        let preferences = stmt
            .query_map([], |row| {
                Ok(TimeOfDayPreference {
                    list_name: row.get(0)?,
                    keyword_signature: signature_from_sql(row.get(1)?),
                    morning: row.get(2)?,
                    afternoon: row.get(3)?,
                    evening: row.get(4)?,
                    sample_count: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EVENT_COLUMNS} FROM reschedule_events ORDER BY timestamp"))?;
        let events = stmt
            .query_map([], RawEvent::from_row)?
            .map(|raw| -> Result<RescheduleEvent, CoreError> { Ok(raw?.decode()?) })
            .collect::<Result<Vec<_>, CoreError>>()?;

        tracing::debug!(
            durations = durations.len(),
            preferences = preferences.len(),
            events = events.len(),
            "loaded learning store"
        );
        Ok(LearningStore::from_parts(durations, preferences, events))
    }

    /// Write the store back in one transaction.
    ///
    /// Estimates and preferences replace their stored rows; events already
    /// present are left untouched.
    ///
    /// # Errors
    /// Returns an error if any statement fails; nothing is written then.
    pub fn save_store(&mut self, store: &LearningStore) -> Result<(), CoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO duration_estimates
                 (list_name, keyword_signature, samples, average_minutes)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for d in store.duration_estimates() {
                stmt.execute(params![
                    d.list_name,
                    signature_to_sql(&d.keyword_signature),
                    serde_json::to_string(&d.samples)?,
                    d.average_minutes,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO time_preferences
                 (list_name, keyword_signature, morning, afternoon, evening, sample_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for p in store.time_preferences() {
                stmt.execute(params![
                    p.list_name,
                    signature_to_sql(&p.keyword_signature),
                    p.morning,
                    p.afternoon,
                    p.evening,
                    p.sample_count,
                ])?;
            }

            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO reschedule_events ({EVENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ))?;
            for e in store.events() {
                stmt.execute(params![
                    e.id,
                    e.task_id,
                    e.list_name,
                    e.keyword_signature,
                    e.reason.as_str(),
                    fmt_ts(e.scheduled_start),
                    fmt_ts(e.scheduled_end),
                    e.hour_of_day,
                    e.day_of_week,
                    fmt_ts(e.timestamp),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Events with `start <= timestamp < end`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RescheduleEvent>, CoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM reschedule_events
             WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp"
        ))?;
        let events = stmt
            .query_map(params![fmt_ts(start), fmt_ts(end)], RawEvent::from_row)?
            .map(|raw| -> Result<RescheduleEvent, CoreError> { Ok(raw?.decode()?) })
            .collect::<Result<Vec<_>, CoreError>>()?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Task;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 18, 0, 0).unwrap()
    }

    fn sample_store() -> LearningStore {
        let mut store = LearningStore::new();
        let task = Task::new("t1", "Write report", "Work");
        store.record_completion(&task, Duration::minutes(40), now() - Duration::hours(6));
        for day in (1..=3).rev() {
            let at = now() - Duration::days(day);
            store.record_reschedule(&task, RescheduleReason::BadTime, at, at + Duration::minutes(30), at);
        }
        // "do it" has no keywords, so the event is list-level only
        let vague = Task::new("t2", "do it", "Work");
        store.record_reschedule(&vague, RescheduleReason::TooLong, now(), now(), now());
        store
    }

    #[test]
    fn migrate_is_idempotent() {
        let db = LearningDb::open_memory().unwrap();
        db.migrate().unwrap();
        assert_eq!(db.schema_version(), SCHEMA_VERSION);
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut db = LearningDb::open_memory().unwrap();
        let store = sample_store();
        db.save_store(&store).unwrap();

        let loaded = db.load_store().unwrap();
        assert_eq!(
            loaded.duration_estimates().collect::<Vec<_>>(),
            store.duration_estimates().collect::<Vec<_>>()
        );
        assert_eq!(
            loaded.time_preferences().collect::<Vec<_>>(),
            store.time_preferences().collect::<Vec<_>>()
        );
        assert_eq!(loaded.events(), store.events());
        assert!(loaded.events().iter().any(|e| e.keyword_signature.is_none()));
    }

    #[test]
    fn saving_twice_does_not_duplicate() {
        let mut db = LearningDb::open_memory().unwrap();
        let mut store = sample_store();
        db.save_store(&store).unwrap();

        store.record_completion(&Task::new("t1", "Write report", "Work"), Duration::minutes(50), now());
        db.save_store(&store).unwrap();

        let loaded = db.load_store().unwrap();
        assert_eq!(loaded.events().len(), 4);
        assert_eq!(loaded.duration_estimates().count(), 2);
        assert!(loaded.duration_estimates().all(|d| d.samples == vec![40, 50]));
    }

    #[test]
    fn events_between_is_half_open() {
        let mut db = LearningDb::open_memory().unwrap();
        db.save_store(&sample_store()).unwrap();

        let two_days = db.events_between(now() - Duration::days(2), now()).unwrap();
        assert_eq!(two_days.len(), 2);
        assert!(two_days.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let all = db
            .events_between(now() - Duration::days(30), now() + Duration::seconds(1))
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn corrupt_reason_is_reported() {
        let db = LearningDb::open_memory().unwrap();
        db.conn
            .execute(
                &format!(
                    "INSERT INTO reschedule_events ({EVENT_COLUMNS})
                     VALUES ('x', 't', 'Work', NULL, 'whenever', ?1, ?1, 9, 3, ?1)"
                ),
                params![fmt_ts(now())],
            )
            .unwrap();
        let err = db.load_store().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::CorruptRow { .. })
        ));
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning.db");
        {
            let mut db = LearningDb::open_at(&path).unwrap();
            db.save_store(&sample_store()).unwrap();
        }
        let reopened = LearningDb::open_at(&path).unwrap();
        assert_eq!(reopened.load_store().unwrap().events().len(), 4);
    }
}
