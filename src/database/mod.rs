//! # Database Module
//!
//! SQLite persistence behind a cloneable async handle.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Quota ledger moved into store transactions
//! - 1.1.0: Session table
//! - 1.0.0: Users, events, notices
//!
//! One connection, guarded by an async mutex; every operation that moves a
//! quota counter together with a row insert/delete runs inside an IMMEDIATE
//! transaction so the pair commits or rolls back as a unit.

mod events;
mod notices;
mod quota;
mod sessions;
mod users;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Type;
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::core::error::DomainError;
use crate::core::validate::{DATE_FORMAT, TIME_FORMAT};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    chat_id     INTEGER NOT NULL,
    event_quota INTEGER NOT NULL,
    utc_offset  INTEGER,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS events (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    date         TEXT NOT NULL,
    time         TEXT NOT NULL,
    name         TEXT NOT NULL,
    description  TEXT NOT NULL,
    notice_quota INTEGER NOT NULL,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS notices (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    date     TEXT NOT NULL,
    time     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_state (
    user_id   TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    window    TEXT NOT NULL,
    stage     TEXT NOT NULL,
    event_id  INTEGER,
    notice_id INTEGER
);

CREATE INDEX IF NOT EXISTS idx_events_owner ON events(owner_id);
CREATE INDEX IF NOT EXISTS idx_notices_event ON notices(event_id);
";

/// Cloneable handle to the SQLite store.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (creating if needed) the database file and apply the schema.
    pub async fn new(path: &str) -> Result<Self, DomainError> {
        Self::init(Connection::open(path)?)
    }

    /// Fresh in-memory database, used by tests and embedders.
    pub async fn open_in_memory() -> Result<Self, DomainError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DomainError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

// Column conversion helpers shared by the store submodules. Dates and times
// are stored as their user-typed text forms (YYYY-MM-DD, HH:MM).

pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn time_to_sql(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub(crate) fn date_col(raw: String, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn time_col(raw: String, idx: usize) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_applies_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let conn = db.conn.lock().await;
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'events', 'notices', 'user_state')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn test_column_conversions_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        assert_eq!(date_to_sql(date), "2026-09-01");
        assert_eq!(time_to_sql(time), "10:30");
        assert_eq!(date_col("2026-09-01".to_string(), 0).unwrap(), date);
        assert_eq!(time_col("10:30".to_string(), 0).unwrap(), time);
        assert!(date_col("garbage".to_string(), 0).is_err());
    }
}
