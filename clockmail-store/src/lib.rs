//! Clockmail Store - SQLite Persistence
//!
//! SQLite in WAL mode serves as the broadcast medium: instead of Lamport's
//! all-to-all message passing, agents read and write a shared database.
//! The database IS the communication channel.
//!
//! ## Tables
//!
//! - `agents` - per-agent clock and working position (single-writer rows)
//! - `events` - the append-only event log, ordered by (lamport_ts, id)
//! - `locks` - active file reservations, keyed by (path, agent_id)
//! - `cursors` - per-agent receive watermarks

mod agents;
mod cursors;
mod events;
mod locks;
mod retry;
mod schema;

pub use events::NewEvent;
pub use locks::LockDecision;
pub use retry::with_retry;

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use clockmail_core::{StorageError, StoreConfig, Timestamp};
use rusqlite::Connection;
use tracing::debug;

/// Handle to the shared coordination database.
///
/// One `Store` per session. Cross-process safety comes from SQLite's
/// transaction model plus the retry policy on transient contention; the
/// in-process mutex only serializes the handful of statements a single
/// session runs.
pub struct Store {
    conn: Mutex<Connection>,
    config: StoreConfig,
}

impl Store {
    /// Open (or create) the database at the configured path and initialize
    /// the schema. The parent directory is created if missing.
    pub fn open(config: StoreConfig) -> Result<Self, StorageError> {
        let path = Path::new(&config.db_path);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| StorageError::OpenFailed {
                    path: config.db_path.clone(),
                    reason: e.to_string(),
                })?;
            }
        }

        debug!(path = %config.db_path, "opening coordination database");
        let conn = Connection::open(path).map_err(|e| StorageError::OpenFailed {
            path: config.db_path.clone(),
            reason: e.to_string(),
        })?;

        Self::from_connection(conn, config)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::OpenFailed {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_connection(conn, StoreConfig::default())
    }

    fn from_connection(conn: Connection, config: StoreConfig) -> Result<Self, StorageError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StorageError::OpenFailed {
                path: config.db_path.clone(),
                reason: e.to_string(),
            })?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StorageError::OpenFailed {
                path: config.db_path.clone(),
                reason: e.to_string(),
            })?;
        conn.busy_timeout(config.busy_timeout)
            .map_err(|e| StorageError::OpenFailed {
                path: config.db_path.clone(),
                reason: e.to_string(),
            })?;

        let store = Self {
            conn: Mutex::new(conn),
            config,
        };
        store.with_conn(schema::init_schema)?;
        Ok(store)
    }

    /// Run a read against the connection.
    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("connection lock poisoned: {}", e),
            })?;
        f(&conn)
    }

    /// Run a write (or transaction) with exclusive access.
    pub(crate) fn with_conn_mut<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("connection lock poisoned: {}", e),
            })?;
        f(&mut conn)
    }

    /// Run a write under the transient-contention retry policy.
    pub(crate) fn with_write_retry<F, T>(&self, mut f: F) -> Result<T, StorageError>
    where
        F: FnMut(&mut Connection) -> Result<T, StorageError>,
    {
        let retry = self.config.retry.clone();
        retry::with_retry(&retry, || self.with_conn_mut(&mut f))
    }
}

pub(crate) fn query_err(e: rusqlite::Error) -> StorageError {
    StorageError::QueryFailed {
        reason: e.to_string(),
    }
}

/// Format a wall-clock time the way every persisted column stores it:
/// RFC 3339 with nanosecond precision, UTC.
pub(crate) fn fmt_ts(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a persisted wall-clock time back to the same instant.
pub(crate) fn parse_ts(value: &str, context: &str) -> Result<Timestamp, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::TimestampParse {
            context: context.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_roundtrip_nanosecond_precision() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let encoded = fmt_ts(ts);
        let decoded = parse_ts(&encoded, "test").unwrap();
        assert_eq!(ts, decoded);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_ts("not-a-time", "test"),
            Err(StorageError::TimestampParse { .. })
        ));
    }

    #[test]
    fn test_open_in_memory_initializes_schema() {
        let store = Store::open_in_memory().unwrap();
        // Schema is live: a fresh database lists no agents.
        assert!(store.list_agents().unwrap().is_empty());
        assert_eq!(store.count_events().unwrap(), 0);
    }
}
