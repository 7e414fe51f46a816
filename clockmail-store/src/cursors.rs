//! Per-agent receive watermarks.
//!
//! A cursor is the Lamport timestamp strictly below which the agent has
//! consumed every message targeted to it. Only the session layer moves it,
//! after a successful drain.

use crate::{query_err, Store};
use clockmail_core::StorageError;
use rusqlite::{params, OptionalExtension};

impl Store {
    /// Stored receive cursor for an agent; 0 when never set.
    pub fn get_cursor(&self, agent_id: &str) -> Result<i64, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT since_ts FROM cursors WHERE agent_id = ?1",
                params![agent_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)
            .map(|v| v.unwrap_or(0))
        })
    }

    /// Advance (or rewind) the receive cursor for an agent.
    pub fn set_cursor(&self, agent_id: &str, since_ts: i64) -> Result<(), StorageError> {
        self.with_write_retry(|conn| {
            conn.execute(
                "INSERT INTO cursors (agent_id, since_ts) VALUES (?1, ?2)
                 ON CONFLICT(agent_id) DO UPDATE SET since_ts = excluded.since_ts",
                params![agent_id, since_ts],
            )
            .map_err(query_err)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_cursor_reads_zero() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_cursor("alice").unwrap(), 0);
    }

    #[test]
    fn test_set_then_get() {
        let store = Store::open_in_memory().unwrap();
        store.register_agent("alice").unwrap();
        store.set_cursor("alice", 17).unwrap();
        assert_eq!(store.get_cursor("alice").unwrap(), 17);
        store.set_cursor("alice", 42).unwrap();
        assert_eq!(store.get_cursor("alice").unwrap(), 42);
    }
}
