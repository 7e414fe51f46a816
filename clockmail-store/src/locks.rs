//! The lock arbiter.
//!
//! Acquisition resolves contention by the Lamport total order: the request
//! with the lower (lamport_ts, agent_id) wins, deterministically, with no
//! coordinator. The whole check-and-grant sequence runs inside one
//! transaction so two concurrent requests for the same path cannot race
//! past each other.

use crate::{fmt_ts, parse_ts, query_err, Store};
use chrono::Utc;
use clockmail_core::{total_order_less, Lock, StorageError};
use rusqlite::{params, OptionalExtension, Row};
use std::time::Duration;
use tracing::debug;

/// Outcome of an acquisition attempt. Exactly one of granted/denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    /// The requester holds the lock. `evicted` carries the previous
    /// holder's record when the grant displaced a later-ordered lock.
    Granted { lock: Lock, evicted: Option<Lock> },
    /// A lower-ordered holder keeps the lock.
    Denied { conflict: Lock },
}

struct LockRow {
    path: String,
    agent_id: String,
    lamport_ts: i64,
    epoch: i64,
    exclusive: i64,
    expires_at: String,
}

fn lock_from_row(row: &Row<'_>) -> Result<LockRow, rusqlite::Error> {
    Ok(LockRow {
        path: row.get(0)?,
        agent_id: row.get(1)?,
        lamport_ts: row.get(2)?,
        epoch: row.get(3)?,
        exclusive: row.get(4)?,
        expires_at: row.get(5)?,
    })
}

fn finish_lock(raw: LockRow) -> Result<Lock, StorageError> {
    let expires_at = parse_ts(&raw.expires_at, &format!("locks.expires_at[{}]", raw.path))?;
    Ok(Lock {
        path: raw.path,
        agent_id: raw.agent_id,
        lamport_ts: raw.lamport_ts,
        epoch: raw.epoch,
        exclusive: raw.exclusive != 0,
        expires_at,
    })
}

const LOCK_COLUMNS: &str = "path, agent_id, lamport_ts, epoch, exclusive, expires_at";

impl Store {
    /// Attempt to acquire a lock on `path`.
    ///
    /// A re-request by the current holder refreshes the TTL via upsert.
    /// When another agent holds an exclusive lock, the total order decides:
    /// a strictly lower (ts, agent) evicts the holder, anything else is
    /// denied with the conflicting record.
    pub fn acquire_lock(
        &self,
        path: &str,
        agent_id: &str,
        lamport_ts: i64,
        epoch: i64,
        exclusive: bool,
        ttl: Duration,
    ) -> Result<LockDecision, StorageError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());

        // Best-effort cleanup outside the transaction.
        self.purge_expired_locks();

        self.with_write_retry(|conn| {
            let tx = conn.transaction().map_err(|e| StorageError::TransactionFailed {
                reason: e.to_string(),
            })?;

            let conflict_raw = tx
                .query_row(
                    &format!(
                        "SELECT {} FROM locks
                         WHERE path = ?1 AND agent_id != ?2 AND exclusive = 1",
                        LOCK_COLUMNS
                    ),
                    params![path, agent_id],
                    lock_from_row,
                )
                .optional()
                .map_err(query_err)?;

            if let Some(raw) = conflict_raw {
                let conflict = finish_lock(raw)?;
                if total_order_less(lamport_ts, agent_id, conflict.lamport_ts, &conflict.agent_id)
                {
                    // Requester precedes the holder: evict.
                    debug!(path, winner = agent_id, evicted = %conflict.agent_id, "lock eviction");
                    tx.execute(
                        "DELETE FROM locks WHERE path = ?1 AND agent_id = ?2",
                        params![path, conflict.agent_id],
                    )
                    .map_err(query_err)?;
                    let lock =
                        upsert_lock(&tx, path, agent_id, lamport_ts, epoch, exclusive, expires_at)?;
                    tx.commit().map_err(|e| StorageError::TransactionFailed {
                        reason: e.to_string(),
                    })?;
                    return Ok(LockDecision::Granted {
                        lock,
                        evicted: Some(conflict),
                    });
                }
                // Holder precedes the requester: deny. Dropping the
                // transaction rolls it back.
                return Ok(LockDecision::Denied { conflict });
            }

            let lock = upsert_lock(&tx, path, agent_id, lamport_ts, epoch, exclusive, expires_at)?;
            tx.commit().map_err(|e| StorageError::TransactionFailed {
                reason: e.to_string(),
            })?;
            Ok(LockDecision::Granted { lock, evicted: None })
        })
    }

    /// Release a lock held by an agent. Idempotent: releasing an absent
    /// lock is a no-op.
    pub fn release_lock(&self, path: &str, agent_id: &str) -> Result<(), StorageError> {
        self.with_write_retry(|conn| {
            conn.execute(
                "DELETE FROM locks WHERE path = ?1 AND agent_id = ?2",
                params![path, agent_id],
            )
            .map_err(query_err)?;
            Ok(())
        })
    }

    /// All active locks, expired entries purged first, ordered by request
    /// timestamp.
    pub fn list_locks(&self) -> Result<Vec<Lock>, StorageError> {
        self.purge_expired_locks();
        self.query_locks(
            &format!("SELECT {} FROM locks ORDER BY lamport_ts ASC", LOCK_COLUMNS),
            params![],
        )
    }

    /// Active locks held by one agent.
    pub fn list_locks_for_agent(&self, agent_id: &str) -> Result<Vec<Lock>, StorageError> {
        self.purge_expired_locks();
        self.query_locks(
            &format!(
                "SELECT {} FROM locks WHERE agent_id = ?1 ORDER BY lamport_ts ASC",
                LOCK_COLUMNS
            ),
            params![agent_id],
        )
    }

    /// Delete locks whose expiry has passed. Best-effort: failures are
    /// ignored, the rows stay until the next pass.
    fn purge_expired_locks(&self) {
        let now = fmt_ts(Utc::now());
        let _ = self.with_conn(|conn| {
            conn.execute("DELETE FROM locks WHERE expires_at < ?1", params![now])
                .map_err(query_err)
        });
    }

    fn query_locks(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Lock>, StorageError> {
        let raw = self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql).map_err(query_err)?;
            let result = stmt
                .query_map(params, lock_from_row)
                .map_err(query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(query_err);
            result
        })?;
        raw.into_iter().map(finish_lock).collect()
    }
}

fn upsert_lock(
    tx: &rusqlite::Transaction<'_>,
    path: &str,
    agent_id: &str,
    lamport_ts: i64,
    epoch: i64,
    exclusive: bool,
    expires_at: clockmail_core::Timestamp,
) -> Result<Lock, StorageError> {
    tx.execute(
        "INSERT INTO locks (path, agent_id, lamport_ts, epoch, exclusive, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(path, agent_id) DO UPDATE SET
           lamport_ts = excluded.lamport_ts,
           epoch = excluded.epoch,
           exclusive = excluded.exclusive,
           expires_at = excluded.expires_at",
        params![
            path,
            agent_id,
            lamport_ts,
            epoch,
            exclusive as i64,
            fmt_ts(expires_at)
        ],
    )
    .map_err(query_err)?;

    Ok(Lock {
        path: path.to_string(),
        agent_id: agent_id.to_string(),
        lamport_ts,
        epoch,
        exclusive,
        expires_at,
    })
}
