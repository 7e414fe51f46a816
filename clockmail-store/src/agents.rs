//! Agent rows: registration, clock persistence, liveness.

use crate::{fmt_ts, parse_ts, query_err, Store};
use chrono::Utc;
use clockmail_core::{Agent, Pointstamp, Stamp, StorageError};
use rusqlite::{params, OptionalExtension, Row};
use std::time::Duration;

/// Raw agent row before the wall-clock columns are parsed.
struct AgentRow {
    id: String,
    clock: i64,
    epoch: i64,
    round: i64,
    registered: String,
    last_seen: String,
}

fn agent_from_row(row: &Row<'_>) -> Result<AgentRow, rusqlite::Error> {
    Ok(AgentRow {
        id: row.get(0)?,
        clock: row.get(1)?,
        epoch: row.get(2)?,
        round: row.get(3)?,
        registered: row.get(4)?,
        last_seen: row.get(5)?,
    })
}

fn finish_agent(raw: AgentRow) -> Result<Agent, StorageError> {
    let registered_at = parse_ts(&raw.registered, &format!("agents.registered[{}]", raw.id))?;
    let last_seen_at = parse_ts(&raw.last_seen, &format!("agents.last_seen[{}]", raw.id))?;
    Ok(Agent {
        id: raw.id,
        clock: raw.clock,
        epoch: raw.epoch,
        round: raw.round,
        registered_at,
        last_seen_at,
    })
}

const AGENT_COLUMNS: &str = "id, clock, epoch, round, registered, last_seen";

impl Store {
    /// Create or refresh an agent. Idempotent: re-registration only updates
    /// last-seen, never the clock or position.
    pub fn register_agent(&self, id: &str) -> Result<Agent, StorageError> {
        let now = fmt_ts(Utc::now());
        self.with_write_retry(|conn| {
            conn.execute(
                "INSERT INTO agents (id, clock, epoch, round, registered, last_seen)
                 VALUES (?1, 0, 0, 0, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET last_seen = excluded.last_seen",
                params![id, now, now],
            )
            .map_err(query_err)?;
            Ok(())
        })?;
        self.get_agent(id)?
            .ok_or_else(|| StorageError::AgentNotFound {
                agent_id: id.to_string(),
            })
    }

    /// Fetch an agent by id, if registered.
    pub fn get_agent(&self, id: &str) -> Result<Option<Agent>, StorageError> {
        let raw = self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
                params![id],
                agent_from_row,
            )
            .optional()
            .map_err(query_err)
        })?;
        raw.map(finish_agent).transpose()
    }

    /// Persist the agent's Lamport clock and working position. Also bumps
    /// last-seen, which is what keeps the agent inside the liveness window.
    pub fn update_agent_clock(
        &self,
        id: &str,
        clock: i64,
        epoch: i64,
        round: i64,
    ) -> Result<(), StorageError> {
        let now = fmt_ts(Utc::now());
        self.with_write_retry(|conn| {
            conn.execute(
                "UPDATE agents SET clock = ?1, epoch = ?2, round = ?3, last_seen = ?4
                 WHERE id = ?5",
                params![clock, epoch, round, now, id],
            )
            .map_err(query_err)?;
            Ok(())
        })
    }

    /// All registered agents, ordered by id.
    pub fn list_agents(&self) -> Result<Vec<Agent>, StorageError> {
        let raw = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {} FROM agents ORDER BY id", AGENT_COLUMNS))
                .map_err(query_err)?;
            let rows = stmt
                .query_map([], agent_from_row)
                .map_err(query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(query_err)?;
            Ok(rows)
        })?;
        raw.into_iter().map(finish_agent).collect()
    }

    /// One pointstamp per agent whose last-seen falls within the liveness
    /// window. Stale agents are assumed to produce no new work; if they
    /// write again they re-enter the active set on the next query.
    pub fn active_pointstamps(
        &self,
        liveness_window: Duration,
    ) -> Result<Vec<Pointstamp>, StorageError> {
        let now = Utc::now();
        let window = chrono::Duration::from_std(liveness_window)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        Ok(self
            .list_agents()?
            .into_iter()
            .filter(|a| now - a.last_seen_at < window)
            .map(|a| Pointstamp::new(Stamp::new(a.epoch, a.round), a.id))
            .collect())
    }
}
