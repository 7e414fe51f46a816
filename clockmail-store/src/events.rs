//! The append-only event log.
//!
//! Events are never mutated or deleted. The design order is lexicographic
//! (lamport_ts, id): row id breaks ties among events that share a Lamport
//! value, so tailing by row id never loses events.

use crate::{fmt_ts, parse_ts, query_err, Store};
use chrono::Utc;
use clockmail_core::{Event, EventKind, StorageError};
use rusqlite::{params, Row};

/// Fallback page size when a caller passes a non-positive limit.
const DEFAULT_LIMIT: i64 = 100;

/// An event to append, before the store assigns its row id and creation
/// time.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub agent_id: String,
    pub lamport_ts: i64,
    pub epoch: i64,
    pub round: i64,
    pub kind: EventKind,
    pub target: String,
    pub body: String,
}

impl NewEvent {
    /// A bare event with empty target and body.
    pub fn new(agent_id: impl Into<String>, lamport_ts: i64, kind: EventKind) -> Self {
        Self {
            agent_id: agent_id.into(),
            lamport_ts,
            epoch: 0,
            round: 0,
            kind,
            target: String::new(),
            body: String::new(),
        }
    }

    pub fn at(mut self, epoch: i64, round: i64) -> Self {
        self.epoch = epoch;
        self.round = round;
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

struct EventRow {
    id: i64,
    agent_id: String,
    lamport_ts: i64,
    epoch: i64,
    round: i64,
    kind: String,
    target: String,
    body: String,
    created_at: String,
}

fn event_from_row(row: &Row<'_>) -> Result<EventRow, rusqlite::Error> {
    Ok(EventRow {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        lamport_ts: row.get(2)?,
        epoch: row.get(3)?,
        round: row.get(4)?,
        kind: row.get(5)?,
        target: row.get(6)?,
        body: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn finish_event(raw: EventRow) -> Result<Event, StorageError> {
    let kind = EventKind::from_db_str(&raw.kind).map_err(|e| StorageError::QueryFailed {
        reason: format!("event {}: {}", raw.id, e),
    })?;
    let created_at = parse_ts(&raw.created_at, &format!("events.created_at[{}]", raw.id))?;
    Ok(Event {
        id: raw.id,
        agent_id: raw.agent_id,
        lamport_ts: raw.lamport_ts,
        epoch: raw.epoch,
        round: raw.round,
        kind,
        target: raw.target,
        body: raw.body,
        created_at,
    })
}

const EVENT_COLUMNS: &str = "id, agent_id, lamport_ts, epoch, round, kind, \
     COALESCE(target,''), COALESCE(body,''), created_at";

fn normalize_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIMIT
    } else {
        limit
    }
}

impl Store {
    /// Append an event to the log. Returns the assigned row id.
    pub fn insert_event(&self, event: &NewEvent) -> Result<i64, StorageError> {
        let created = fmt_ts(Utc::now());
        self.with_write_retry(|conn| {
            conn.execute(
                "INSERT INTO events (agent_id, lamport_ts, epoch, round, kind, target, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.agent_id,
                    event.lamport_ts,
                    event.epoch,
                    event.round,
                    event.kind.as_db_str(),
                    event.target,
                    event.body,
                    created,
                ],
            )
            .map_err(query_err)?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Events with `lamport_ts >= since_ts`, in (lamport_ts, id) order.
    /// A non-positive limit falls back to the default page size.
    pub fn list_events(&self, since_ts: i64, limit: i64) -> Result<Vec<Event>, StorageError> {
        self.query_events(
            &format!(
                "SELECT {} FROM events WHERE lamport_ts >= ?1
                 ORDER BY lamport_ts ASC, id ASC LIMIT ?2",
                EVENT_COLUMNS
            ),
            params![since_ts, normalize_limit(limit)],
        )
    }

    /// Events with row id strictly greater than `since_id`, in id order.
    /// Gap-free tailing: unlike the Lamport ordering, no two events share a
    /// row id.
    pub fn list_events_since_id(
        &self,
        since_id: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        self.query_events(
            &format!(
                "SELECT {} FROM events WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
                EVENT_COLUMNS
            ),
            params![since_id, normalize_limit(limit)],
        )
    }

    /// Deliverable events targeted to `agent_id` with
    /// `lamport_ts >= since_ts`: messages and review traffic. Lock events
    /// stay out; their target is a path, not a recipient, and they must
    /// not advance anyone's receive cursor.
    pub fn list_events_for_agent(
        &self,
        agent_id: &str,
        since_ts: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        self.query_events(
            &format!(
                "SELECT {} FROM events
                 WHERE target = ?1
                   AND kind IN ('msg', 'review_req', 'review_done')
                   AND lamport_ts >= ?2
                 ORDER BY lamport_ts ASC, id ASC LIMIT ?3",
                EVENT_COLUMNS
            ),
            params![agent_id, since_ts, normalize_limit(limit)],
        )
    }

    /// Highest event row id, or 0 for an empty log.
    pub fn max_event_id(&self) -> Result<i64, StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COALESCE(MAX(id), 0) FROM events", [], |row| {
                row.get(0)
            })
            .map_err(query_err)
        })
    }

    /// Total number of events. Correct even when row ids have gaps.
    pub fn count_events(&self) -> Result<i64, StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
                .map_err(query_err)
        })
    }

    fn query_events(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Event>, StorageError> {
        let raw = self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql).map_err(query_err)?;
            let result = stmt
                .query_map(params, event_from_row)
                .map_err(query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(query_err);
            result
        })?;
        raw.into_iter().map(finish_event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(store: &Store) {
        store.register_agent("alice").unwrap();
        store.register_agent("bob").unwrap();
    }

    #[test]
    fn test_insert_assigns_increasing_row_ids() {
        let store = Store::open_in_memory().unwrap();
        seed(&store);
        let first = store
            .insert_event(&NewEvent::new("alice", 1, EventKind::Progress))
            .unwrap();
        let second = store
            .insert_event(&NewEvent::new("alice", 2, EventKind::Progress))
            .unwrap();
        assert!(second > first);
        assert_eq!(store.count_events().unwrap(), 2);
        assert_eq!(store.max_event_id().unwrap(), second);
    }

    #[test]
    fn test_list_orders_by_lamport_then_row_id() {
        let store = Store::open_in_memory().unwrap();
        seed(&store);
        // Same Lamport value from two agents; insertion order breaks the tie.
        store
            .insert_event(&NewEvent::new("bob", 5, EventKind::Progress))
            .unwrap();
        store
            .insert_event(&NewEvent::new("alice", 5, EventKind::Progress))
            .unwrap();
        store
            .insert_event(&NewEvent::new("alice", 3, EventKind::Progress))
            .unwrap();

        let events = store.list_events(0, 10).unwrap();
        assert_eq!(events[0].lamport_ts, 3);
        assert_eq!(events[1].agent_id, "bob");
        assert_eq!(events[2].agent_id, "alice");
    }

    #[test]
    fn test_non_positive_limit_defaults_to_100() {
        let store = Store::open_in_memory().unwrap();
        seed(&store);
        for ts in 1..=120 {
            store
                .insert_event(&NewEvent::new("alice", ts, EventKind::Progress))
                .unwrap();
        }
        assert_eq!(store.list_events(0, 0).unwrap().len(), 100);
        assert_eq!(store.list_events(0, -7).unwrap().len(), 100);
        assert_eq!(store.list_events(0, 120).unwrap().len(), 120);
    }

    #[test]
    fn test_targeted_listing_filters_kind_and_recipient() {
        let store = Store::open_in_memory().unwrap();
        seed(&store);
        store
            .insert_event(
                &NewEvent::new("alice", 1, EventKind::Msg)
                    .target("bob")
                    .body("hi"),
            )
            .unwrap();
        store
            .insert_event(&NewEvent::new("alice", 2, EventKind::LockReq).target("bob"))
            .unwrap();
        store
            .insert_event(
                &NewEvent::new("alice", 3, EventKind::Msg)
                    .target("carol")
                    .body("not yours"),
            )
            .unwrap();

        let inbox = store.list_events_for_agent("bob", 0, 10).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].body, "hi");
    }

    #[test]
    fn test_tail_by_row_id_sees_equal_timestamps() {
        let store = Store::open_in_memory().unwrap();
        seed(&store);
        let first = store
            .insert_event(&NewEvent::new("alice", 7, EventKind::Progress))
            .unwrap();
        store
            .insert_event(&NewEvent::new("bob", 7, EventKind::Progress))
            .unwrap();

        let tail = store.list_events_since_id(first, 10).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].agent_id, "bob");
    }
}
