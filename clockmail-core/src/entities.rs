//! Core entity structures.

use crate::{EventKind, Pointstamp, ReviewVerdict, Stamp, Timestamp};
use serde::{Deserialize, Serialize};

/// A registered agent session.
///
/// The agent row is the single-writer home of an agent's Lamport clock and
/// working position; every other agent only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Short opaque identifier, chosen by the caller at registration
    pub id: String,
    /// Current Lamport clock value (monotonically non-decreasing)
    pub clock: i64,
    /// Current working epoch
    pub epoch: i64,
    /// Current working round
    pub round: i64,
    /// When the agent was first registered
    pub registered_at: Timestamp,
    /// Updated on every write by this agent
    pub last_seen_at: Timestamp,
}

impl Agent {
    /// The agent's current working position as a structured timestamp.
    pub fn stamp(&self) -> Stamp {
        Stamp::new(self.epoch, self.round)
    }

    /// The agent's pointstamp for frontier computation.
    pub fn pointstamp(&self) -> Pointstamp {
        Pointstamp::new(self.stamp(), self.id.clone())
    }
}

/// A single entry in the append-only event log.
///
/// Once inserted an event is never mutated or deleted. The design order is
/// lexicographic (lamport_ts, id): the auto-assigned row id breaks ties
/// among events sharing a Lamport value, so tailing by row id is gap-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Auto-assigned row id (unique, monotonically increasing, gaps allowed)
    pub id: i64,
    /// Author agent
    pub agent_id: String,
    /// Lamport timestamp at which the author emitted the event
    pub lamport_ts: i64,
    /// Epoch context at emission
    pub epoch: i64,
    /// Round context at emission
    pub round: i64,
    /// Event kind tag
    pub kind: EventKind,
    /// Recipient agent id for messages; path for lock events
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    /// Free-form or serialized payload
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    /// Wall-clock creation time (advisory only; ordering uses lamport_ts)
    pub created_at: Timestamp,
}

/// An active file reservation.
///
/// Keyed by (path, agent). The arbiter maintains the invariant that at most
/// one exclusive lock exists per path at any transaction commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub path: String,
    pub agent_id: String,
    /// Lamport timestamp at which the holder requested the lock
    pub lamport_ts: i64,
    /// Epoch context of the request
    pub epoch: i64,
    pub exclusive: bool,
    /// Wall-clock expiry; expired rows are lazily purged
    pub expires_at: Timestamp,
}

impl Lock {
    /// Check whether the lock has expired as of `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Result of a frontier safety check for one agent at one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierStatus {
    pub safe_to_finalize: bool,
    /// The antichain of minimal active pointstamps
    pub frontier: Vec<Pointstamp>,
    /// Active pointstamps of other agents at timestamps <= the requested one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<Pointstamp>,
}

/// Structured metadata embedded in review event bodies.
///
/// JSON-encoded into the event body so machines can parse it while a plain
/// reader still gets legible output. No dedicated columns: the closed event
/// kinds plus an opaque body suffice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPayload {
    /// "review-request" or "review-done"
    #[serde(rename = "type")]
    pub kind: String,
    /// Git commit identifier (short or full)
    pub commit: String,
    /// Affected files (request only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Pass/fail (done only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ReviewVerdict>,
    /// Optional reviewer comment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl ReviewPayload {
    /// Payload for a review-request carrying the commit and touched files.
    pub fn request(commit: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            kind: "review-request".to_string(),
            commit: commit.into(),
            files,
            verdict: None,
            comment: String::new(),
        }
    }

    /// Payload for a review-done carrying the verdict and optional comment.
    pub fn done(
        commit: impl Into<String>,
        verdict: ReviewVerdict,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            kind: "review-done".to_string(),
            commit: commit.into(),
            files: Vec::new(),
            verdict: Some(verdict),
            comment: comment.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_agent_pointstamp() {
        let now = Utc::now();
        let agent = Agent {
            id: "alice".to_string(),
            clock: 7,
            epoch: 2,
            round: 1,
            registered_at: now,
            last_seen_at: now,
        };
        let ps = agent.pointstamp();
        assert_eq!(ps.agent_id, "alice");
        assert_eq!(ps.timestamp, Stamp::new(2, 1));
    }

    #[test]
    fn test_lock_expiry() {
        let now = Utc::now();
        let lock = Lock {
            path: "auth.go".to_string(),
            agent_id: "alice".to_string(),
            lamport_ts: 1,
            epoch: 0,
            exclusive: true,
            expires_at: now,
        };
        assert!(lock.is_expired(now));
        assert!(!lock.is_expired(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_review_payload_roundtrip() {
        let payload = ReviewPayload::done("abc123", ReviewVerdict::Fail, "needs tests");
        let json = serde_json::to_string(&payload).unwrap();
        let back: ReviewPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
        assert!(json.contains("\"type\":\"review-done\""));
        // Request-only fields stay out of the wire format.
        assert!(!json.contains("files"));
    }

    #[test]
    fn test_review_request_omits_verdict() {
        let payload = ReviewPayload::request("abc123", vec!["auth.go".to_string()]);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("verdict"));
        assert!(json.contains("auth.go"));
    }
}
