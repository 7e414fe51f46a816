//! Closed enumerations of the coordination model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// EVENT KIND
// ============================================================================

/// The closed set of event kinds in the append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Agent-to-agent message
    Msg,
    /// Lock request (logged after the arbiter decides)
    LockReq,
    /// Lock release
    LockRel,
    /// Heartbeat / working-position report
    Progress,
    /// Commit ready for review
    ReviewReq,
    /// Review complete with verdict
    ReviewDone,
}

impl EventKind {
    /// Database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EventKind::Msg => "msg",
            EventKind::LockReq => "lock_req",
            EventKind::LockRel => "lock_rel",
            EventKind::Progress => "progress",
            EventKind::ReviewReq => "review_req",
            EventKind::ReviewDone => "review_done",
        }
    }

    /// Parse from the database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EventKindParseError> {
        match s {
            "msg" => Ok(EventKind::Msg),
            "lock_req" => Ok(EventKind::LockReq),
            "lock_rel" => Ok(EventKind::LockRel),
            "progress" => Ok(EventKind::Progress),
            "review_req" => Ok(EventKind::ReviewReq),
            "review_done" => Ok(EventKind::ReviewDone),
            _ => Err(EventKindParseError(s.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for EventKind {
    type Err = EventKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid event kind string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid event kind: {0}")]
pub struct EventKindParseError(pub String);

// ============================================================================
// REVIEW VERDICT
// ============================================================================

/// Verdict carried by a review-done event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewVerdict {
    Pass,
    Fail,
}

impl ReviewVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewVerdict::Pass => "pass",
            ReviewVerdict::Fail => "fail",
        }
    }
}

impl fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewVerdict {
    type Err = VerdictParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass" => Ok(ReviewVerdict::Pass),
            "fail" => Ok(ReviewVerdict::Fail),
            _ => Err(VerdictParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid review verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("verdict must be 'pass' or 'fail', got {0:?}")]
pub struct VerdictParseError(pub String);

// ============================================================================
// PRESENCE
// ============================================================================

/// Advisory presence classification relative to an agent's last-seen time.
/// Only the status presentation uses this; frontier liveness uses the
/// liveness window directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Seen within 2 minutes
    Online,
    /// Seen within 10 minutes
    Idle,
    /// Not seen for 10+ minutes
    Offline,
}

impl Presence {
    /// Classify from the elapsed time since last-seen.
    pub fn from_elapsed(elapsed: Duration) -> Self {
        if elapsed < Duration::from_secs(2 * 60) {
            Presence::Online
        } else if elapsed < Duration::from_secs(10 * 60) {
            Presence::Idle
        } else {
            Presence::Offline
        }
    }

    /// Short text indicator for terminal display.
    pub fn indicator(&self) -> &'static str {
        match self {
            Presence::Online => "[+]",
            Presence::Idle => "[~]",
            Presence::Offline => "[-]",
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Presence::Online => "online",
            Presence::Idle => "idle",
            Presence::Offline => "offline",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_roundtrip() {
        for kind in [
            EventKind::Msg,
            EventKind::LockReq,
            EventKind::LockRel,
            EventKind::Progress,
            EventKind::ReviewReq,
            EventKind::ReviewDone,
        ] {
            let parsed = EventKind::from_db_str(kind.as_db_str())
                .expect("kind roundtrip should succeed");
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_event_kind_rejects_unknown() {
        assert!(EventKind::from_db_str("telemetry").is_err());
    }

    #[test]
    fn test_verdict_parse_case_insensitive() {
        assert_eq!("PASS".parse::<ReviewVerdict>().unwrap(), ReviewVerdict::Pass);
        assert_eq!("fail".parse::<ReviewVerdict>().unwrap(), ReviewVerdict::Fail);
        assert!("maybe".parse::<ReviewVerdict>().is_err());
    }

    #[test]
    fn test_presence_thresholds() {
        assert_eq!(Presence::from_elapsed(Duration::from_secs(30)), Presence::Online);
        assert_eq!(Presence::from_elapsed(Duration::from_secs(5 * 60)), Presence::Idle);
        assert_eq!(Presence::from_elapsed(Duration::from_secs(20 * 60)), Presence::Offline);
    }
}
