//! Output formatting for the terminal surface.
//!
//! Two shapes only: human-readable text, or one structured JSON record per
//! command (`--json`). Informational chatter goes to stderr so that stdout
//! stays parseable.

use clockmail_core::{Event, EventKind};
use serde::Serialize;

/// Write a value to stdout as indented JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("cm: cannot serialize output: {}", err),
    }
}

/// Truncate a body for one-line display, appending an ellipsis.
pub fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let cut: String = body.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Format an event the way `cm log` and `cm watch` print it.
pub fn format_event(event: &Event) -> String {
    match event.kind {
        EventKind::Msg => format!(
            "[ts={}] {} -> {}: {}",
            event.lamport_ts, event.agent_id, event.target, event.body
        ),
        EventKind::LockReq => format!(
            "[ts={}] {} lock-req {}",
            event.lamport_ts, event.agent_id, event.target
        ),
        EventKind::LockRel => format!(
            "[ts={}] {} unlock {}",
            event.lamport_ts, event.agent_id, event.target
        ),
        EventKind::Progress => format!(
            "[ts={}] {} heartbeat epoch={} round={}",
            event.lamport_ts, event.agent_id, event.epoch, event.round
        ),
        EventKind::ReviewReq | EventKind::ReviewDone => format!(
            "[ts={}] {} {} {} {}",
            event.lamport_ts, event.agent_id, event.kind, event.target, event.body
        ),
    }
}

/// Print a drained inbox block before an outbound operation's own output.
pub fn print_inbox(inbox: &[Event]) {
    if inbox.is_empty() {
        return;
    }
    println!("=== {} received message(s) ===", inbox.len());
    for event in inbox {
        println!(
            "  [ts={}] {}: {}",
            event.lamport_ts,
            event.agent_id,
            truncate(&event.body, 120)
        );
    }
    println!("============================");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(kind: EventKind, target: &str, body: &str) -> Event {
        Event {
            id: 1,
            agent_id: "alice".to_string(),
            lamport_ts: 7,
            epoch: 1,
            round: 0,
            kind,
            target: target.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 80), "short");
        let long = "x".repeat(100);
        let cut = truncate(&long, 80);
        assert_eq!(cut.chars().count(), 83); // 80 + "..."
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_format_message_event() {
        let line = format_event(&event(EventKind::Msg, "bob", "hi"));
        assert_eq!(line, "[ts=7] alice -> bob: hi");
    }

    #[test]
    fn test_format_heartbeat_event() {
        let line = format_event(&event(EventKind::Progress, "", ""));
        assert_eq!(line, "[ts=7] alice heartbeat epoch=1 round=0");
    }
}
