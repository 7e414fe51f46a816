//! `cm log` - query the append-only event log. Read-only.

use crate::output::{format_event, print_json};
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, EventKind};

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Fetch events with lamport_ts >= this
    #[arg(long, default_value_t = 0)]
    pub since: i64,

    /// Max events to return
    #[arg(long, default_value_t = 50)]
    pub limit: i64,

    /// Filter by event kind (msg, lock_req, lock_rel, progress, ...)
    #[arg(long)]
    pub kind: Option<EventKind>,
}

pub fn run(session: &Session, args: &LogArgs, json: bool) -> ClockmailResult<Outcome> {
    let mut events = session.store.list_events(args.since, args.limit)?;

    if let Some(kind) = args.kind {
        events.retain(|e| e.kind == kind);
    }

    if json {
        print_json(&serde_json::json!({
            "events": events,
            "count": events.len(),
        }));
    } else if events.is_empty() {
        println!("no events");
    } else {
        for event in &events {
            println!("{}", format_event(event));
        }
    }
    Ok(Outcome::Success)
}
