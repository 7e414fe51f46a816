//! `cm recv` - cursor-consuming receive (Lamport IR2).

use crate::output::{print_json, truncate};
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, Event};

#[derive(Debug, Args)]
pub struct RecvArgs {
    /// Fetch messages with lamport_ts >= this (-1 = use the stored cursor)
    #[arg(long, default_value_t = -1)]
    pub since: i64,

    /// Max messages to return
    #[arg(long, default_value_t = 100)]
    pub limit: i64,

    /// Show only messages from this sender (display filter)
    #[arg(long)]
    pub from: Option<String>,

    /// One-line summaries only (first 80 chars)
    #[arg(long)]
    pub summary: bool,
}

pub fn run(session: &Session, args: &RecvArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;

    let since = if args.since >= 0 {
        args.since
    } else {
        session.store.get_cursor(&agent_id)?
    };

    let events = session
        .store
        .list_events_for_agent(&agent_id, since, args.limit)?;

    // IR2 advances for ALL received messages, even ones the --from filter
    // hides. Filtering is a presentation concern, not a clock concern.
    let mut clock = session.clock_for(&agent_id)?;
    let mut max_ts = 0;
    for event in &events {
        clock.receive(event.lamport_ts);
        max_ts = max_ts.max(event.lamport_ts);
    }
    let new_ts = clock.value();

    if let Some(agent) = session.store.get_agent(&agent_id)? {
        session
            .store
            .update_agent_clock(&agent_id, new_ts, agent.epoch, agent.round)?;
    }
    if max_ts > 0 {
        session.store.set_cursor(&agent_id, max_ts + 1)?;
    }

    let displayed: Vec<&Event> = match &args.from {
        Some(from) => events.iter().filter(|e| &e.agent_id == from).collect(),
        None => events.iter().collect(),
    };

    if json {
        print_json(&serde_json::json!({
            "messages": displayed,
            "count": displayed.len(),
            "total_received": events.len(),
            "new_lamport_ts": new_ts,
        }));
        return Ok(Outcome::Success);
    }

    if events.is_empty() {
        println!("no new messages");
    } else if displayed.is_empty() {
        eprintln!(
            "({} messages received, none from {:?}, clock now {})",
            events.len(),
            args.from.as_deref().unwrap_or(""),
            new_ts
        );
    } else {
        for event in &displayed {
            let body = if args.summary {
                truncate(&event.body, 80)
            } else {
                event.body.clone()
            };
            println!("[ts={}] {}: {}", event.lamport_ts, event.agent_id, body);
        }
        if displayed.len() < events.len() {
            eprintln!(
                "({} shown from {:?}, {} total received, clock now {})",
                displayed.len(),
                args.from.as_deref().unwrap_or(""),
                events.len(),
                new_ts
            );
        } else {
            eprintln!("({} messages, clock now {})", events.len(), new_ts);
        }
    }
    Ok(Outcome::Success)
}
