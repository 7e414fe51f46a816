//! `cm watch` - poll-stream the event log.
//!
//! Two modes with deliberately different semantics:
//!
//! - Global (`--all`, or no resolvable identity): every event from every
//!   agent, tailed by row id so ties on a Lamport value are never skipped.
//!   Read-only: no clock side effects, no cursor updates. Safe for passive
//!   observers.
//! - Agent: messages targeted to this agent, applying IR2 and advancing the
//!   cursor exactly like `cm recv`.

use crate::output::format_event;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, Event, EventKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Watch all events from all agents (global mode)
    #[arg(long)]
    pub all: bool,

    /// Filter by event kind
    #[arg(long)]
    pub kind: Option<EventKind>,

    /// Poll interval in seconds
    #[arg(long, default_value_t = 1)]
    pub interval: u64,
}

pub fn run(session: &Session, args: &WatchArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent = session.resolve_agent_opt();
    let interval = Duration::from_secs(args.interval.max(1));
    let stop = install_interrupt_flag();

    match (&agent, args.all) {
        (Some(agent_id), false) => watch_agent(session, agent_id, interval, args.kind, json, &stop),
        _ => watch_global(session, interval, args.kind, json, &stop),
    }
}

fn watch_global(
    session: &Session,
    interval: Duration,
    kind_filter: Option<EventKind>,
    json: bool,
    stop: &AtomicBool,
) -> ClockmailResult<Outcome> {
    // Seed at the current max row id so only new events show.
    let mut last_seen_id = session.store.max_event_id()?;

    let what = kind_filter
        .map(|k| format!("{} events", k))
        .unwrap_or_else(|| "all events".to_string());
    eprintln!(
        "watching {} from all agents (poll every {}s, ctrl-c to stop)",
        what,
        interval.as_secs()
    );

    loop {
        if sleep_or_stop(interval, stop) {
            eprintln!();
            eprintln!("stopped");
            return Ok(Outcome::Success);
        }

        let events = session.store.list_events_since_id(last_seen_id, 200)?;
        for event in events {
            last_seen_id = event.id;
            if kind_filter.is_some_and(|k| event.kind != k) {
                continue;
            }
            emit_line(&event, json);
        }
    }
}

fn watch_agent(
    session: &Session,
    agent_id: &str,
    interval: Duration,
    kind_filter: Option<EventKind>,
    json: bool,
    stop: &AtomicBool,
) -> ClockmailResult<Outcome> {
    let mut cursor = session.store.get_cursor(agent_id)?;

    let what = kind_filter
        .map(|k| format!("{} events", k))
        .unwrap_or_else(|| "messages".to_string());
    eprintln!(
        "watching {} for {} (poll every {}s, ctrl-c to stop)",
        what,
        agent_id,
        interval.as_secs()
    );

    loop {
        if sleep_or_stop(interval, stop) {
            eprintln!();
            eprintln!("stopped");
            return Ok(Outcome::Success);
        }

        let events = session.store.list_events_for_agent(agent_id, cursor, 100)?;
        if events.is_empty() {
            continue;
        }

        for event in &events {
            if kind_filter.is_none() || kind_filter == Some(event.kind) {
                emit_line(event, json);
            }
            cursor = cursor.max(event.lamport_ts + 1);
        }

        // IR2 + cursor, same as a recv over the batch.
        session.store.set_cursor(agent_id, cursor)?;
        let mut clock = session.clock_for(agent_id)?;
        for event in &events {
            clock.receive(event.lamport_ts);
        }
        if let Some(agent) = session.store.get_agent(agent_id)? {
            session
                .store
                .update_agent_clock(agent_id, clock.value(), agent.epoch, agent.round)?;
        }
    }
}

fn emit_line(event: &Event, json: bool) {
    if json {
        // One JSON object per line in watch mode.
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(err) => eprintln!("cm: cannot serialize event: {}", err),
        }
    } else {
        println!("{}", format_event(event));
    }
}

/// Sleep one poll interval in short slices; true means interrupted.
fn sleep_or_stop(interval: Duration, stop: &AtomicBool) -> bool {
    let deadline = std::time::Instant::now() + interval;
    while std::time::Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    stop.load(Ordering::Relaxed)
}

fn install_interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    let _ = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    });
    flag
}
