//! `cm sync` - the main loop command: heartbeat + recv + frontier + locks.

use crate::output::{print_json, truncate};
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{frontier_status, ClockmailResult, EventKind, Stamp};

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Current working epoch
    #[arg(long, default_value_t = 0)]
    pub epoch: i64,

    /// Current working round
    #[arg(long, default_value_t = 0)]
    pub round: i64,
}

pub fn run(session: &Session, args: &SyncArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;
    let mut clock = session.clock_for(&agent_id)?;

    // 1. Heartbeat: tick, persist position, emit progress.
    session.emit(
        &agent_id,
        &mut clock,
        args.epoch,
        args.round,
        EventKind::Progress,
        "",
        "",
    )?;

    // 2. Recv: fetch new messages, apply IR2, advance cursor.
    let since = session.store.get_cursor(&agent_id)?;
    let messages = session.store.list_events_for_agent(
        &agent_id,
        since,
        session.config.default_event_limit as i64,
    )?;
    let mut max_msg_ts = 0;
    for message in &messages {
        clock.receive(message.lamport_ts);
        max_msg_ts = max_msg_ts.max(message.lamport_ts);
    }
    let new_ts = clock.value();
    session
        .store
        .update_agent_clock(&agent_id, new_ts, args.epoch, args.round)?;
    if max_msg_ts > 0 {
        session.store.set_cursor(&agent_id, max_msg_ts + 1)?;
    }

    // 3. Frontier: safety at the reported position.
    let ts = Stamp::new(args.epoch, args.round);
    let active = session.active_pointstamps()?;
    let status = frontier_status(&agent_id, ts, &active);

    // 4. Locks held by this agent.
    let locks = session.store.list_locks_for_agent(&agent_id)?;

    if json {
        print_json(&serde_json::json!({
            "agent_id": agent_id,
            "lamport_ts": new_ts,
            "epoch": args.epoch,
            "round": args.round,
            "messages": messages,
            "message_count": messages.len(),
            "frontier": status,
            "safe_to_finalize": status.safe_to_finalize,
            "locks": locks,
        }));
        return Ok(Outcome::Success);
    }

    // Messages first: the output that matters most for coordination.
    if !messages.is_empty() {
        println!();
        println!("=== {} new message(s) ===", messages.len());
        for message in &messages {
            println!(
                "  [ts={}] {}: {}",
                message.lamport_ts,
                message.agent_id,
                truncate(&message.body, 120)
            );
        }
        println!("========================");
        println!();
    }

    println!(
        "sync {} ts={} epoch={} round={}",
        agent_id, new_ts, args.epoch, args.round
    );

    if status.safe_to_finalize {
        println!("  frontier: SAFE to finalize {}", ts);
    } else {
        println!("  frontier: NOT SAFE to finalize {}", ts);
        for blocker in &status.blocked_by {
            println!(
                "    blocked by {} at {}",
                blocker.agent_id, blocker.timestamp
            );
        }
    }

    if !locks.is_empty() {
        println!("  {} active locks:", locks.len());
        for lock in &locks {
            println!(
                "    {} (ts={}, expires {})",
                lock.path,
                lock.lamport_ts,
                lock.expires_at.to_rfc3339()
            );
        }
    }
    Ok(Outcome::Success)
}
