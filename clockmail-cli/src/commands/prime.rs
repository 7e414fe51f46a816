//! `cm prime` - the dynamic coordination snapshot, meant to be run at the
//! start of every agent session.

use crate::output::{print_json, truncate};
use crate::session::Session;
use crate::Outcome;
use chrono::Utc;
use clap::Args;
use clockmail_core::{compute_frontier, frontier_status, ClockmailResult};

#[derive(Debug, Args)]
pub struct PrimeArgs {}

pub fn run(session: &Session, _args: &PrimeArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent_opt().unwrap_or_default();

    let agents = session.store.list_agents()?;
    let locks = session.store.list_locks()?;
    let active = session.active_pointstamps()?;
    let frontier = compute_frontier(&active);

    let my_agent = agents.iter().find(|a| a.id == agent_id);

    let pending = if agent_id.is_empty() {
        Vec::new()
    } else {
        let cursor = session.store.get_cursor(&agent_id)?;
        session
            .store
            .list_events_for_agent(&agent_id, cursor, 1000)?
    };

    let my_locks: Vec<_> = locks.iter().filter(|l| l.agent_id == agent_id).collect();
    let other_locks: Vec<_> = locks.iter().filter(|l| l.agent_id != agent_id).collect();

    let my_status = my_agent.map(|a| frontier_status(&agent_id, a.stamp(), &active));

    if json {
        print_json(&serde_json::json!({
            "agent": my_agent,
            "agents": agents,
            "my_locks": my_locks,
            "other_locks": other_locks,
            "pending_messages": pending,
            "pending_count": pending.len(),
            "frontier": frontier,
            "my_status": my_status,
        }));
        return Ok(Outcome::Success);
    }

    println!("# Clockmail Coordination Context");
    println!();

    match my_agent {
        Some(agent) => println!(
            "Agent: {} | Clock: {} | Epoch: {} | Round: {}",
            agent.id, agent.clock, agent.epoch, agent.round
        ),
        None if !agent_id.is_empty() => println!(
            "Agent: {} (not registered -- run: cm register {})",
            agent_id, agent_id
        ),
        None => println!("Agent: (not set -- export CLOCKMAIL_AGENT=<id> && cm register <id>)"),
    }
    println!();

    if !agents.is_empty() {
        println!("## Active Agents");
        let now = Utc::now();
        for agent in &agents {
            let stale = if now - agent.last_seen_at > chrono::Duration::minutes(10) {
                " (stale)"
            } else {
                ""
            };
            let marker = if agent.id == agent_id { " (you)" } else { "" };
            println!(
                "  {:<15} clock={:<4} epoch={:<3} round={:<3}{}{}",
                agent.id, agent.clock, agent.epoch, agent.round, stale, marker
            );
        }
        println!();
    }

    if !my_locks.is_empty() {
        println!("## Your Locks");
        let now = Utc::now();
        for lock in &my_locks {
            let remaining = (lock.expires_at - now).num_minutes();
            println!("  {} (expires in {}m)", lock.path, remaining.max(0));
        }
        println!();
    }

    if !other_locks.is_empty() {
        println!("## Other Agents' Locks");
        for lock in &other_locks {
            println!("  {} held by {}", lock.path, lock.agent_id);
        }
        println!();
    }

    if pending.is_empty() {
        println!("## Pending Messages: 0");
    } else {
        println!("## Pending Messages: {}", pending.len());
        for event in &pending {
            println!(
                "  [ts={}] {}: {}",
                event.lamport_ts,
                event.agent_id,
                truncate(&event.body, 100)
            );
        }
        println!("  Run: cm recv   (to acknowledge and advance cursor)");
    }
    println!();

    if let (Some(agent), Some(status)) = (my_agent, &my_status) {
        println!("## Frontier");
        if status.safe_to_finalize {
            println!("  SAFE to finalize {}", agent.stamp());
        } else {
            println!("  NOT SAFE to finalize {}", agent.stamp());
            for blocker in &status.blocked_by {
                println!("    blocked by {} at {}", blocker.agent_id, blocker.timestamp);
            }
        }
        if !frontier.is_empty() {
            println!("  Frontier points:");
            for point in &frontier {
                println!("    {} @ {}", point.agent_id, point.timestamp);
            }
        }
        println!();
    }

    println!("## Session Close Protocol");
    println!();
    println!("Before ending your session:");
    if my_locks.is_empty() {
        println!("  cm sync --epoch <N>");
    } else {
        println!("  1. Release all locks:");
        for lock in &my_locks {
            println!("     cm unlock {}", lock.path);
        }
        println!("  2. Sync your state:");
        println!("     cm sync --epoch <N>");
    }
    println!();

    println!("## Quick Reference");
    println!();
    println!("  cm sync --epoch N     # Main loop: heartbeat + recv + frontier");
    println!("  cm send <to> <msg>    # Message another agent");
    println!("  cm lock <path>        # Lock file before editing");
    println!("  cm unlock <path>      # Release lock");
    println!("  cm status             # Full overview");
    println!("  cm log                # Event history");

    Ok(Outcome::Success)
}
