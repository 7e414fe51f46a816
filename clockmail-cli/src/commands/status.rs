//! `cm status` - overview of agents, locks, and the frontier.

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use chrono::Utc;
use clockmail_core::{compute_frontier, frontier_status, Agent, ClockmailResult, Presence};
use serde::Serialize;

#[derive(Debug, Args)]
pub struct StatusArgs {}

#[derive(Serialize)]
struct AgentInfo {
    #[serde(flatten)]
    agent: Agent,
    presence: Presence,
}

pub fn run(session: &Session, _args: &StatusArgs, json: bool) -> ClockmailResult<Outcome> {
    // Status works without an identity; with one it adds a focused view.
    let agent_id = session.resolve_agent_opt().unwrap_or_default();

    let agents = session.store.list_agents()?;
    let locks = session.store.list_locks()?;
    let active = session.active_pointstamps()?;
    let frontier = compute_frontier(&active);

    let now = Utc::now();
    let infos: Vec<AgentInfo> = agents
        .iter()
        .map(|agent| AgentInfo {
            agent: agent.clone(),
            presence: Presence::from_elapsed(
                (now - agent.last_seen_at).to_std().unwrap_or_default(),
            ),
        })
        .collect();

    if json {
        let mut record = serde_json::json!({
            "agents": infos,
            "locks": locks,
            "frontier": frontier,
        });
        if !agent_id.is_empty() {
            let ts = Session::agent_stamp(&agents, &agent_id);
            record["my_status"] =
                serde_json::to_value(frontier_status(&agent_id, ts, &active)).unwrap_or_default();
        }
        print_json(&record);
        return Ok(Outcome::Success);
    }

    println!("agents:");
    for info in &infos {
        let marker = if info.agent.id == agent_id { " <-- you" } else { "" };
        println!(
            "  {} {:<20} clock={:<4} epoch={:<3} round={:<3} last_seen={}{}",
            info.presence.indicator(),
            info.agent.id,
            info.agent.clock,
            info.agent.epoch,
            info.agent.round,
            info.agent.last_seen_at.format("%H:%M:%S"),
            marker
        );
    }

    if locks.is_empty() {
        println!("locks: none");
    } else {
        println!("locks:");
        for lock in &locks {
            println!(
                "  {:<30} held by {:<15} ts={:<4} expires={}",
                lock.path,
                lock.agent_id,
                lock.lamport_ts,
                lock.expires_at.format("%H:%M:%S")
            );
        }
    }

    if !frontier.is_empty() {
        println!("frontier:");
        for point in &frontier {
            println!("  {} @ {}", point.agent_id, point.timestamp);
        }
    }

    if !agent_id.is_empty() {
        let ts = Session::agent_stamp(&agents, &agent_id);
        let status = frontier_status(&agent_id, ts, &active);
        if status.safe_to_finalize {
            println!("you ({}): SAFE to finalize {}", agent_id, ts);
        } else {
            println!("you ({}): NOT SAFE to finalize {}", agent_id, ts);
        }
    }
    Ok(Outcome::Success)
}
