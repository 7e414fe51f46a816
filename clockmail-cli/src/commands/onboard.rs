//! `cm onboard` - static primer for cold-start agents.

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use chrono::Utc;
use clap::Args;
use clockmail_core::ClockmailResult;

#[derive(Debug, Args)]
pub struct OnboardArgs {}

pub fn run(session: &Session, _args: &OnboardArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent_opt().unwrap_or_default();
    let agents = session.store.list_agents()?;

    if json {
        print_json(&serde_json::json!({
            "agent_id": agent_id,
            "db_path": session.db_path,
            "agents": agents,
        }));
        return Ok(Outcome::Success);
    }

    println!("cm (clockmail) -- multi-agent coordination via Lamport clocks + Naiad frontiers");
    println!();

    if agent_id.is_empty() {
        println!("  Your agent ID:  (not set -- export CLOCKMAIL_AGENT=<id>)");
    } else {
        println!("  Your agent ID:  {} (from CLOCKMAIL_AGENT)", agent_id);
    }
    println!("  Database:       {}", session.db_path);
    println!();

    if !agents.is_empty() {
        println!("  Active agents:  {}", agents.len());
        let now = Utc::now();
        for agent in &agents {
            let stale = if now - agent.last_seen_at > chrono::Duration::minutes(10) {
                " (stale)"
            } else {
                ""
            };
            let marker = if agent.id == agent_id { " <-- you" } else { "" };
            println!(
                "    {:<15} epoch={} round={}{}{}",
                agent.id, agent.epoch, agent.round, stale, marker
            );
        }
        println!();
    }

    println!("Run 'cm prime' for full coordination context.");
    println!("Run 'cm --help' for all commands.");
    println!("Run 'cm status' for a detailed overview.");

    Ok(Outcome::Success)
}
