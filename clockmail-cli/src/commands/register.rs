//! `cm register <agent_id>`

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, ENV_AGENT};

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Agent id to register (idempotent)
    pub agent_id: String,
}

pub fn run(session: &Session, args: &RegisterArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent = session.store.register_agent(&args.agent_id)?;

    if json {
        print_json(&agent);
    } else {
        println!(
            "registered agent {:?} (clock={}, epoch={}, round={})",
            agent.id, agent.clock, agent.epoch, agent.round
        );
        eprintln!("hint: export {}={}", ENV_AGENT, agent.id);
    }
    Ok(Outcome::Success)
}
