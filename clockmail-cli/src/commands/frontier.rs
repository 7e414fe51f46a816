//! `cm frontier` - check finalization safety at a structured timestamp.

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{frontier_status, ClockmailResult, Stamp};

#[derive(Debug, Args)]
pub struct FrontierArgs {
    /// Epoch to check safety for
    #[arg(long, default_value_t = 0)]
    pub epoch: i64,

    /// Round to check safety for
    #[arg(long, default_value_t = 0)]
    pub round: i64,
}

pub fn run(session: &Session, args: &FrontierArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;
    let ts = Stamp::new(args.epoch, args.round);
    let active = session.active_pointstamps()?;
    let status = frontier_status(&agent_id, ts, &active);

    if json {
        print_json(&status);
        return Ok(Outcome::Success);
    }

    if status.safe_to_finalize {
        println!("SAFE to finalize {}", ts);
    } else {
        println!("NOT SAFE to finalize {}", ts);
        for blocker in &status.blocked_by {
            println!("  blocked by {} at {}", blocker.agent_id, blocker.timestamp);
        }
    }
    if !status.frontier.is_empty() {
        println!("frontier:");
        for point in &status.frontier {
            println!("  {} @ {}", point.agent_id, point.timestamp);
        }
    }
    Ok(Outcome::Success)
}
