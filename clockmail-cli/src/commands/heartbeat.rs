//! `cm heartbeat` - advance the clock and report the working position.

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, EventKind};

#[derive(Debug, Args)]
pub struct HeartbeatArgs {
    /// Current working epoch
    #[arg(long, default_value_t = 0)]
    pub epoch: i64,

    /// Current working round
    #[arg(long, default_value_t = 0)]
    pub round: i64,
}

pub fn run(session: &Session, args: &HeartbeatArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;
    let mut clock = session.clock_for(&agent_id)?;

    let (ts, _) = session.emit(
        &agent_id,
        &mut clock,
        args.epoch,
        args.round,
        EventKind::Progress,
        "",
        "",
    )?;

    if json {
        print_json(&serde_json::json!({
            "agent_id": agent_id,
            "lamport_ts": ts,
            "epoch": args.epoch,
            "round": args.round,
        }));
    } else {
        println!(
            "heartbeat {} ts={} epoch={} round={}",
            agent_id, ts, args.epoch, args.round
        );
    }
    Ok(Outcome::Success)
}
