//! `cm unlock <path>` - release a file lock.

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, EventKind};

#[derive(Debug, Args)]
pub struct UnlockArgs {
    /// Path to release
    pub path: String,
}

pub fn run(session: &Session, args: &UnlockArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;
    let (epoch, round) = session.resolve_epoch_round(&agent_id, -1, -1)?;

    let mut clock = session.clock_for(&agent_id)?;
    let (ts, _) = session.emit(
        &agent_id,
        &mut clock,
        epoch,
        round,
        EventKind::LockRel,
        &args.path,
        "",
    )?;

    session.store.release_lock(&args.path, &agent_id)?;

    if json {
        print_json(&serde_json::json!({
            "released": true,
            "path": args.path,
            "lamport_ts": ts,
        }));
    } else {
        println!("unlocked {} (ts={})", args.path, ts);
    }
    Ok(Outcome::Success)
}
