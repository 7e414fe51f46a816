//! `cm lock <path>` - acquire an exclusive file lock by total order.

use crate::output::{print_inbox, print_json};
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, EventKind};
use clockmail_store::{LockDecision, NewEvent};
use std::time::Duration;

#[derive(Debug, Args)]
pub struct LockArgs {
    /// Path to reserve
    pub path: String,

    /// Lock TTL in seconds
    #[arg(long, default_value_t = 3600)]
    pub ttl: u64,

    /// Epoch context (-1 = keep current)
    #[arg(long, default_value_t = -1)]
    pub epoch: i64,
}

pub fn run(session: &Session, args: &LockArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;
    let (epoch, round) = session.resolve_epoch_round(&agent_id, args.epoch, -1)?;

    let mut clock = session.clock_for(&agent_id)?;

    // Drain first: lock holders may have sent releases.
    let inbox = session.drain_inbox(&agent_id, &mut clock)?;
    if !json {
        print_inbox(&inbox);
    }

    let ts = clock.tick();
    session
        .store
        .update_agent_clock(&agent_id, ts, epoch, round)?;

    let decision = session.store.acquire_lock(
        &args.path,
        &agent_id,
        ts,
        epoch,
        true,
        Duration::from_secs(args.ttl),
    )?;

    // Log the request after the decision, so the log never shows phantom
    // requests from aborted transactions.
    session.store.insert_event(
        &NewEvent::new(&agent_id, ts, EventKind::LockReq)
            .at(epoch, round)
            .target(&args.path),
    )?;

    match decision {
        LockDecision::Granted { lock, evicted } => {
            if json {
                print_json(&serde_json::json!({
                    "granted": true,
                    "lock": lock,
                    "evicted": evicted,
                    "lamport_ts": ts,
                    "inbox": inbox,
                    "inbox_count": inbox.len(),
                }));
            } else {
                if let Some(evicted) = &evicted {
                    println!(
                        "evicted {}'s lock on {} (total order ({},{:?}) < ({},{:?}))",
                        evicted.agent_id,
                        args.path,
                        ts,
                        agent_id,
                        evicted.lamport_ts,
                        evicted.agent_id
                    );
                }
                println!("locked {} (ts={}, ttl={}s)", args.path, ts, args.ttl);
            }
            Ok(Outcome::Success)
        }
        LockDecision::Denied { conflict } => {
            if json {
                print_json(&serde_json::json!({
                    "granted": false,
                    "conflict": conflict,
                    "resolution": format!(
                        "{} holds lock with lower total order ({},{:?}) vs ({},{:?})",
                        conflict.agent_id, conflict.lamport_ts, conflict.agent_id, ts, agent_id
                    ),
                    "inbox": inbox,
                    "inbox_count": inbox.len(),
                }));
            } else {
                println!(
                    "DENIED: {} holds {} (ts={} < {})",
                    conflict.agent_id, args.path, conflict.lamport_ts, ts
                );
            }
            Ok(Outcome::Denied)
        }
    }
}
