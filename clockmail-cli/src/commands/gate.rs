//! `cm gate` - block until the frontier passes a structured timestamp.
//!
//! Test-gate coordination: don't run the expensive phase until every active
//! agent has advanced past the epoch under test.

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{frontier_status, ClockmailResult, Stamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Args)]
pub struct GateArgs {
    /// Epoch to wait for
    #[arg(long, default_value_t = 0)]
    pub epoch: i64,

    /// Round to wait for
    #[arg(long, default_value_t = 0)]
    pub round: i64,

    /// Max seconds to wait
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,

    /// Poll interval in seconds
    #[arg(long, default_value_t = 2)]
    pub interval: u64,

    /// Check once and exit: 0 if safe, 2 if not (no blocking)
    #[arg(long)]
    pub check: bool,
}

pub fn run(session: &Session, args: &GateArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;
    let ts = Stamp::new(args.epoch, args.round);

    if args.check {
        return check_once(session, &agent_id, ts, json);
    }
    wait(
        session,
        &agent_id,
        ts,
        Duration::from_secs(args.timeout),
        Duration::from_secs(args.interval.max(1)),
        json,
    )
}

fn check_once(
    session: &Session,
    agent_id: &str,
    ts: Stamp,
    json: bool,
) -> ClockmailResult<Outcome> {
    let active = session.active_pointstamps()?;
    let status = frontier_status(agent_id, ts, &active);

    if json {
        print_json(&serde_json::json!({
            "epoch": ts.epoch,
            "round": ts.round,
            "safe": status.safe_to_finalize,
            "blocked_by": status.blocked_by,
            "blocker_count": status.blocked_by.len(),
            "active_agents": active.len(),
            "mode": "check",
        }));
    } else if status.safe_to_finalize {
        println!("SAFE: {} -- all agents have advanced past this point", ts);
    } else {
        println!("NOT SAFE: {}", ts);
        for blocker in &status.blocked_by {
            println!("  blocked by {} at {}", blocker.agent_id, blocker.timestamp);
        }
    }

    if status.safe_to_finalize {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::Denied)
    }
}

fn wait(
    session: &Session,
    agent_id: &str,
    ts: Stamp,
    timeout: Duration,
    interval: Duration,
    json: bool,
) -> ClockmailResult<Outcome> {
    let started = Instant::now();
    let interrupted = install_interrupt_flag();

    if !json {
        eprintln!(
            "waiting for {} to become safe (timeout={}s, poll={}s)",
            ts,
            timeout.as_secs(),
            interval.as_secs()
        );
    }

    // Check immediately before the first sleep.
    loop {
        if is_safe(session, agent_id, ts)? {
            return success(ts, json, started.elapsed());
        }
        if started.elapsed() >= timeout {
            if json {
                print_json(&serde_json::json!({
                    "epoch": ts.epoch,
                    "round": ts.round,
                    "safe": false,
                    "reason": "timeout",
                }));
            } else {
                eprintln!(
                    "TIMEOUT: {} not safe after {}s",
                    ts,
                    timeout.as_secs()
                );
            }
            return Ok(Outcome::Timeout);
        }

        // Sleep in short slices so an interrupt lands promptly.
        let deadline = Instant::now() + interval;
        while Instant::now() < deadline {
            if interrupted.load(Ordering::Relaxed) {
                eprintln!();
                eprintln!("interrupted");
                return Ok(Outcome::Interrupted);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

fn is_safe(session: &Session, agent_id: &str, ts: Stamp) -> ClockmailResult<bool> {
    let active = session.active_pointstamps()?;
    Ok(frontier_status(agent_id, ts, &active).safe_to_finalize)
}

fn success(ts: Stamp, json: bool, elapsed: Duration) -> ClockmailResult<Outcome> {
    if json {
        print_json(&serde_json::json!({
            "epoch": ts.epoch,
            "round": ts.round,
            "safe": true,
            "elapsed_ms": elapsed.as_millis() as u64,
            "mode": "wait",
        }));
    } else {
        print!("SAFE: {} -- all agents have advanced past this point", ts);
        if elapsed > Duration::from_millis(1) {
            print!(" (waited {:.1}s)", elapsed.as_secs_f64());
        }
        println!();
    }
    Ok(Outcome::Success)
}

/// SIGINT/SIGTERM flip a shared flag; the poll loop notices within 50 ms.
fn install_interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    // Registration fails only if another handler is already installed;
    // in that case the default termination behavior stands.
    let _ = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    });
    flag
}
