//! cm - coordination for concurrent AI agent sessions.
//!
//! Lamport clocks for causal ordering. Naiad frontiers for progress
//! tracking. Shared SQLite for zero-config communication.

use clap::{Parser, Subcommand};
use clockmail_cli::commands::{
    frontier, gate, heartbeat, init, lock, log, onboard, prime, recv, register, review, send,
    status, sync, unlock, watch,
};
use clockmail_cli::session::Session;
use clockmail_cli::Outcome;
use clockmail_core::{ClockmailResult, ENV_LOG};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cm",
    version,
    about = "cm - coordination for concurrent AI agent sessions",
    long_about = "Lamport clocks for causal ordering. Naiad frontiers for progress tracking.\n\
                  Shared SQLite for zero-config communication.\n\n\
                  Environment:\n  \
                  CLOCKMAIL_DB      SQLite database path (default: .clockmail/clockmail.db)\n  \
                  CLOCKMAIL_AGENT   Default agent ID (avoids passing --agent every time)\n\n\
                  Exit codes:\n  \
                  0  success\n  \
                  1  error\n  \
                  2  lock denied / gate not safe (conflict)"
)]
struct Cli {
    /// Agent ID (overrides CLOCKMAIL_AGENT)
    #[arg(long, global = true)]
    agent: Option<String>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize clockmail, inject the AGENTS.md section
    Init(init::InitArgs),

    /// Minimal primer for cold-start agents
    Onboard(onboard::OnboardArgs),

    /// Dynamic coordination context (run at session start)
    Prime(prime::PrimeArgs),

    /// Register an agent session
    Register(register::RegisterArgs),

    /// Advance clock, report working position
    #[command(visible_alias = "hb")]
    Heartbeat(heartbeat::HeartbeatArgs),

    /// Send a message (drains inbox first, bidirectional)
    #[command(visible_aliases = ["ex", "exchange"])]
    Send(send::SendArgs),

    /// Send to all agents (shorthand for: send all <msg>)
    Broadcast(BroadcastArgs),

    /// Receive messages (Lamport IR2, cursor-consuming)
    Recv(recv::RecvArgs),

    /// Acquire an exclusive file lock (total order)
    Lock(lock::LockArgs),

    /// Release a file lock
    Unlock(unlock::UnlockArgs),

    /// Block until the frontier passes an epoch (test gating)
    Gate(gate::GateArgs),

    /// Signal a commit is ready for review
    #[command(name = "review-request", visible_alias = "rr")]
    ReviewRequest(review::ReviewRequestArgs),

    /// Signal a review is complete with a pass/fail verdict
    #[command(name = "review-done", visible_alias = "rd")]
    ReviewDone(review::ReviewDoneArgs),

    /// Check frontier safety at a timestamp
    Frontier(frontier::FrontierArgs),

    /// Query the append-only event log
    Log(log::LogArgs),

    /// Combined: heartbeat + recv + frontier
    Sync(sync::SyncArgs),

    /// Stream messages (or all events with --all)
    Watch(watch::WatchArgs),

    /// Show agent state, locks, frontier overview
    Status(status::StatusArgs),
}

#[derive(Debug, clap::Args)]
struct BroadcastArgs {
    /// Message body (words are joined with spaces)
    #[arg(required = true)]
    message: Vec<String>,

    /// Epoch context (-1 = keep current)
    #[arg(long, default_value_t = -1)]
    epoch: i64,

    /// Round context (-1 = keep current)
    #[arg(long, default_value_t = -1)]
    round: i64,
}

fn main() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Argument errors are configuration errors (exit 1); code 2 is reserved
    // for denied locks and unsafe gates.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let session = match Session::from_env(cli.agent.clone()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("cm: {}", err);
            std::process::exit(1);
        }
    };

    match dispatch(&session, &cli.command, cli.json) {
        Ok(outcome) => std::process::exit(outcome.code()),
        Err(err) => {
            eprintln!("cm: {}", err);
            std::process::exit(1);
        }
    }
}

fn dispatch(session: &Session, command: &Command, json: bool) -> ClockmailResult<Outcome> {
    match command {
        Command::Init(args) => init::run(session, args, json),
        Command::Onboard(args) => onboard::run(session, args, json),
        Command::Prime(args) => prime::run(session, args, json),
        Command::Register(args) => register::run(session, args, json),
        Command::Heartbeat(args) => heartbeat::run(session, args, json),
        Command::Send(args) => send::run(session, args, json),
        Command::Broadcast(args) => send::run(
            session,
            &send::SendArgs {
                to: "all".to_string(),
                message: args.message.clone(),
                epoch: args.epoch,
                round: args.round,
            },
            json,
        ),
        Command::Recv(args) => recv::run(session, args, json),
        Command::Lock(args) => lock::run(session, args, json),
        Command::Unlock(args) => unlock::run(session, args, json),
        Command::Gate(args) => gate::run(session, args, json),
        Command::ReviewRequest(args) => review::run_request(session, args, json),
        Command::ReviewDone(args) => review::run_done(session, args, json),
        Command::Frontier(args) => frontier::run(session, args, json),
        Command::Log(args) => log::run(session, args, json),
        Command::Sync(args) => sync::run(session, args, json),
        Command::Watch(args) => watch::run(session, args, json),
        Command::Status(args) => status::run(session, args, json),
    }
}
