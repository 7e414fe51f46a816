//! `cm send <to> <message>` - drain the inbox, then send.
//!
//! Sending is bidirectional by default: every outbound message forces
//! reading inbound ones first, so the sender's clock reflects everything it
//! has been told before it speaks.

use crate::output::{print_inbox, print_json};
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, EventKind};

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Recipient agent id, comma-separated list, or "all"
    pub to: String,

    /// Message body (words are joined with spaces)
    #[arg(required = true)]
    pub message: Vec<String>,

    /// Epoch context (-1 = keep current)
    #[arg(long, default_value_t = -1)]
    pub epoch: i64,

    /// Round context (-1 = keep current)
    #[arg(long, default_value_t = -1)]
    pub round: i64,
}

pub fn run(session: &Session, args: &SendArgs, json: bool) -> ClockmailResult<Outcome> {
    let agent_id = session.resolve_agent()?;
    let (epoch, round) = session.resolve_epoch_round(&agent_id, args.epoch, args.round)?;
    let body = args.message.join(" ");

    let mut clock = session.clock_for(&agent_id)?;

    // Lamport IR2 first: read before you write.
    let inbox = session.drain_inbox(&agent_id, &mut clock)?;
    if !json {
        if inbox.is_empty() {
            println!("(no pending messages)");
            println!();
        } else {
            print_inbox(&inbox);
        }
    }

    let recipients = session.resolve_recipients(&args.to, &agent_id)?;

    // Lamport IR1: one tick stamps the whole fan-out.
    let ts = clock.tick();
    session
        .store
        .update_agent_clock(&agent_id, ts, epoch, round)?;

    let mut event_ids = Vec::with_capacity(recipients.len());
    for recipient in &recipients {
        let id = session.store.insert_event(
            &clockmail_store::NewEvent::new(&agent_id, ts, EventKind::Msg)
                .at(epoch, round)
                .target(recipient)
                .body(&body),
        )?;
        event_ids.push(id);
    }

    if json {
        print_json(&serde_json::json!({
            "lamport_ts": ts,
            "event_ids": event_ids,
            "recipients": recipients,
            "inbox": inbox,
            "inbox_count": inbox.len(),
        }));
    } else {
        println!(
            "sent to {} at ts={} ({} recipients)",
            args.to,
            ts,
            event_ids.len()
        );
    }
    Ok(Outcome::Success)
}
