//! `cm review-request` / `cm review-done` - causally ordered code review.
//!
//! The drain-then-send discipline guarantees a review-done's Lamport
//! timestamp strictly exceeds the corresponding review-request's: the
//! reviewer received the request (IR2) before emitting the verdict (IR1).
//! That happened-after relationship is the one causality guarantee the
//! system makes about review ordering.

use crate::output::{print_inbox, print_json};
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::{ClockmailResult, EventKind, ReviewPayload, ReviewVerdict};
use clockmail_store::NewEvent;

#[derive(Debug, Args)]
pub struct ReviewRequestArgs {
    /// Git commit identifier (short or full)
    pub commit: String,

    /// Affected files
    pub files: Vec<String>,

    /// Reviewer agent id, list, or "all"
    #[arg(long, default_value = "tester")]
    pub to: String,
}

#[derive(Debug, Args)]
pub struct ReviewDoneArgs {
    /// Git commit identifier the verdict applies to
    pub commit: String,

    /// Verdict: pass or fail
    pub verdict: ReviewVerdict,

    /// Optional reviewer comment (words are joined with spaces)
    pub comment: Vec<String>,

    /// Author agent id to notify, list, or "all"
    #[arg(long, default_value = "all")]
    pub to: String,
}

pub fn run_request(
    session: &Session,
    args: &ReviewRequestArgs,
    json: bool,
) -> ClockmailResult<Outcome> {
    let payload = ReviewPayload::request(&args.commit, args.files.clone());
    let sent = send_review(session, EventKind::ReviewReq, &args.to, &payload, json)?;

    if json {
        print_json(&serde_json::json!({
            "lamport_ts": sent.ts,
            "event_ids": sent.event_ids,
            "commit": args.commit,
            "files": args.files,
            "recipients": sent.recipients,
            "type": "review-request",
        }));
    } else {
        let files = if args.files.is_empty() {
            String::new()
        } else {
            format!(" files=[{}]", args.files.join(", "))
        };
        println!(
            "review-request sent to {} at ts={} commit={}{}",
            sent.recipients.join(","),
            sent.ts,
            args.commit,
            files
        );
    }
    Ok(Outcome::Success)
}

pub fn run_done(session: &Session, args: &ReviewDoneArgs, json: bool) -> ClockmailResult<Outcome> {
    let comment = args.comment.join(" ");
    let payload = ReviewPayload::done(&args.commit, args.verdict, comment.clone());
    let sent = send_review(session, EventKind::ReviewDone, &args.to, &payload, json)?;

    if json {
        print_json(&serde_json::json!({
            "lamport_ts": sent.ts,
            "event_ids": sent.event_ids,
            "commit": args.commit,
            "verdict": args.verdict,
            "comment": comment,
            "recipients": sent.recipients,
            "type": "review-done",
        }));
    } else {
        let comment_str = if comment.is_empty() {
            String::new()
        } else {
            format!(" comment={:?}", comment)
        };
        println!(
            "review-done sent to {} at ts={} commit={} verdict={}{}",
            sent.recipients.join(","),
            sent.ts,
            args.commit,
            args.verdict,
            comment_str
        );
    }
    Ok(Outcome::Success)
}

struct SentReview {
    ts: i64,
    event_ids: Vec<i64>,
    recipients: Vec<String>,
}

fn send_review(
    session: &Session,
    kind: EventKind,
    to: &str,
    payload: &ReviewPayload,
    json: bool,
) -> ClockmailResult<SentReview> {
    let agent_id = session.resolve_agent()?;
    let (epoch, round) = session.resolve_epoch_round(&agent_id, -1, -1)?;

    let mut clock = session.clock_for(&agent_id)?;

    // Drain first (IR2), so the outgoing stamp happens-after everything read.
    let inbox = session.drain_inbox(&agent_id, &mut clock)?;
    if !json {
        print_inbox(&inbox);
    }

    let body = serde_json::to_string(payload).unwrap_or_default();

    let ts = clock.tick();
    session
        .store
        .update_agent_clock(&agent_id, ts, epoch, round)?;

    let recipients = session.resolve_recipients(to, &agent_id)?;
    let mut event_ids = Vec::with_capacity(recipients.len());
    for recipient in &recipients {
        let id = session.store.insert_event(
            &NewEvent::new(&agent_id, ts, kind)
                .at(epoch, round)
                .target(recipient)
                .body(&body),
        )?;
        event_ids.push(id);
    }

    Ok(SentReview {
        ts,
        event_ids,
        recipients,
    })
}
