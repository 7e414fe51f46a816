//! Cross-session scenarios: every `Session` here stands for one CLI
//! invocation by one agent against the shared database file.

use std::time::Duration;

use clockmail_cli::commands::{gate, lock};
use clockmail_cli::session::Session;
use clockmail_cli::Outcome;
use clockmail_core::{EventKind, SessionConfig, StoreConfig};
use clockmail_store::Store;
use tempfile::TempDir;

fn store_at(dir: &TempDir) -> Store {
    let path = dir
        .path()
        .join("clockmail.db")
        .to_string_lossy()
        .into_owned();
    Store::open(StoreConfig {
        db_path: path,
        ..StoreConfig::default()
    })
    .unwrap()
}

fn session_for(dir: &TempDir, agent: &str) -> Session {
    Session::over(
        store_at(dir),
        SessionConfig::default(),
        Some(agent.to_string()),
    )
}

/// Sending through a session: drain, tick, one event per recipient.
fn send(session: &Session, to: &str, body: &str) -> i64 {
    let agent = session.resolve_agent().unwrap();
    let mut clock = session.clock_for(&agent).unwrap();
    session.drain_inbox(&agent, &mut clock).unwrap();
    let (epoch, round) = session.resolve_epoch_round(&agent, -1, -1).unwrap();
    let ts = clock.tick();
    session
        .store
        .update_agent_clock(&agent, ts, epoch, round)
        .unwrap();
    for recipient in session.resolve_recipients(to, &agent).unwrap() {
        session
            .store
            .insert_event(
                &clockmail_store::NewEvent::new(&agent, ts, EventKind::Msg)
                    .at(epoch, round)
                    .target(&recipient)
                    .body(body),
            )
            .unwrap();
    }
    ts
}

#[test]
fn message_causality_chain() {
    let dir = TempDir::new().unwrap();
    let alice = session_for(&dir, "alice");
    let bob = session_for(&dir, "bob");
    alice.store.register_agent("alice").unwrap();
    alice.store.register_agent("bob").unwrap();

    // alice sends "hi": IR1 from 0 stamps ts=1.
    let ts = send(&alice, "bob", "hi");
    assert_eq!(ts, 1);

    // bob drains: IR2 takes bob's clock to max(0, 1) + 1 = 2.
    let mut bob_clock = bob.clock_for("bob").unwrap();
    let drained = bob.drain_inbox("bob", &mut bob_clock).unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(bob_clock.value(), 2);

    // bob replies: IR1 stamps ts=3, strictly after the message he read.
    let reply_ts = send(&bob, "alice", "hello");
    assert_eq!(reply_ts, 3);

    // alice drains: clock becomes max(1, 3) + 1 = 4.
    let mut alice_clock = alice.clock_for("alice").unwrap();
    alice.drain_inbox("alice", &mut alice_clock).unwrap();
    assert_eq!(alice_clock.value(), 4);
}

#[test]
fn same_author_events_strictly_increase() {
    let dir = TempDir::new().unwrap();
    let alice = session_for(&dir, "alice");
    alice.store.register_agent("alice").unwrap();
    alice.store.register_agent("bob").unwrap();

    let mut previous = 0;
    for n in 0..5 {
        let ts = send(&alice, "bob", &format!("update {}", n));
        assert!(ts > previous);
        previous = ts;
    }
}

#[test]
fn review_done_happens_after_review_request() {
    let dir = TempDir::new().unwrap();
    let author = session_for(&dir, "author");
    let reviewer = session_for(&dir, "reviewer");
    author.store.register_agent("author").unwrap();
    author.store.register_agent("reviewer").unwrap();

    // Author has been busy: clock well ahead of the reviewer's.
    author.store.update_agent_clock("author", 10, 0, 0).unwrap();

    let mut clock = author.clock_for("author").unwrap();
    author.drain_inbox("author", &mut clock).unwrap();
    let (request_ts, _) = author
        .emit(
            "author",
            &mut clock,
            0,
            0,
            EventKind::ReviewReq,
            "reviewer",
            r#"{"type":"review-request","commit":"abc123"}"#,
        )
        .unwrap();
    assert_eq!(request_ts, 11);

    // Reviewer starts cold at clock 0, but the drain-then-send discipline
    // pushes the verdict past the request: IR2 then IR1.
    let mut rev_clock = reviewer.clock_for("reviewer").unwrap();
    let drained = reviewer.drain_inbox("reviewer", &mut rev_clock).unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].kind, EventKind::ReviewReq);

    let (done_ts, _) = reviewer
        .emit(
            "reviewer",
            &mut rev_clock,
            0,
            0,
            EventKind::ReviewDone,
            "author",
            r#"{"type":"review-done","commit":"abc123","verdict":"pass"}"#,
        )
        .unwrap();
    assert!(done_ts > request_ts);
}

#[test]
fn lock_command_exit_codes() {
    let dir = TempDir::new().unwrap();
    let alice = session_for(&dir, "alice");
    let bob = session_for(&dir, "bob");
    alice.store.register_agent("alice").unwrap();
    alice.store.register_agent("bob").unwrap();

    let args = lock::LockArgs {
        path: "auth.go".to_string(),
        ttl: 3600,
        epoch: -1,
    };
    let granted = lock::run(&alice, &args, true).unwrap();
    assert_eq!(granted, Outcome::Success);
    assert_eq!(granted.code(), 0);

    // bob requests later in the total order: denied, exit code 2.
    let denied = lock::run(&bob, &args, true).unwrap();
    assert_eq!(denied, Outcome::Denied);
    assert_eq!(denied.code(), 2);
}

#[test]
fn gate_check_reports_safe_and_blocked() {
    let dir = TempDir::new().unwrap();
    let alice = session_for(&dir, "alice");
    alice.store.register_agent("alice").unwrap();
    alice.store.register_agent("bob").unwrap();
    alice.store.register_agent("carol").unwrap();
    for id in ["alice", "bob", "carol"] {
        alice.store.update_agent_clock(id, 1, 2, 0).unwrap();
    }

    // Everyone at epoch 2: finalizing (1, 0) is safe.
    let args = gate::GateArgs {
        epoch: 1,
        round: 0,
        timeout: 1,
        interval: 1,
        check: true,
    };
    assert_eq!(gate::run(&alice, &args, true).unwrap(), Outcome::Success);

    // carol drops back to (1, 0): not safe any more, exit code 2.
    alice.store.update_agent_clock("carol", 2, 1, 0).unwrap();
    let outcome = gate::run(&alice, &args, true).unwrap();
    assert_eq!(outcome, Outcome::Denied);
    assert_eq!(outcome.code(), 2);
}

#[test]
fn gate_wait_unblocks_on_late_heartbeat() {
    let dir = TempDir::new().unwrap();
    let alice = session_for(&dir, "alice");
    alice.store.register_agent("alice").unwrap();
    alice.store.register_agent("bob").unwrap();
    alice.store.update_agent_clock("alice", 1, 2, 0).unwrap();
    // bob sits at epoch 0, blocking epoch 1.

    let bob_store = store_at(&dir);
    let mover = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        bob_store.update_agent_clock("bob", 1, 2, 0).unwrap();
    });

    let args = gate::GateArgs {
        epoch: 1,
        round: 0,
        timeout: 10,
        interval: 1,
        check: false,
    };
    let outcome = gate::run(&alice, &args, true).unwrap();
    mover.join().unwrap();
    assert_eq!(outcome, Outcome::Success);
}

#[test]
fn gate_wait_times_out_when_nobody_advances() {
    let dir = TempDir::new().unwrap();
    let alice = session_for(&dir, "alice");
    alice.store.register_agent("alice").unwrap();
    alice.store.register_agent("bob").unwrap();
    alice.store.update_agent_clock("alice", 1, 2, 0).unwrap();
    alice.store.update_agent_clock("bob", 1, 0, 0).unwrap();

    let args = gate::GateArgs {
        epoch: 1,
        round: 0,
        timeout: 1,
        interval: 1,
        check: false,
    };
    let outcome = gate::run(&alice, &args, true).unwrap();
    assert_eq!(outcome, Outcome::Timeout);
    assert_eq!(outcome.code(), 1);
}

#[test]
fn stale_clock_self_corrects_through_drain() {
    // A crash between event insert and clock persist leaves the agent row
    // behind the log. The next session seeds low but IR2 on any received
    // message lifts it past everything already written.
    let dir = TempDir::new().unwrap();
    let alice = session_for(&dir, "alice");
    alice.store.register_agent("alice").unwrap();
    alice.store.register_agent("bob").unwrap();

    // Event at ts=9 exists while the persisted clock still says 2.
    alice
        .store
        .insert_event(
            &clockmail_store::NewEvent::new("bob", 9, EventKind::Msg)
                .target("alice")
                .body("late"),
        )
        .unwrap();
    alice.store.update_agent_clock("alice", 2, 0, 0).unwrap();

    let mut clock = alice.clock_for("alice").unwrap();
    assert_eq!(clock.value(), 2);
    alice.drain_inbox("alice", &mut clock).unwrap();
    assert_eq!(clock.value(), 10);
}
