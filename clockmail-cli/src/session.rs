//! The session orchestrator.
//!
//! Every user-facing operation runs through a [`Session`]: resolve the agent
//! identity, seed a fresh Lamport clock from the agent row, drain the inbox
//! before outbound work, emit events under IR1, and write the advanced clock
//! and cursor back.

use clockmail_core::{
    Agent, ClockmailResult, ConfigError, CoordinationError, Event, EventKind, LamportClock,
    Pointstamp, SessionConfig, Stamp, StoreConfig, ENV_AGENT,
};
use clockmail_store::{NewEvent, Store};
use tracing::debug;

/// Shared state for one CLI invocation.
pub struct Session {
    pub store: Store,
    pub config: SessionConfig,
    /// Database path, kept for display
    pub db_path: String,
    /// Per-invocation identity override (--agent)
    agent_override: Option<String>,
}

impl Session {
    /// Open the store and resolve configuration from the environment.
    pub fn from_env(agent_override: Option<String>) -> ClockmailResult<Self> {
        let store_cfg = StoreConfig::from_env();
        let db_path = store_cfg.db_path.clone();
        let store = Store::open(store_cfg)?;
        Ok(Self {
            store,
            config: SessionConfig::from_env(),
            db_path,
            agent_override,
        })
    }

    /// Build over an existing store (tests).
    pub fn over(store: Store, config: SessionConfig, agent_override: Option<String>) -> Self {
        Self {
            store,
            config,
            db_path: String::new(),
            agent_override,
        }
    }

    /// The agent id for this invocation: the `--agent` flag when given,
    /// else the environment default. Operations that require identity error
    /// without one.
    pub fn resolve_agent(&self) -> Result<String, ConfigError> {
        self.agent_override
            .clone()
            .or_else(|| self.config.agent_id.clone())
            .ok_or(ConfigError::MissingAgentId {
                env_var: ENV_AGENT.to_string(),
            })
    }

    /// Like [`resolve_agent`](Self::resolve_agent) but tolerating absence,
    /// for read-only views that merely personalize their output.
    pub fn resolve_agent_opt(&self) -> Option<String> {
        self.resolve_agent().ok()
    }

    /// A Lamport clock seeded from the agent's persisted value (zero when
    /// the agent is unregistered). Each agent owns its clock exclusively;
    /// two live sessions under one identity are a configuration error.
    pub fn clock_for(&self, agent_id: &str) -> ClockmailResult<LamportClock> {
        let seed = self
            .store
            .get_agent(agent_id)?
            .map(|a| a.clock)
            .unwrap_or(0);
        Ok(LamportClock::seeded(seed))
    }

    /// Resolve the (epoch, round) to operate at. A sentinel of -1 on either
    /// coordinate keeps the agent's persisted value; a missing agent row
    /// defaults both to 0.
    pub fn resolve_epoch_round(
        &self,
        agent_id: &str,
        flag_epoch: i64,
        flag_round: i64,
    ) -> ClockmailResult<(i64, i64)> {
        if flag_epoch >= 0 && flag_round >= 0 {
            return Ok((flag_epoch, flag_round));
        }
        let stored = self.store.get_agent(agent_id)?;
        let (cur_e, cur_r) = stored.map(|a| (a.epoch, a.round)).unwrap_or((0, 0));
        Ok((
            if flag_epoch >= 0 { flag_epoch } else { cur_e },
            if flag_round >= 0 { flag_round } else { cur_r },
        ))
    }

    /// Drain the inbox: read every message targeted to this agent at or
    /// past the cursor, apply IR2 per message, persist the advanced clock,
    /// and move the cursor to max(ts)+1. Returns the drained events; the
    /// caller decides whether to display them.
    pub fn drain_inbox(
        &self,
        agent_id: &str,
        clock: &mut LamportClock,
    ) -> ClockmailResult<Vec<Event>> {
        let since = self.store.get_cursor(agent_id)?;
        let events = self.store.list_events_for_agent(
            agent_id,
            since,
            self.config.default_event_limit as i64,
        )?;
        if events.is_empty() {
            return Ok(events);
        }

        let mut max_ts = 0;
        for event in &events {
            clock.receive(event.lamport_ts);
            max_ts = max_ts.max(event.lamport_ts);
        }

        if let Some(agent) = self.store.get_agent(agent_id)? {
            self.store
                .update_agent_clock(agent_id, clock.value(), agent.epoch, agent.round)?;
        }
        self.store.set_cursor(agent_id, max_ts + 1)?;
        debug!(
            agent = agent_id,
            drained = events.len(),
            clock = clock.value(),
            cursor = max_ts + 1,
            "inbox drained"
        );
        Ok(events)
    }

    /// Emit a locally-originated event: IR1 tick, persist clock and
    /// position, then append. Returns (lamport_ts, row id).
    ///
    /// The clock persists before the insert, so a crash between the two
    /// statements understates the clock rather than losing the event; IR2
    /// corrects the understatement on the next receive.
    pub fn emit(
        &self,
        agent_id: &str,
        clock: &mut LamportClock,
        epoch: i64,
        round: i64,
        kind: EventKind,
        target: &str,
        body: &str,
    ) -> ClockmailResult<(i64, i64)> {
        let ts = clock.tick();
        self.store.update_agent_clock(agent_id, ts, epoch, round)?;
        let row_id = self.store.insert_event(
            &NewEvent::new(agent_id, ts, kind)
                .at(epoch, round)
                .target(target)
                .body(body),
        )?;
        Ok((ts, row_id))
    }

    /// Expand a recipient spec: comma-separated ids are split and trimmed;
    /// the token "all" (case-insensitive) becomes every registered agent
    /// except the sender. An empty expansion is an error.
    pub fn resolve_recipients(
        &self,
        spec: &str,
        sender: &str,
    ) -> ClockmailResult<Vec<String>> {
        let mut recipients = Vec::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part.eq_ignore_ascii_case("all") {
                for agent in self.store.list_agents()? {
                    if agent.id != sender && !recipients.contains(&agent.id) {
                        recipients.push(agent.id);
                    }
                }
            } else if !recipients.iter().any(|r| r == part) {
                recipients.push(part.to_string());
            }
        }
        if recipients.is_empty() {
            return Err(CoordinationError::EmptyRecipients {
                spec: spec.to_string(),
            }
            .into());
        }
        Ok(recipients)
    }

    /// Active pointstamps under the configured liveness window.
    pub fn active_pointstamps(&self) -> ClockmailResult<Vec<Pointstamp>> {
        Ok(self.store.active_pointstamps(self.config.liveness_window)?)
    }

    /// The working position of `agent_id` within a pre-fetched agent list,
    /// defaulting to (0, 0) when unregistered.
    pub fn agent_stamp(agents: &[Agent], agent_id: &str) -> Stamp {
        agents
            .iter()
            .find(|a| a.id == agent_id)
            .map(|a| a.stamp())
            .unwrap_or_default()
    }
}
