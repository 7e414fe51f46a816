//! Lamport logical clock.
//!
//! From Lamport (1978), two implementation rules govern the clock:
//!
//! - IR1 (internal event): before any internal event, increment the clock.
//! - IR2 (message receipt): on receiving a message with timestamp `t`,
//!   set the clock to `max(own, t) + 1`.
//!
//! [`total_order_less`] breaks timestamp ties deterministically using agent
//! ids, giving every participant the same ordering without coordination.
//!
//! A `LamportClock` is not shared across threads. Each session holds its own
//! instance, seeded from the agent's persisted value at entry; cross-process
//! safety is delegated to the store's transactional writes.

/// A Lamport logical clock. Single-owner; see module doc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LamportClock {
    ts: i64,
}

impl LamportClock {
    /// Create a clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock seeded at a specific value, e.g. the agent's persisted
    /// clock loaded at session entry.
    pub fn seeded(value: i64) -> Self {
        Self { ts: value }
    }

    /// IR1: increment the clock before an internal event. Returns the new
    /// timestamp.
    pub fn tick(&mut self) -> i64 {
        self.ts += 1;
        self.ts
    }

    /// IR2: on receiving a message stamped `received`, advance to
    /// `max(own, received) + 1`. Returns the new timestamp.
    pub fn receive(&mut self, received: i64) -> i64 {
        if received > self.ts {
            self.ts = received;
        }
        self.ts += 1;
        self.ts
    }

    /// Current clock value, without advancing it.
    pub fn value(&self) -> i64 {
        self.ts
    }

    /// Reset the clock to a specific value.
    pub fn set(&mut self, value: i64) {
        self.ts = value;
    }
}

/// The deterministic total order over events.
///
/// Event A precedes event B iff `ts_a < ts_b`, or the timestamps are equal
/// and `agent_a` sorts lexicographically before `agent_b`. This is the
/// standard Lamport total order used for mutual exclusion: strict,
/// transitive, and trichotomous on distinct (ts, agent) pairs.
pub fn total_order_less(ts_a: i64, agent_a: &str, ts_b: i64, agent_b: &str) -> bool {
    if ts_a != ts_b {
        return ts_a < ts_b;
    }
    agent_a < agent_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tick_pre_increments() {
        let mut c = LamportClock::new();
        assert_eq!(c.tick(), 1);
        assert_eq!(c.tick(), 2);
        assert_eq!(c.value(), 2);
    }

    #[test]
    fn test_receive_advances_past_incoming() {
        let mut c = LamportClock::new();
        assert_eq!(c.receive(10), 11);
        assert_eq!(c.value(), 11);
    }

    #[test]
    fn test_receive_below_counter_still_advances() {
        let mut c = LamportClock::seeded(20);
        // Stale incoming timestamp: the clock must still strictly advance.
        assert_eq!(c.receive(5), 21);
    }

    #[test]
    fn test_seed_then_tick() {
        let mut c = LamportClock::seeded(41);
        assert_eq!(c.tick(), 42);
    }

    #[test]
    fn test_total_order_timestamp_first() {
        assert!(total_order_less(1, "zoe", 2, "alice"));
        assert!(!total_order_less(2, "alice", 1, "zoe"));
    }

    #[test]
    fn test_total_order_agent_breaks_ties() {
        assert!(total_order_less(5, "alice", 5, "bob"));
        assert!(!total_order_less(5, "bob", 5, "alice"));
    }

    #[test]
    fn test_total_order_irreflexive() {
        assert!(!total_order_less(3, "alice", 3, "alice"));
    }

    proptest! {
        /// Trichotomy: for distinct (ts, agent) pairs exactly one of
        /// a < b, b < a holds; for equal pairs neither does.
        #[test]
        fn prop_total_order_trichotomous(
            ts_a in 0i64..1000, ts_b in 0i64..1000,
            a in "[a-z]{1,8}", b in "[a-z]{1,8}",
        ) {
            let ab = total_order_less(ts_a, &a, ts_b, &b);
            let ba = total_order_less(ts_b, &b, ts_a, &a);
            if ts_a == ts_b && a == b {
                prop_assert!(!ab && !ba);
            } else {
                prop_assert!(ab ^ ba);
            }
        }

        #[test]
        fn prop_total_order_transitive(
            ts in proptest::collection::vec(0i64..100, 3),
            ids in proptest::collection::vec("[a-z]{1,4}", 3),
        ) {
            let (ta, tb, tc) = (ts[0], ts[1], ts[2]);
            let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
            if total_order_less(ta, a, tb, b) && total_order_less(tb, b, tc, c) {
                prop_assert!(total_order_less(ta, a, tc, c));
            }
        }

        /// IR2 always strictly advances the clock, whatever the incoming value.
        #[test]
        fn prop_receive_strictly_monotonic(seed in 0i64..10_000, incoming in 0i64..10_000) {
            let mut clock = LamportClock::seeded(seed);
            let after = clock.receive(incoming);
            prop_assert!(after > seed);
            prop_assert!(after > incoming);
        }
    }
}
