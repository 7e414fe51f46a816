//! Naiad-style progress frontiers.
//!
//! The frontier is the antichain (set of mutually incomparable elements) of
//! minimal active pointstamps across all agents. An agent can safely
//! finalize output for timestamp `t` only when no other agent has
//! outstanding work at any timestamp <= `t`.
//!
//! This gives fine-grained progress tracking without global barriers: agents
//! on independent epochs proceed freely, and the frontier tells each agent
//! exactly when committing is safe.

use crate::{FrontierStatus, Pointstamp, Stamp};

/// Compute the antichain of minimal active pointstamps.
///
/// A pointstamp `p` is in the frontier iff no pointstamp `q` from a
/// different agent satisfies `q.timestamp < p.timestamp` strictly. Agents
/// reporting the same timestamp all stay in; incomparable timestamps
/// coexist.
pub fn compute_frontier(active: &[Pointstamp]) -> Vec<Pointstamp> {
    // Quadratic scan; agent counts are small single digits in practice.
    active
        .iter()
        .filter(|p| {
            !active
                .iter()
                .any(|q| q.agent_id != p.agent_id && q.timestamp.less(&p.timestamp))
        })
        .cloned()
        .collect()
}

/// Check whether `agent_id` can safely finalize work at `ts` given the
/// active pointstamps of all agents.
///
/// Safe iff no *other* active agent has outstanding work at any timestamp
/// <= `ts`. The returned status carries the computed frontier and, when not
/// safe, the blocking pointstamps.
pub fn frontier_status(agent_id: &str, ts: Stamp, active: &[Pointstamp]) -> FrontierStatus {
    let blocked_by: Vec<Pointstamp> = active
        .iter()
        .filter(|p| p.agent_id != agent_id && p.timestamp.less_eq(&ts))
        .cloned()
        .collect();

    FrontierStatus {
        safe_to_finalize: blocked_by.is_empty(),
        frontier: compute_frontier(active),
        blocked_by,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ps(agent: &str, epoch: i64, round: i64) -> Pointstamp {
        Pointstamp::new(Stamp::new(epoch, round), agent)
    }

    #[test]
    fn test_empty_active_set_is_safe() {
        let status = frontier_status("alice", Stamp::new(5, 0), &[]);
        assert!(status.safe_to_finalize);
        assert!(status.frontier.is_empty());
        assert!(status.blocked_by.is_empty());
    }

    #[test]
    fn test_own_pointstamp_never_blocks() {
        let active = vec![ps("alice", 0, 0)];
        let status = frontier_status("alice", Stamp::new(1, 0), &active);
        assert!(status.safe_to_finalize);
    }

    #[test]
    fn test_blocker_at_or_below_requested() {
        let active = vec![ps("alice", 2, 0), ps("bob", 2, 0), ps("carol", 1, 0)];
        let status = frontier_status("alice", Stamp::new(1, 0), &active);
        assert!(!status.safe_to_finalize);
        assert_eq!(status.blocked_by, vec![ps("carol", 1, 0)]);
    }

    #[test]
    fn test_all_ahead_is_safe() {
        let active = vec![ps("alice", 2, 0), ps("bob", 2, 0), ps("carol", 2, 0)];
        let status = frontier_status("alice", Stamp::new(1, 0), &active);
        assert!(status.safe_to_finalize);
    }

    #[test]
    fn test_frontier_keeps_equal_stamps_from_both_agents() {
        let active = vec![ps("alice", 1, 1), ps("bob", 1, 1)];
        let frontier = compute_frontier(&active);
        assert_eq!(frontier.len(), 2);
    }

    #[test]
    fn test_frontier_drops_dominated() {
        let active = vec![ps("alice", 0, 0), ps("bob", 3, 3)];
        let frontier = compute_frontier(&active);
        assert_eq!(frontier, vec![ps("alice", 0, 0)]);
    }

    #[test]
    fn test_frontier_keeps_incomparable() {
        // (2,0) and (0,2) are incomparable; both survive.
        let active = vec![ps("alice", 2, 0), ps("bob", 0, 2)];
        let frontier = compute_frontier(&active);
        assert_eq!(frontier.len(), 2);
    }

    proptest! {
        /// The frontier is an antichain: no strict domination between
        /// members from different agents.
        #[test]
        fn prop_frontier_is_antichain(
            stamps in proptest::collection::vec((0i64..6, 0i64..6), 1..8),
        ) {
            let active: Vec<Pointstamp> = stamps
                .iter()
                .enumerate()
                .map(|(i, (e, r))| ps(&format!("a{}", i), *e, *r))
                .collect();
            let frontier = compute_frontier(&active);
            for p in &frontier {
                for q in &frontier {
                    if p.agent_id != q.agent_id {
                        prop_assert!(!q.timestamp.less(&p.timestamp));
                    }
                }
            }
        }

        /// Every active pointstamp is dominated-or-equalled by some frontier
        /// member (the frontier is the set of minimal elements).
        #[test]
        fn prop_frontier_covers_active(
            stamps in proptest::collection::vec((0i64..6, 0i64..6), 1..8),
        ) {
            let active: Vec<Pointstamp> = stamps
                .iter()
                .enumerate()
                .map(|(i, (e, r))| ps(&format!("a{}", i), *e, *r))
                .collect();
            let frontier = compute_frontier(&active);
            for p in &active {
                prop_assert!(frontier.iter().any(|f| f.timestamp.less_eq(&p.timestamp)
                    || f.agent_id == p.agent_id));
            }
        }
    }
}
