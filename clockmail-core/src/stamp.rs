//! Naiad-style structured timestamps.
//!
//! A [`Stamp`] is an (epoch, round) pair under the componentwise partial
//! order. Epoch identifies a batch of work (a task, a PR, a feature); round
//! identifies a refinement iteration within it. Two stamps with `e1 < e2`
//! but `r1 > r2` are incomparable, which is what lets independent agents
//! advance without a barrier.

use serde::{Deserialize, Serialize};

/// Structured timestamp: (epoch, round), both non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    pub epoch: i64,
    pub round: i64,
}

impl Stamp {
    pub fn new(epoch: i64, round: i64) -> Self {
        Self { epoch, round }
    }

    /// `self <= other` in the partial order: componentwise on both axes.
    pub fn less_eq(&self, other: &Stamp) -> bool {
        self.epoch <= other.epoch && self.round <= other.round
    }

    /// `self < other`: less-or-equal and not equal.
    pub fn less(&self, other: &Stamp) -> bool {
        self.less_eq(other) && self != other
    }
}

impl std::fmt::Display for Stamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "epoch={} round={}", self.epoch, self.round)
    }
}

/// A (timestamp, agent) pair from Naiad. The "location" dimension of the
/// original model is the agent identity here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointstamp {
    pub timestamp: Stamp,
    pub agent_id: String,
}

impl Pointstamp {
    pub fn new(timestamp: Stamp, agent_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            agent_id: agent_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_less_eq_componentwise() {
        assert!(Stamp::new(1, 1).less_eq(&Stamp::new(2, 2)));
        assert!(Stamp::new(1, 1).less_eq(&Stamp::new(1, 1)));
        assert!(!Stamp::new(2, 0).less_eq(&Stamp::new(1, 5)));
    }

    #[test]
    fn test_less_is_strict() {
        assert!(Stamp::new(0, 0).less(&Stamp::new(0, 1)));
        assert!(!Stamp::new(1, 1).less(&Stamp::new(1, 1)));
    }

    #[test]
    fn test_incomparable_stamps() {
        // Higher epoch but lower round: neither precedes the other.
        let a = Stamp::new(2, 0);
        let b = Stamp::new(1, 3);
        assert!(!a.less_eq(&b));
        assert!(!b.less_eq(&a));
    }

    proptest! {
        #[test]
        fn prop_less_eq_reflexive(e in 0i64..100, r in 0i64..100) {
            let s = Stamp::new(e, r);
            prop_assert!(s.less_eq(&s));
        }

        #[test]
        fn prop_less_eq_antisymmetric(
            e1 in 0i64..50, r1 in 0i64..50,
            e2 in 0i64..50, r2 in 0i64..50,
        ) {
            let a = Stamp::new(e1, r1);
            let b = Stamp::new(e2, r2);
            if a.less_eq(&b) && b.less_eq(&a) {
                prop_assert_eq!(a, b);
            }
        }

        #[test]
        fn prop_less_eq_transitive(
            coords in proptest::collection::vec((0i64..20, 0i64..20), 3),
        ) {
            let a = Stamp::new(coords[0].0, coords[0].1);
            let b = Stamp::new(coords[1].0, coords[1].1);
            let c = Stamp::new(coords[2].0, coords[2].1);
            if a.less_eq(&b) && b.less_eq(&c) {
                prop_assert!(a.less_eq(&c));
            }
        }
    }
}
