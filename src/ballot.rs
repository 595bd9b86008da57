//! # Summary
//!
//! This module defines [`Ballot`], the monotonic round identifier Paxos
//! safety depends on. A ballot pairs a proposer's wall-clock timestamp with
//! its stable identity so that two ballots are always comparable, even when
//! two proposers draw timestamps with the same resolution.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Nanoseconds since the Unix epoch. Used both as a ballot's `proposal_no`
/// and as a lease's `expiry`, so that ballot order and lease temporal order
/// stay consistent (see [`crate::lease`]).
pub type Timestamp = u128;

/// Samples the local wall clock, in nanoseconds since the Unix epoch.
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("[INTERNAL ERROR]: system clock is before the Unix epoch")
        .as_nanos()
}

/// A monotonic round identifier `(proposal_no, proposer_id)`.
///
/// Total order: `a < b` iff `a.proposal_no < b.proposal_no`, ties broken by
/// `proposer_id`. Any two ballots are comparable, and equality is strict
/// component-wise.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Ballot {
    /// Wall-clock timestamp of the proposer at issue time.
    pub proposal_no: Timestamp,
    /// Unique, stable-for-the-life-of-the-process proposer identity.
    pub proposer_id: u64,
}

impl Ballot {
    /// Draws a fresh ballot from the current wall clock for `proposer_id`.
    pub fn new(proposer_id: u64) -> Self {
        Ballot {
            proposal_no: now(),
            proposer_id,
        }
    }
}

impl std::fmt::Display for Ballot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.proposal_no, self.proposer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_proposal_no_first() {
        let a = Ballot { proposal_no: 1, proposer_id: 9 };
        let b = Ballot { proposal_no: 2, proposer_id: 0 };
        assert!(a < b);
    }

    #[test]
    fn breaks_ties_by_proposer_id() {
        let a = Ballot { proposal_no: 5, proposer_id: 1 };
        let b = Ballot { proposal_no: 5, proposer_id: 2 };
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn equal_components_are_equal() {
        let a = Ballot { proposal_no: 5, proposer_id: 1 };
        let b = Ballot { proposal_no: 5, proposer_id: 1 };
        assert_eq!(a, b);
    }

    #[test]
    fn fresh_ballots_are_non_decreasing() {
        let a = Ballot::new(0);
        let b = Ballot::new(0);
        assert!(a <= b);
    }
}
