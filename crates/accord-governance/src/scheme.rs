// crates/accord-governance/src/scheme.rs
//
// Vote tallying and outcome rules for validation schemes.
//
// The outcome is always a pure function of (scheme, eligible pool, vote set).
// Nothing here keeps running counters, so the order in which votes arrive
// cannot change the result.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use accord_core::error::AccordError;
use accord_core::identity::AgentId;
use accord_core::validation::{ValidationScheme, Vote, VoteDecision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Pending,
    Approved,
    Rejected,
}

/// Vote counts over an eligible pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub approvals: usize,
    pub rejections: usize,
    /// Eligible validators that have not voted.
    pub undecided: usize,
}

impl Tally {
    pub fn eligible(&self) -> usize {
        self.approvals + self.rejections + self.undecided
    }
}

/// Count the latest decision of each eligible validator.
///
/// Votes from agents outside `eligible` are ignored. If the same validator
/// appears more than once the vote with the latest `cast_at` wins.
pub fn tally(eligible: &BTreeSet<AgentId>, votes: &[Vote]) -> Tally {
    latest_votes(eligible, votes)
        .values()
        .fold(
            Tally {
                undecided: eligible.len(),
                ..Default::default()
            },
            |mut t, decision| {
                t.undecided -= 1;
                match decision {
                    VoteDecision::Approve => t.approvals += 1,
                    VoteDecision::Reject => t.rejections += 1,
                }
                t
            },
        )
}

/// The effective decision per eligible validator.
pub fn latest_votes(
    eligible: &BTreeSet<AgentId>,
    votes: &[Vote],
) -> BTreeMap<AgentId, VoteDecision> {
    let mut latest: BTreeMap<AgentId, &Vote> = BTreeMap::new();
    for vote in votes.iter().filter(|v| eligible.contains(&v.validator)) {
        match latest.get(&vote.validator) {
            // Ties on cast_at break on the decision so the result stays order-free.
            Some(existing)
                if (existing.cast_at, existing.decision == VoteDecision::Approve)
                    >= (vote.cast_at, vote.decision == VoteDecision::Approve) => {}
            _ => {
                latest.insert(vote.validator.clone(), vote);
            }
        }
    }
    latest
        .into_iter()
        .map(|(validator, vote)| (validator, vote.decision))
        .collect()
}

/// Smallest eligible pool a scheme can run with.
pub fn scheme_minimum(scheme: &ValidationScheme) -> usize {
    match scheme {
        ValidationScheme::KOfN { n, .. } => *n,
        ValidationScheme::SimpleMajority => 1,
    }
}

/// Reject malformed schemes and pools smaller than the scheme needs.
pub fn check_scheme(scheme: &ValidationScheme, pool_size: usize) -> Result<(), AccordError> {
    if let ValidationScheme::KOfN { k, n } = scheme {
        if *k == 0 || *k > *n {
            return Err(AccordError::Validation(format!(
                "scheme {}: k must be between 1 and n",
                scheme
            )));
        }
    }
    let minimum = scheme_minimum(scheme);
    if pool_size < minimum {
        return Err(AccordError::Validation(format!(
            "scheme {} needs at least {} eligible validators, got {}",
            scheme, minimum, pool_size
        )));
    }
    Ok(())
}

/// Decide a round from its tally.
///
/// - `k_of_n`: approved at `k` approvals; rejected once the approvals plus the
///   undecided votes can no longer reach `k`.
/// - `simple_majority`: decided when one side holds a strict majority of the
///   eligible pool. A tie with every vote in is a rejection.
pub fn decide(scheme: &ValidationScheme, tally: &Tally) -> Outcome {
    match scheme {
        ValidationScheme::KOfN { k, .. } => {
            if tally.approvals >= *k {
                Outcome::Approved
            } else if tally.approvals + tally.undecided < *k {
                Outcome::Rejected
            } else {
                Outcome::Pending
            }
        }
        ValidationScheme::SimpleMajority => {
            let majority = tally.eligible() / 2 + 1;
            if tally.approvals >= majority {
                Outcome::Approved
            } else if tally.rejections >= majority || tally.undecided == 0 {
                Outcome::Rejected
            } else {
                Outcome::Pending
            }
        }
    }
}
