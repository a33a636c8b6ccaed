use super::{
    aggregator::VoteAggregator,
    types::{QuorumStatus, Vote},
    wire::ProposalMsg,
    Error,
};
use crate::types::{Height, Round};
use std::collections::{btree_map::Entry, BTreeMap};
use tracing::debug;

/// Votes and proposals received for every round of a single height.
///
/// Per-round state is created lazily on the first vote or proposal for that round.
pub struct RoundCache {
    height: Height,
    participants: usize,
    votes: BTreeMap<Round, VoteAggregator>,
    proposals: BTreeMap<Round, ProposalMsg>,
}

impl RoundCache {
    /// Creates an empty cache for `height`, sizing per-round tables for `participants` validators.
    pub fn new(height: Height, participants: usize) -> Self {
        Self {
            height,
            participants,
            votes: BTreeMap::new(),
            proposals: BTreeMap::new(),
        }
    }

    /// Returns the height this cache is bound to.
    pub fn height(&self) -> Height {
        self.height
    }

    /// Records `vote` in `round`.
    pub fn insert_vote(
        &mut self,
        round: Round,
        vote: Vote,
        min_votes_for_qc: u32,
    ) -> Result<(), Error> {
        let participants = self.participants;
        self.votes
            .entry(round)
            .or_insert_with(|| VoteAggregator::new(round, participants))
            .insert(vote, min_votes_for_qc)
    }

    /// Records the proposal for `round`. The first proposal wins; later ones are rejected.
    pub fn insert_proposal(&mut self, round: Round, proposal: ProposalMsg) -> Result<(), Error> {
        match self.proposals.entry(round) {
            Entry::Occupied(_) => Err(Error::DuplicateProposal(round)),
            Entry::Vacant(entry) => {
                debug!(height = %self.height, %round, "cached proposal");
                entry.insert(proposal);
                Ok(())
            }
        }
    }

    /// Returns the proposal for `round`, if any.
    pub fn proposal(&self, round: Round) -> Option<&ProposalMsg> {
        self.proposals.get(&round)
    }

    /// Returns every vote recorded in `round`, ascending by author.
    pub fn quorum_votes(&self, round: Round) -> Vec<Vote> {
        self.votes
            .get(&round)
            .map(VoteAggregator::ordered_votes)
            .unwrap_or_default()
    }

    /// Returns the votes backing the decision of `round`, ascending by author.
    pub fn certificate_votes(&self, round: Round) -> Vec<Vote> {
        self.votes
            .get(&round)
            .map(VoteAggregator::certificate_votes)
            .unwrap_or_default()
    }

    /// Returns true if at least `min` votes have been recorded in `round`.
    pub fn check_any_votes(&self, round: Round, min: u32) -> bool {
        self.votes
            .get(&round)
            .is_some_and(|aggregator| aggregator.has_any_votes(min))
    }

    /// Returns whether `round` has been decided.
    pub fn status(&self, round: Round) -> QuorumStatus {
        self.votes
            .get(&round)
            .map_or(QuorumStatus::Pending, VoteAggregator::status)
    }

    /// Returns the highest round that has been decided (either way), if any.
    pub fn last_valid_round(&self) -> Option<Round> {
        self.votes
            .iter()
            .rev()
            .find(|(_, aggregator)| aggregator.status().is_done())
            .map(|(round, _)| *round)
    }
}
