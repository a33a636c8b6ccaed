use super::{
    types::{AuthorIdx, BlockId, QuorumStatus, Vote},
    Error,
};
use crate::types::Round;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Accumulates the votes cast in a single round.
///
/// Each author contributes at most one vote (the first one received). Votes are bucketed by what
/// they support: a new-view tally and, for each block, the set of authors that voted for it. The
/// first block whose author-set reaches the quorum threshold is locked as the round's commit target
/// and the new-view tally is locked once it reaches the same threshold. Neither lock is ever
/// released or re-evaluated.
pub struct VoteAggregator {
    round: Round,
    votes: HashMap<AuthorIdx, Vote>,
    new_view_voters: HashSet<AuthorIdx>,
    block_voters: HashMap<BlockId, HashSet<AuthorIdx>>,

    locked_block: Option<BlockId>,
    locked_new_view: bool,
}

impl VoteAggregator {
    /// Creates an aggregator for `round`, sized for `participants` validators.
    pub fn new(round: Round, participants: usize) -> Self {
        Self {
            round,
            votes: HashMap::with_capacity(participants),
            new_view_voters: HashSet::with_capacity(participants),
            block_voters: HashMap::new(),
            locked_block: None,
            locked_new_view: false,
        }
    }

    /// Records `vote` if its author has not voted in this round yet.
    ///
    /// A second vote from the same author is always rejected: with
    /// [Error::ConflictingVoteType] if it disagrees on the new-view flag, with
    /// [Error::ConflictingBlockVote] if both votes name different blocks, and with
    /// [Error::DuplicateVote] otherwise.
    pub fn insert(&mut self, vote: Vote, min_votes_for_qc: u32) -> Result<(), Error> {
        let author = vote.author_idx();
        if let Some(previous) = self.votes.get(&author) {
            return Err(self.conflict(previous, &vote));
        }
        let threshold = min_votes_for_qc as usize;

        // Tally new-view support
        if vote.is_new_view() {
            self.new_view_voters.insert(author);
            if !self.locked_new_view && self.new_view_voters.len() >= threshold {
                self.locked_new_view = true;
                debug!(
                    height = %vote.height(),
                    round = %self.round,
                    votes = self.new_view_voters.len(),
                    "view change quorum reached"
                );
            }
        }

        // Tally block support
        if let Some(block_id) = vote.block_id() {
            let voters = self.block_voters.entry(block_id.clone()).or_default();
            voters.insert(author);
            if self.locked_block.is_none() && voters.len() >= threshold {
                debug!(
                    height = %vote.height(),
                    round = %self.round,
                    block = %block_id,
                    votes = voters.len(),
                    "block quorum reached"
                );
                self.locked_block = Some(block_id.clone());
            }
        }

        self.votes.insert(author, vote);
        Ok(())
    }

    /// Classifies a second vote from the author of `previous`.
    fn conflict(&self, previous: &Vote, vote: &Vote) -> Error {
        let author = vote.author_idx();
        if previous.is_new_view() != vote.is_new_view() {
            return Error::ConflictingVoteType {
                author,
                round: self.round,
            };
        }
        if let (Some(previous), Some(conflicting)) = (previous.block_id(), vote.block_id()) {
            if previous != conflicting {
                return Error::ConflictingBlockVote {
                    author,
                    previous: previous.clone(),
                    conflicting: conflicting.clone(),
                };
            }
        }
        Error::DuplicateVote { author }
    }

    /// Returns whether the round is decided.
    ///
    /// A locked block wins over a locked view change: once a quorum has voted for a specific
    /// block the round is decided, even if a quorum also asked to move on.
    pub fn status(&self) -> QuorumStatus {
        if let Some(block_id) = &self.locked_block {
            return QuorumStatus::Committed(block_id.clone());
        }
        if self.locked_new_view {
            return QuorumStatus::ViewChange;
        }
        QuorumStatus::Pending
    }

    /// Returns true if at least `min` votes (of any target) have been recorded.
    pub fn has_any_votes(&self, min: u32) -> bool {
        self.votes.len() >= min as usize
    }

    /// Returns every recorded vote, ascending by author.
    pub fn ordered_votes(&self) -> Vec<Vote> {
        let mut votes: Vec<Vote> = self.votes.values().cloned().collect();
        votes.sort_by_key(Vote::author_idx);
        votes
    }

    /// Returns the votes backing the round's decision, ascending by author.
    ///
    /// These are the votes for the locked block if one exists, the new-view votes if the view
    /// change is locked, and nothing while the round is pending.
    pub fn certificate_votes(&self) -> Vec<Vote> {
        let voters = match &self.locked_block {
            Some(block_id) => self.block_voters.get(block_id),
            None if self.locked_new_view => Some(&self.new_view_voters),
            None => None,
        };
        let Some(voters) = voters else {
            return Vec::new();
        };
        let mut authors: Vec<AuthorIdx> = voters.iter().copied().collect();
        authors.sort_unstable();
        authors
            .into_iter()
            .filter_map(|author| self.votes.get(&author).cloned())
            .collect()
    }

    /// Returns the number of recorded votes.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// Returns true if no vote has been recorded.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}
