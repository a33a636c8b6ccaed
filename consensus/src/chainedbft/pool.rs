use super::{
    config::{valid_quorum, Config},
    metrics::{Inbound, Metrics},
    round::RoundCache,
    types::{QuorumStatus, Vote},
    wire::{ConsensusMsg, Data, MessageType, ProposalMsg, QuorumCert, VoteData},
    Error,
};
use crate::types::{Height, HeightDelta, Round};
use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, warn};

/// State guarded by the pool lock.
struct State {
    validators: u32,
    min_votes_for_qc: u32,
    heights: BTreeMap<Height, RoundCache>,
}

impl State {
    fn round_cache(&mut self, height: Height) -> &mut RoundCache {
        let validators = self.validators as usize;
        self.heights.entry(height).or_insert_with(|| {
            debug!(%height, "caching new height");
            RoundCache::new(height, validators)
        })
    }
}

/// Caches the proposals and votes of every round across a sliding window of recent heights.
///
/// All state sits behind a single reader/writer lock: insertions, eviction, and resets take it
/// exclusively while lookups share it. Reads copy data out, so no reference into the pool outlives
/// a call. The pool can be shared between threads (e.g. in an `Arc`).
pub struct ConsensusMessagePool {
    cached_len: HeightDelta,
    state: RwLock<State>,
    metrics: Metrics,
}

impl ConsensusMessagePool {
    /// Creates an empty pool.
    ///
    /// # Panics
    ///
    /// Panics if `cfg` is invalid (see [Config::assert]).
    pub fn new(cfg: Config) -> Self {
        cfg.assert();
        let metrics = Metrics::init(&cfg.registry);
        Self {
            cached_len: cfg.cached_len,
            state: RwLock::new(State {
                validators: cfg.validators,
                min_votes_for_qc: cfg.min_votes_for_qc,
                heights: BTreeMap::new(),
            }),
            metrics,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_tracked(&self, state: &State) {
        self.metrics
            .tracked_heights
            .set(i64::try_from(state.heights.len()).unwrap_or(i64::MAX));
    }

    /// Records the vote carried by `msg` at `height` and `round`.
    pub fn insert_vote(
        &self,
        height: Height,
        round: Round,
        msg: &ConsensusMsg,
    ) -> Result<(), Error> {
        let result = self.insert_vote_inner(height, round, msg);
        self.metrics
            .votes
            .get_or_create(Inbound::from_result(&result))
            .inc();
        result
    }

    fn insert_vote_inner(
        &self,
        height: Height,
        round: Round,
        msg: &ConsensusMsg,
    ) -> Result<(), Error> {
        let vote = match payload_data(msg, MessageType::Vote)? {
            Data::Vote(vote) => vote,
            data => return Err(mismatch(MessageType::Vote, data)),
        };
        let data: &VoteData = vote
            .vote_data
            .as_ref()
            .ok_or(Error::Invalid("nil vote data"))?;
        let vote = Vote::try_from(data)?;

        let mut state = self.write();
        let min_votes_for_qc = state.min_votes_for_qc;
        let result = state
            .round_cache(height)
            .insert_vote(round, vote, min_votes_for_qc);
        self.update_tracked(&state);
        if let Err(err) = &result {
            if err.is_equivocation() {
                warn!(%height, %round, ?err, "conflicting vote");
            } else {
                debug!(%height, %round, ?err, "ignored vote");
            }
        }
        result
    }

    /// Records the proposal carried by `msg` at `height` and `round`.
    pub fn insert_proposal(
        &self,
        height: Height,
        round: Round,
        msg: &ConsensusMsg,
    ) -> Result<(), Error> {
        let result = self.insert_proposal_inner(height, round, msg);
        self.metrics
            .proposals
            .get_or_create(Inbound::from_result(&result))
            .inc();
        result
    }

    fn insert_proposal_inner(
        &self,
        height: Height,
        round: Round,
        msg: &ConsensusMsg,
    ) -> Result<(), Error> {
        let proposal = match payload_data(msg, MessageType::Proposal)? {
            Data::Proposal(proposal) => proposal.clone(),
            data => return Err(mismatch(MessageType::Proposal, data)),
        };

        let mut state = self.write();
        let result = state.round_cache(height).insert_proposal(round, proposal);
        self.update_tracked(&state);
        result
    }

    /// Returns the proposal cached at `height` and `round`, if any.
    pub fn get_proposal(&self, height: Height, round: Round) -> Option<ProposalMsg> {
        self.read()
            .heights
            .get(&height)
            .and_then(|cache| cache.proposal(round).cloned())
    }

    /// Returns every vote recorded at `height` and `round`, ascending by author.
    pub fn get_quorum_votes(&self, height: Height, round: Round) -> Vec<Vote> {
        self.read()
            .heights
            .get(&height)
            .map(|cache| cache.quorum_votes(round))
            .unwrap_or_default()
    }

    /// Returns the votes backing the decision at `height` and `round`, ascending by author.
    pub fn get_certificate_votes(&self, height: Height, round: Round) -> Vec<Vote> {
        self.read()
            .heights
            .get(&height)
            .map(|cache| cache.certificate_votes(round))
            .unwrap_or_default()
    }

    /// Returns true if a quorum's worth of votes (of any target) has been recorded at `height` and
    /// `round`.
    pub fn check_any_votes(&self, height: Height, round: Round) -> bool {
        let state = self.read();
        state
            .heights
            .get(&height)
            .is_some_and(|cache| cache.check_any_votes(round, state.min_votes_for_qc))
    }

    /// Returns whether `round` at `height` has been decided.
    pub fn check_votes_done(&self, height: Height, round: Round) -> QuorumStatus {
        self.read()
            .heights
            .get(&height)
            .map_or(QuorumStatus::Pending, |cache| cache.status(round))
    }

    /// Returns the highest decided round at `height`, if any.
    pub fn get_last_valid_round(&self, height: Height) -> Option<Round> {
        self.read()
            .heights
            .get(&height)
            .and_then(RoundCache::last_valid_round)
    }

    /// Builds the (unsigned) quorum certificate for `round` at `height`.
    ///
    /// Returns `None` while the round is pending.
    pub fn aggregate_qc(&self, height: Height, round: Round, epoch_id: u64) -> Option<QuorumCert> {
        let state = self.read();
        let cache = state.heights.get(&height)?;
        let (block_id, new_view) = match cache.status(round) {
            QuorumStatus::Pending => return None,
            QuorumStatus::Committed(block_id) => (Some(block_id.as_bytes().clone()), false),
            QuorumStatus::ViewChange => (None, true),
        };
        let votes = cache
            .certificate_votes(round)
            .iter()
            .map(VoteData::from)
            .collect();
        Some(QuorumCert {
            block_id,
            height: height.get(),
            round: round.get(),
            new_view,
            epoch_id,
            votes,
        })
    }

    /// Drops every height that fell out of the retention window after the block at `height` was
    /// sealed.
    ///
    /// Heights at or above `height - cached_len` are kept. Nothing is dropped until `height`
    /// exceeds `cached_len`.
    pub fn on_block_sealed(&self, height: Height) {
        let Some(oldest) = height.checked_sub(self.cached_len) else {
            return;
        };

        let mut state = self.write();
        let retained = state.heights.split_off(&oldest);
        let evicted = std::mem::replace(&mut state.heights, retained).len();
        self.update_tracked(&state);
        if evicted > 0 {
            self.metrics.evicted_heights.inc_by(evicted as u64);
            debug!(sealed = %height, %oldest, evicted, "evicted heights");
        }
    }

    /// Discards all cached messages and adopts a new validator set size and quorum threshold.
    ///
    /// Returns [Error::InvalidQuorum] (leaving the pool untouched) if `min_votes_for_qc` is zero
    /// or exceeds `validators`.
    pub fn reset(&self, validators: u32, min_votes_for_qc: u32) -> Result<(), Error> {
        if !valid_quorum(validators, min_votes_for_qc) {
            return Err(Error::InvalidQuorum {
                validators,
                min_votes_for_qc,
            });
        }

        let mut state = self.write();
        state.heights.clear();
        state.validators = validators;
        state.min_votes_for_qc = min_votes_for_qc;
        self.update_tracked(&state);
        debug!(validators, min_votes_for_qc, "reset pool");
        Ok(())
    }

    /// Discards all cached messages, keeping the current configuration.
    pub fn clear(&self) {
        let mut state = self.write();
        state.heights.clear();
        self.update_tracked(&state);
        debug!("cleared pool");
    }

    /// Returns the number of heights with cached messages.
    pub fn tracked_heights(&self) -> usize {
        self.read().heights.len()
    }
}

/// Returns the data carried by `msg` if its payload is tagged `expected`.
fn payload_data(msg: &ConsensusMsg, expected: MessageType) -> Result<&Data, Error> {
    let payload = msg.payload.as_ref().ok_or(Error::MissingPayload)?;
    if payload.kind != expected {
        return Err(Error::WrongMessageType {
            expected,
            found: payload.kind,
        });
    }
    payload.data.as_ref().ok_or(Error::MissingData(expected))
}

fn mismatch(expected: MessageType, data: &Data) -> Error {
    Error::WrongMessageType {
        expected,
        found: data.kind(),
    }
}
