use crate::types::HeightDelta;
use prometheus_client::registry::Registry;
use std::sync::{Arc, Mutex};

/// Smallest quorum the chain accepts.
pub const MIN_QUORUM: u32 = 3;

/// Returns the number of votes required to form a quorum certificate among `validators`.
///
/// This is `(2n + 1) / 3` (so 4 validators need 3 votes and 7 validators need 5). Returns `None`
/// for sets of [MIN_QUORUM] validators or fewer, which cannot tolerate a faulty node.
pub fn min_votes_for_qc(validators: u32) -> Option<u32> {
    if validators <= MIN_QUORUM {
        return None;
    }
    let quorum = (2 * u64::from(validators) + 1) / 3;
    u32::try_from(quorum).ok()
}

/// Returns true if `min_votes_for_qc` is a usable quorum threshold for `validators`.
pub(super) fn valid_quorum(validators: u32, min_votes_for_qc: u32) -> bool {
    validators > 0 && min_votes_for_qc > 0 && min_votes_for_qc <= validators
}

/// Configuration for the [super::ConsensusMessagePool].
pub struct Config {
    /// Registry the pool's metrics are registered in.
    pub registry: Arc<Mutex<Registry>>,

    /// Number of heights below the most recently sealed block to keep messages for.
    pub cached_len: HeightDelta,

    /// Number of validators in the current validator set.
    pub validators: u32,

    /// Number of votes (for the same block, or for a view change) that decide a round.
    ///
    /// See [min_votes_for_qc] for the threshold used by the chain.
    pub min_votes_for_qc: u32,
}

impl Config {
    /// Assert enforces that all configuration values are valid.
    pub fn assert(&self) {
        assert!(self.validators > 0, "there must be at least one validator");
        assert!(self.min_votes_for_qc > 0, "quorum must require at least one vote");
        assert!(
            self.min_votes_for_qc <= self.validators,
            "quorum must be reachable by the validator set"
        );
    }
}
