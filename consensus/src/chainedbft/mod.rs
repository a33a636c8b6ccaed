//! Track the proposals and votes of a chained-BFT consensus engine.
//!
//! Validators propose a block per round and vote either for a block or to abandon the round
//! (a "new view"). This module caches those messages across a sliding window of recent heights and
//! reports when a round has gathered enough votes to be decided.
//!
//! # Architecture
//!
//! ```txt
//! ConsensusMessagePool          (one per node, shared across threads)
//!   └── RoundCache              (one per height)
//!         ├── ProposalMsg       (at most one per round)
//!         └── VoteAggregator    (one per round)
//! ```
//!
//! Inbound messages are first checked with [validator::validate] and then offered to the
//! [ConsensusMessagePool]. Each validator may vote once per round. Once a block (or a view change)
//! gathers `min_votes_for_qc` votes, the round is latched as decided and stays that way: a block
//! quorum always takes precedence over a view change.
//!
//! Memory is bounded by calling [ConsensusMessagePool::on_block_sealed] for every committed block,
//! which drops heights that fell out of the retention window. When the validator set changes,
//! [ConsensusMessagePool::reset] discards everything and adopts the new quorum threshold.
//!
//! # Non-Goals
//!
//! Signatures are neither verified nor aggregated here, and nothing is persisted.

use crate::types::Round;
use types::{AuthorIdx, BlockId};
use wire::MessageType;

pub mod aggregator;
mod config;
mod metrics;
mod pool;
pub mod round;
pub mod types;
pub mod validator;
pub mod wire;

pub use aggregator::VoteAggregator;
pub use config::{min_votes_for_qc, Config, MIN_QUORUM};
pub use metrics::{Inbound, Outcome};
pub use pool::ConsensusMessagePool;
pub use round::RoundCache;
pub use types::{QuorumStatus, Vote, VoteTarget};

/// Errors that can occur when inserting or validating consensus messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Vote Errors
    /// The author already voted in this round and flipped the new-view flag
    #[error("Author {author} cast conflicting vote types in round {round}")]
    ConflictingVoteType { author: AuthorIdx, round: Round },
    /// The author already voted for a different block in this round
    #[error("Author {author} voted for {conflicting} after voting for {previous}")]
    ConflictingBlockVote {
        author: AuthorIdx,
        previous: BlockId,
        conflicting: BlockId,
    },
    /// The author already cast the same vote in this round
    #[error("Duplicate vote from author {author}")]
    DuplicateVote { author: AuthorIdx },

    // Proposal Errors
    /// A proposal is already cached for the round
    #[error("Duplicate proposal for round {0}")]
    DuplicateProposal(Round),

    // Message Errors
    /// The message carries no payload
    #[error("Missing payload")]
    MissingPayload,
    /// The payload is not of the expected kind
    #[error("Expected {expected} message, found {found}")]
    WrongMessageType {
        expected: MessageType,
        found: MessageType,
    },
    /// The payload is tagged but carries no data
    #[error("Missing {0} data")]
    MissingData(MessageType),

    // Validation Errors
    /// A vote supports neither a block nor a view change
    #[error("Vote has neither a block id nor a new view")]
    NoVoteTarget,
    /// A required field is missing
    #[error("Invalid message: {0}")]
    Invalid(&'static str),
    /// A block carried by a message is missing a required field
    #[error("Invalid block in {context}: {reason}")]
    InvalidBlock {
        reason: &'static str,
        context: &'static str,
    },

    // Configuration Errors
    /// The quorum threshold cannot be met by the validator set
    #[error("Invalid quorum of {min_votes_for_qc} among {validators} validators")]
    InvalidQuorum { validators: u32, min_votes_for_qc: u32 },
}

impl Error {
    /// Returns true if the error is evidence that a validator equivocated.
    pub fn is_equivocation(&self) -> bool {
        matches!(
            self,
            Error::ConflictingVoteType { .. } | Error::ConflictingBlockVote { .. }
        )
    }
}
