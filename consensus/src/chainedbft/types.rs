//! Typed values the message pool reasons about.

use super::{wire, Error};
use crate::types::{Height, Round};
use bytes::Bytes;
use commonware_utils::hex;
use std::fmt::{self, Debug, Display, Formatter};

/// Index of a validator within the fixed validator set of an epoch.
pub type AuthorIdx = u32;

/// Hash of a block being voted for. Never empty.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(Bytes);

impl BlockId {
    /// Wraps `bytes`, returning `None` if they are empty.
    pub fn new(bytes: impl Into<Bytes>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return None;
        }
        Some(Self(bytes))
    }

    /// Returns the raw block hash.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

impl AsRef<[u8]> for BlockId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(&self.0))
    }
}

impl Debug for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", hex(&self.0))
    }
}

/// What a [Vote] supports.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VoteTarget {
    /// Commit the given block.
    Block(BlockId),
    /// Abandon the round without committing.
    NewView,
    /// Commit the given block, or move on if the round times out first.
    Both(BlockId),
}

impl VoteTarget {
    /// Builds a target from the wire representation (an optional block hash and a new-view flag).
    ///
    /// Returns `None` if the vote supports neither.
    pub fn from_parts(block_id: Option<BlockId>, new_view: bool) -> Option<Self> {
        match (block_id, new_view) {
            (Some(block_id), false) => Some(Self::Block(block_id)),
            (Some(block_id), true) => Some(Self::Both(block_id)),
            (None, true) => Some(Self::NewView),
            (None, false) => None,
        }
    }

    /// Returns the block this target supports, if any.
    pub fn block_id(&self) -> Option<&BlockId> {
        match self {
            Self::Block(block_id) | Self::Both(block_id) => Some(block_id),
            Self::NewView => None,
        }
    }

    /// Returns true if this target supports a view change.
    pub fn is_new_view(&self) -> bool {
        matches!(self, Self::NewView | Self::Both(_))
    }
}

/// A single validator's authenticated vote for one `(height, round)`.
///
/// Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    height: Height,
    round: Round,
    epoch_id: u64,
    author: Option<Bytes>,
    author_idx: AuthorIdx,
    target: VoteTarget,
    signature: Option<Bytes>,
}

impl Vote {
    /// Creates an unsigned vote without an author identity.
    pub fn new(height: Height, round: Round, author_idx: AuthorIdx, target: VoteTarget) -> Self {
        Self {
            height,
            round,
            epoch_id: 0,
            author: None,
            author_idx,
            target,
            signature: None,
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn epoch_id(&self) -> u64 {
        self.epoch_id
    }

    pub fn author(&self) -> Option<&Bytes> {
        self.author.as_ref()
    }

    pub fn author_idx(&self) -> AuthorIdx {
        self.author_idx
    }

    pub fn target(&self) -> &VoteTarget {
        &self.target
    }

    pub fn signature(&self) -> Option<&Bytes> {
        self.signature.as_ref()
    }

    /// Returns the block this vote supports, if any.
    pub fn block_id(&self) -> Option<&BlockId> {
        self.target.block_id()
    }

    /// Returns true if this vote supports a view change.
    pub fn is_new_view(&self) -> bool {
        self.target.is_new_view()
    }
}

impl TryFrom<&wire::VoteData> for Vote {
    type Error = Error;

    fn try_from(data: &wire::VoteData) -> Result<Self, Self::Error> {
        let block_id = data.block_id.clone().and_then(BlockId::new);
        let target = VoteTarget::from_parts(block_id, data.new_view).ok_or(Error::NoVoteTarget)?;
        Ok(Self {
            height: Height::new(data.height),
            round: Round::new(data.round),
            epoch_id: data.epoch_id,
            author: data.author.clone(),
            author_idx: data.author_idx,
            target,
            signature: data.signature.clone(),
        })
    }
}

impl From<&Vote> for wire::VoteData {
    fn from(vote: &Vote) -> Self {
        Self {
            block_id: vote.block_id().map(|block_id| block_id.as_bytes().clone()),
            height: vote.height.get(),
            round: vote.round.get(),
            epoch_id: vote.epoch_id,
            new_view: vote.is_new_view(),
            author: vote.author.clone(),
            author_idx: vote.author_idx,
            signature: vote.signature.clone(),
        }
    }
}

/// Whether a round has gathered enough votes to be decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuorumStatus {
    /// Neither a block nor a view change has reached quorum.
    Pending,
    /// The given block reached quorum. Takes precedence over a view change.
    Committed(BlockId),
    /// Enough validators voted to abandon the round.
    ViewChange,
}

impl QuorumStatus {
    /// Returns true if the round has been decided either way.
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
