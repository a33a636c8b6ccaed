//! Inbound message shapes, as handed over by the decoding layer.
//!
//! Any field a remote peer may omit is an `Option` (or an empty collection). Nothing in this module
//! enforces presence; [crate::chainedbft::validator::validate] does that before a message is
//! offered to the [crate::chainedbft::ConsensusMessagePool].

use bytes::Bytes;
use std::fmt::{self, Display, Formatter};

/// Kind of a consensus message, as declared by its sender.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Proposal,
    Vote,
    BlockFetch,
    BlockFetchResp,
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Proposal => "proposal",
            MessageType::Vote => "vote",
            MessageType::BlockFetch => "block_fetch",
            MessageType::BlockFetchResp => "block_fetch_resp",
        };
        f.write_str(name)
    }
}

/// Envelope of every consensus message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsensusMsg {
    pub payload: Option<ConsensusPayload>,
    /// Signature over the payload by the sending node (verified upstream).
    pub signature: Option<Bytes>,
}

/// Declared message kind plus its body.
///
/// The declared `kind` and the variant of `data` are decoded independently and may disagree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusPayload {
    pub kind: MessageType,
    pub data: Option<Data>,
}

/// Body of a [ConsensusPayload].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Data {
    Proposal(ProposalMsg),
    Vote(VoteMsg),
    BlockFetch(BlockFetchMsg),
    BlockFetchResp(BlockFetchRespMsg),
}

impl Data {
    /// Returns the message type this body actually carries.
    pub fn kind(&self) -> MessageType {
        match self {
            Data::Proposal(_) => MessageType::Proposal,
            Data::Vote(_) => MessageType::Vote,
            Data::BlockFetch(_) => MessageType::BlockFetch,
            Data::BlockFetchResp(_) => MessageType::BlockFetchResp,
        }
    }
}

impl ConsensusPayload {
    /// Wraps a proposal.
    pub fn proposal(msg: ProposalMsg) -> Self {
        Self {
            kind: MessageType::Proposal,
            data: Some(Data::Proposal(msg)),
        }
    }

    /// Wraps a vote.
    pub fn vote(msg: VoteMsg) -> Self {
        Self {
            kind: MessageType::Vote,
            data: Some(Data::Vote(msg)),
        }
    }

    /// Wraps a block fetch request.
    pub fn block_fetch(msg: BlockFetchMsg) -> Self {
        Self {
            kind: MessageType::BlockFetch,
            data: Some(Data::BlockFetch(msg)),
        }
    }

    /// Wraps a block fetch response.
    pub fn block_fetch_resp(msg: BlockFetchRespMsg) -> Self {
        Self {
            kind: MessageType::BlockFetchResp,
            data: Some(Data::BlockFetchResp(msg)),
        }
    }
}

impl From<ConsensusPayload> for ConsensusMsg {
    fn from(payload: ConsensusPayload) -> Self {
        Self {
            payload: Some(payload),
            signature: None,
        }
    }
}

/// Header of a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    pub block_hash: Bytes,
    pub pre_block_hash: Option<Bytes>,
    pub proposer: Option<Bytes>,
    pub signature: Option<Bytes>,
}

/// A block; the body is opaque to consensus bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub header: Option<BlockHeader>,
    pub body: Bytes,
}

/// Quorum certificate as carried on the wire.
///
/// A certificate for a view change has `new_view` set and no `block_id`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuorumCert {
    pub block_id: Option<Bytes>,
    pub height: u64,
    pub round: u64,
    pub new_view: bool,
    pub epoch_id: u64,
    pub votes: Vec<VoteData>,
}

/// Highest certificates known to the sender, used by receivers to detect they fell behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncInfo {
    pub highest_qc: Option<QuorumCert>,
    pub highest_tc: Option<QuorumCert>,
    pub highest_tc_round: u64,
}

/// Proposal body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalData {
    pub block: Option<Block>,
    pub height: u64,
    pub round: u64,
    pub epoch_id: u64,
    pub proposer: Option<Bytes>,
    pub proposer_idx: u32,
    pub justify_qc: Option<QuorumCert>,
}

/// A candidate block plus the justification needed to vote for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalMsg {
    pub sync_info: Option<SyncInfo>,
    pub proposal_data: Option<ProposalData>,
}

/// Vote body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteData {
    pub block_id: Option<Bytes>,
    pub height: u64,
    pub round: u64,
    pub epoch_id: u64,
    pub new_view: bool,
    pub author: Option<Bytes>,
    pub author_idx: u32,
    pub signature: Option<Bytes>,
}

/// A validator's vote plus its view of the chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteMsg {
    pub vote_data: Option<VoteData>,
    pub sync_info: Option<SyncInfo>,
}

/// Request for `num_blocks` blocks ending at `block_id`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockFetchMsg {
    pub req_id: u64,
    pub block_id: Option<Bytes>,
    pub height: u64,
    pub num_blocks: u64,
    pub author_idx: u32,
}

/// Outcome of a block fetch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BlockFetchStatus {
    #[default]
    Succeeded,
    NotEnoughBlocks,
}

/// A fetched block with the certificate that justifies it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockPair {
    pub block: Option<Block>,
    pub qc: Option<QuorumCert>,
}

/// Response to a [BlockFetchMsg].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockFetchRespMsg {
    pub resp_id: u64,
    pub status: BlockFetchStatus,
    pub blocks: Vec<BlockPair>,
    pub author_idx: u32,
}
