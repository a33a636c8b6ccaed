//! Structural checks run on every inbound message before it is offered to the pool.
//!
//! Each check verifies that the fields the pool (or block execution downstream) dereferences
//! unconditionally are actually present. Signatures are not checked here.

use super::{
    wire::{
        Block, BlockFetchMsg, BlockFetchRespMsg, BlockFetchStatus, ConsensusMsg, ConsensusPayload,
        Data, ProposalMsg, VoteMsg,
    },
    Error,
};

/// Checks the basic structure of a consensus message.
pub fn validate(msg: &ConsensusMsg) -> Result<(), Error> {
    let payload = msg.payload.as_ref().ok_or(Error::MissingPayload)?;
    validate_payload(payload)
}

/// Checks the basic structure of a consensus payload.
pub fn validate_payload(payload: &ConsensusPayload) -> Result<(), Error> {
    let data = payload
        .data
        .as_ref()
        .ok_or(Error::MissingData(payload.kind))?;
    if data.kind() != payload.kind {
        return Err(Error::WrongMessageType {
            expected: payload.kind,
            found: data.kind(),
        });
    }
    match data {
        Data::Proposal(msg) => validate_proposal(msg),
        Data::Vote(msg) => validate_vote(msg),
        Data::BlockFetch(msg) => validate_block_fetch(msg),
        Data::BlockFetchResp(msg) => validate_block_fetch_resp(msg),
    }
}

fn validate_proposal(msg: &ProposalMsg) -> Result<(), Error> {
    let sync_info = msg
        .sync_info
        .as_ref()
        .ok_or(Error::Invalid("nil sync info in proposal msg"))?;
    if sync_info.highest_qc.is_none() {
        return Err(Error::Invalid(
            "nil highest qc in sync info within proposal msg",
        ));
    }

    let proposal = msg
        .proposal_data
        .as_ref()
        .ok_or(Error::Invalid("nil proposal data"))?;
    let block = proposal
        .block
        .as_ref()
        .ok_or(Error::Invalid("nil block in proposal msg"))?;
    validate_block(block, "proposal msg")?;
    if proposal.proposer.is_none() {
        return Err(Error::Invalid("nil proposer address in proposal msg"));
    }
    if proposal.justify_qc.is_none() {
        return Err(Error::Invalid("nil justify qc in proposal msg"));
    }
    Ok(())
}

fn validate_vote(msg: &VoteMsg) -> Result<(), Error> {
    let sync_info = msg
        .sync_info
        .as_ref()
        .ok_or(Error::Invalid("nil sync info in vote msg"))?;
    if sync_info.highest_qc.is_none() {
        return Err(Error::Invalid(
            "nil highest qc in sync info within vote msg",
        ));
    }

    let vote = msg
        .vote_data
        .as_ref()
        .ok_or(Error::Invalid("nil vote data"))?;
    let has_block = vote.block_id.as_ref().is_some_and(|id| !id.is_empty());
    if !vote.new_view && !has_block {
        return Err(Error::NoVoteTarget);
    }
    if vote.author.is_none() {
        return Err(Error::Invalid("nil author in vote msg"));
    }
    Ok(())
}

fn validate_block_fetch(msg: &BlockFetchMsg) -> Result<(), Error> {
    if msg.block_id.is_none() {
        return Err(Error::Invalid("nil block id in block fetch msg"));
    }
    Ok(())
}

fn validate_block_fetch_resp(msg: &BlockFetchRespMsg) -> Result<(), Error> {
    if msg.status == BlockFetchStatus::Succeeded && msg.blocks.is_empty() {
        return Err(Error::Invalid("empty blocks from block fetch rsp msg"));
    }
    for pair in &msg.blocks {
        let (Some(block), Some(_)) = (&pair.block, &pair.qc) else {
            return Err(Error::Invalid(
                "nil block or nil qc in block pair from block fetch rsp msg",
            ));
        };
        validate_block(block, "block fetch rsp msg")?;
    }
    Ok(())
}

/// Checks the header fields every block must carry. `context` names the enclosing message.
fn validate_block(block: &Block, context: &'static str) -> Result<(), Error> {
    let header = block.header.as_ref().ok_or(Error::InvalidBlock {
        reason: "nil block header",
        context,
    })?;
    if header.pre_block_hash.is_none() {
        return Err(Error::InvalidBlock {
            reason: "nil previous block hash",
            context,
        });
    }
    if header.signature.is_none() {
        return Err(Error::InvalidBlock {
            reason: "nil block signature",
            context,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainedbft::wire::{
        BlockHeader, BlockPair, MessageType, ProposalData, QuorumCert, SyncInfo, VoteData,
    };
    use bytes::Bytes;

    fn sync_info() -> Option<SyncInfo> {
        Some(SyncInfo {
            highest_qc: Some(QuorumCert::default()),
            ..Default::default()
        })
    }

    fn block() -> Block {
        Block {
            header: Some(BlockHeader {
                height: 10,
                block_hash: Bytes::from_static(b"B"),
                pre_block_hash: Some(Bytes::from_static(b"A")),
                proposer: Some(Bytes::from_static(b"node1")),
                signature: Some(Bytes::from_static(b"sig")),
            }),
            body: Bytes::new(),
        }
    }

    fn proposal() -> ProposalMsg {
        ProposalMsg {
            sync_info: sync_info(),
            proposal_data: Some(ProposalData {
                block: Some(block()),
                height: 10,
                round: 1,
                epoch_id: 0,
                proposer: Some(Bytes::from_static(b"node1")),
                proposer_idx: 1,
                justify_qc: Some(QuorumCert::default()),
            }),
        }
    }

    fn vote() -> VoteMsg {
        VoteMsg {
            vote_data: Some(VoteData {
                block_id: Some(Bytes::from_static(b"B")),
                height: 10,
                round: 1,
                author: Some(Bytes::from_static(b"node1")),
                author_idx: 1,
                ..Default::default()
            }),
            sync_info: sync_info(),
        }
    }

    fn block_fetch_resp(blocks: Vec<BlockPair>) -> BlockFetchRespMsg {
        BlockFetchRespMsg {
            resp_id: 1,
            status: BlockFetchStatus::Succeeded,
            blocks,
            author_idx: 2,
        }
    }

    fn pair() -> BlockPair {
        BlockPair {
            block: Some(block()),
            qc: Some(QuorumCert::default()),
        }
    }

    fn assert_invalid(payload: ConsensusPayload, expected: &str) {
        match validate_payload(&payload) {
            Err(Error::Invalid(reason)) => assert_eq!(reason, expected),
            other => panic!("expected invalid ({expected}), got {other:?}"),
        }
    }

    fn assert_invalid_block(payload: ConsensusPayload, expected: &str) {
        match validate_payload(&payload) {
            Err(Error::InvalidBlock { reason, .. }) => assert_eq!(reason, expected),
            other => panic!("expected invalid block ({expected}), got {other:?}"),
        }
    }

    #[test]
    fn test_valid_messages() {
        validate_payload(&ConsensusPayload::proposal(proposal())).unwrap();
        validate_payload(&ConsensusPayload::vote(vote())).unwrap();
        validate_payload(&ConsensusPayload::block_fetch(BlockFetchMsg {
            block_id: Some(Bytes::from_static(b"B")),
            ..Default::default()
        }))
        .unwrap();
        validate_payload(&ConsensusPayload::block_fetch_resp(block_fetch_resp(vec![
            pair(),
            pair(),
        ])))
        .unwrap();
        validate(&ConsensusPayload::vote(vote()).into()).unwrap();
    }

    #[test]
    fn test_missing_payload() {
        assert!(matches!(
            validate(&ConsensusMsg::default()),
            Err(Error::MissingPayload)
        ));
        let payload = ConsensusPayload {
            kind: MessageType::Vote,
            data: None,
        };
        assert!(matches!(
            validate_payload(&payload),
            Err(Error::MissingData(MessageType::Vote))
        ));
    }

    #[test]
    fn test_mismatched_type() {
        let payload = ConsensusPayload {
            kind: MessageType::Vote,
            data: Some(Data::Proposal(proposal())),
        };
        assert!(matches!(
            validate_payload(&payload),
            Err(Error::WrongMessageType {
                expected: MessageType::Vote,
                found: MessageType::Proposal
            })
        ));
    }

    #[test]
    fn test_invalid_proposal() {
        let mut msg = proposal();
        msg.sync_info = None;
        assert_invalid(ConsensusPayload::proposal(msg), "nil sync info in proposal msg");

        let mut msg = proposal();
        msg.sync_info = Some(SyncInfo::default());
        assert_invalid(
            ConsensusPayload::proposal(msg),
            "nil highest qc in sync info within proposal msg",
        );

        let mut msg = proposal();
        msg.proposal_data = None;
        assert_invalid(ConsensusPayload::proposal(msg), "nil proposal data");

        let mut msg = proposal();
        msg.proposal_data.as_mut().unwrap().block = None;
        assert_invalid(ConsensusPayload::proposal(msg), "nil block in proposal msg");

        let mut msg = proposal();
        msg.proposal_data.as_mut().unwrap().block.as_mut().unwrap().header = None;
        assert_invalid_block(ConsensusPayload::proposal(msg), "nil block header");

        let mut msg = proposal();
        let data = msg.proposal_data.as_mut().unwrap();
        data.block.as_mut().unwrap().header.as_mut().unwrap().pre_block_hash = None;
        assert_invalid_block(ConsensusPayload::proposal(msg), "nil previous block hash");

        let mut msg = proposal();
        let data = msg.proposal_data.as_mut().unwrap();
        data.block.as_mut().unwrap().header.as_mut().unwrap().signature = None;
        assert_invalid_block(ConsensusPayload::proposal(msg), "nil block signature");

        let mut msg = proposal();
        msg.proposal_data.as_mut().unwrap().proposer = None;
        assert_invalid(
            ConsensusPayload::proposal(msg),
            "nil proposer address in proposal msg",
        );

        let mut msg = proposal();
        msg.proposal_data.as_mut().unwrap().justify_qc = None;
        assert_invalid(ConsensusPayload::proposal(msg), "nil justify qc in proposal msg");
    }

    #[test]
    fn test_invalid_vote() {
        let mut msg = vote();
        msg.sync_info = None;
        assert_invalid(ConsensusPayload::vote(msg), "nil sync info in vote msg");

        let mut msg = vote();
        msg.sync_info = Some(SyncInfo::default());
        assert_invalid(
            ConsensusPayload::vote(msg),
            "nil highest qc in sync info within vote msg",
        );

        let mut msg = vote();
        msg.vote_data = None;
        assert_invalid(ConsensusPayload::vote(msg), "nil vote data");

        let mut msg = vote();
        msg.vote_data.as_mut().unwrap().author = None;
        assert_invalid(ConsensusPayload::vote(msg), "nil author in vote msg");
    }

    #[test]
    fn test_vote_target_required() {
        // Neither a block nor a new view
        let mut msg = vote();
        msg.vote_data.as_mut().unwrap().block_id = None;
        assert!(matches!(
            validate_payload(&ConsensusPayload::vote(msg)),
            Err(Error::NoVoteTarget)
        ));

        // An empty block hash is not a block
        let mut msg = vote();
        msg.vote_data.as_mut().unwrap().block_id = Some(Bytes::new());
        assert!(matches!(
            validate_payload(&ConsensusPayload::vote(msg)),
            Err(Error::NoVoteTarget)
        ));

        // A new view vote needs no block
        let mut msg = vote();
        let data = msg.vote_data.as_mut().unwrap();
        data.block_id = None;
        data.new_view = true;
        validate_payload(&ConsensusPayload::vote(msg)).unwrap();
    }

    #[test]
    fn test_invalid_block_fetch() {
        assert_invalid(
            ConsensusPayload::block_fetch(BlockFetchMsg::default()),
            "nil block id in block fetch msg",
        );
    }

    #[test]
    fn test_invalid_block_fetch_resp() {
        assert_invalid(
            ConsensusPayload::block_fetch_resp(block_fetch_resp(Vec::new())),
            "empty blocks from block fetch rsp msg",
        );

        // An unsuccessful fetch may come back empty
        let mut msg = block_fetch_resp(Vec::new());
        msg.status = BlockFetchStatus::NotEnoughBlocks;
        validate_payload(&ConsensusPayload::block_fetch_resp(msg)).unwrap();

        let mut missing_qc = pair();
        missing_qc.qc = None;
        assert_invalid(
            ConsensusPayload::block_fetch_resp(block_fetch_resp(vec![pair(), missing_qc])),
            "nil block or nil qc in block pair from block fetch rsp msg",
        );

        let mut missing_block = pair();
        missing_block.block = None;
        assert_invalid(
            ConsensusPayload::block_fetch_resp(block_fetch_resp(vec![missing_block])),
            "nil block or nil qc in block pair from block fetch rsp msg",
        );

        let mut missing_header = pair();
        missing_header.block.as_mut().unwrap().header = None;
        assert_invalid_block(
            ConsensusPayload::block_fetch_resp(block_fetch_resp(vec![missing_header])),
            "nil block header",
        );

        let mut missing_signature = pair();
        let block = missing_signature.block.as_mut().unwrap();
        block.header.as_mut().unwrap().signature = None;
        assert_invalid_block(
            ConsensusPayload::block_fetch_resp(block_fetch_resp(vec![missing_signature])),
            "nil block signature",
        );

        // Returned blocks are checked whatever the status
        let mut missing_hash = pair();
        let block = missing_hash.block.as_mut().unwrap();
        block.header.as_mut().unwrap().pre_block_hash = None;
        let mut msg = block_fetch_resp(vec![missing_hash]);
        msg.status = BlockFetchStatus::NotEnoughBlocks;
        assert_invalid_block(
            ConsensusPayload::block_fetch_resp(msg),
            "nil previous block hash",
        );
    }
}
