// This file is part of anchor-whitelist.
// Copyright (C) 2025 anchor-whitelist contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Protobuf messages of the oracle's RPC stream service along with their conversion into the
//! domain types.

use crate::{
    domain::{self, DecodeError, RawSpan},
    infra::codec::check_range,
};
use whitelist_common::domain::{Address, Hash};

pub const FETCH_CHECKPOINT: &str = "/proto.Heimdall/FetchCheckpoint";
pub const FETCH_CHECKPOINT_COUNT: &str = "/proto.Heimdall/FetchCheckpointCount";
pub const FETCH_MILESTONE: &str = "/proto.Heimdall/FetchMilestone";
pub const FETCH_MILESTONE_COUNT: &str = "/proto.Heimdall/FetchMilestoneCount";
pub const FETCH_NO_ACK_MILESTONE: &str = "/proto.Heimdall/FetchNoAckMilestone";
pub const FETCH_LAST_NO_ACK_MILESTONE: &str = "/proto.Heimdall/FetchLastNoAckMilestone";
pub const SPAN: &str = "/proto.Heimdall/Span";
pub const LATEST_SPAN: &str = "/proto.Heimdall/LatestSpan";

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct H128 {
    #[prost(uint64, tag = "1")]
    pub hi: u64,

    #[prost(uint64, tag = "2")]
    pub lo: u64,
}

/// 20 bytes, big-endian: `hi.hi`, `hi.lo`, `lo`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct H160 {
    #[prost(message, optional, tag = "1")]
    pub hi: Option<H128>,

    #[prost(uint32, tag = "2")]
    pub lo: u32,
}

/// 32 bytes, big-endian: `hi.hi`, `hi.lo`, `lo.hi`, `lo.lo`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct H256 {
    #[prost(message, optional, tag = "1")]
    pub hi: Option<H128>,

    #[prost(message, optional, tag = "2")]
    pub lo: Option<H128>,
}

impl From<H160> for Address {
    fn from(h160: H160) -> Self {
        let hi = h160.hi.unwrap_or_default();

        let mut bytes = [0; 20];
        bytes[..8].copy_from_slice(&hi.hi.to_be_bytes());
        bytes[8..16].copy_from_slice(&hi.lo.to_be_bytes());
        bytes[16..].copy_from_slice(&h160.lo.to_be_bytes());
        bytes.into()
    }
}

impl From<Address> for H160 {
    fn from(address: Address) -> Self {
        let (hi, lo) = address.0.split_at(16);

        Self {
            hi: Some(h128(hi)),
            lo: u32::from_be_bytes([lo[0], lo[1], lo[2], lo[3]]),
        }
    }
}

impl From<H256> for Hash {
    fn from(h256: H256) -> Self {
        let hi = h256.hi.unwrap_or_default();
        let lo = h256.lo.unwrap_or_default();

        let mut bytes = [0; 32];
        for (chunk, limb) in bytes.chunks_exact_mut(8).zip([hi.hi, hi.lo, lo.hi, lo.lo]) {
            chunk.copy_from_slice(&limb.to_be_bytes());
        }
        bytes.into()
    }
}

impl From<Hash> for H256 {
    fn from(hash: Hash) -> Self {
        let (hi, lo) = hash.0.split_at(16);

        Self {
            hi: Some(h128(hi)),
            lo: Some(h128(lo)),
        }
    }
}

fn h128(bytes: &[u8]) -> H128 {
    let mut limbs = bytes
        .chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u64, |n, b| (n << 8) | *b as u64));

    H128 {
        hi: limbs.next().unwrap_or_default(),
        lo: limbs.next().unwrap_or_default(),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchCheckpointRequest {
    /// Checkpoint number, `-1` for the latest one.
    #[prost(int64, tag = "1")]
    pub id: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchCheckpointResponse {
    #[prost(string, tag = "1")]
    pub height: String,

    #[prost(message, optional, tag = "2")]
    pub result: Option<Checkpoint>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Checkpoint {
    #[prost(message, optional, tag = "1")]
    pub proposer: Option<H160>,

    #[prost(uint64, tag = "2")]
    pub start_block: u64,

    #[prost(uint64, tag = "3")]
    pub end_block: u64,

    #[prost(message, optional, tag = "4")]
    pub root_hash: Option<H256>,

    #[prost(string, tag = "5")]
    pub bor_chain_id: String,

    #[prost(uint64, tag = "6")]
    pub timestamp: u64,
}

impl TryFrom<Checkpoint> for domain::Checkpoint {
    type Error = DecodeError;

    fn try_from(checkpoint: Checkpoint) -> Result<Self, Self::Error> {
        check_range("checkpoint", checkpoint.start_block, checkpoint.end_block)?;

        let proposer = checkpoint
            .proposer
            .ok_or(DecodeError::missing("checkpoint.proposer"))?;
        let root_hash = checkpoint
            .root_hash
            .ok_or(DecodeError::missing("checkpoint.root_hash"))?;

        Ok(Self {
            proposer: proposer.into(),
            start_block: checkpoint.start_block,
            end_block: checkpoint.end_block,
            root_hash: root_hash.into(),
            chain_id: checkpoint.bor_chain_id,
            timestamp: checkpoint.timestamp,
        })
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchCheckpointCountResponse {
    #[prost(string, tag = "1")]
    pub height: String,

    #[prost(message, optional, tag = "2")]
    pub result: Option<CheckpointCount>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct CheckpointCount {
    #[prost(int64, tag = "1")]
    pub result: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchMilestoneResponse {
    #[prost(string, tag = "1")]
    pub height: String,

    #[prost(message, optional, tag = "2")]
    pub result: Option<Milestone>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Milestone {
    #[prost(message, optional, tag = "1")]
    pub proposer: Option<H160>,

    #[prost(uint64, tag = "2")]
    pub start_block: u64,

    #[prost(uint64, tag = "3")]
    pub end_block: u64,

    #[prost(message, optional, tag = "4")]
    pub hash: Option<H256>,

    #[prost(string, tag = "5")]
    pub bor_chain_id: String,

    #[prost(string, tag = "6")]
    pub milestone_id: String,

    #[prost(uint64, tag = "7")]
    pub timestamp: u64,

    #[prost(uint64, tag = "8")]
    pub total_difficulty: u64,
}

impl TryFrom<Milestone> for domain::Milestone {
    type Error = DecodeError;

    fn try_from(milestone: Milestone) -> Result<Self, Self::Error> {
        check_range("milestone", milestone.start_block, milestone.end_block)?;

        let proposer = milestone
            .proposer
            .ok_or(DecodeError::missing("milestone.proposer"))?;
        let hash = milestone
            .hash
            .ok_or(DecodeError::missing("milestone.hash"))?;

        Ok(Self {
            proposer: proposer.into(),
            start_block: milestone.start_block,
            end_block: milestone.end_block,
            hash: hash.into(),
            chain_id: milestone.bor_chain_id,
            milestone_id: milestone.milestone_id,
            timestamp: milestone.timestamp,
            total_difficulty: milestone.total_difficulty,
        })
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchMilestoneCountResponse {
    #[prost(string, tag = "1")]
    pub height: String,

    #[prost(message, optional, tag = "2")]
    pub result: Option<MilestoneCount>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct MilestoneCount {
    #[prost(int64, tag = "1")]
    pub count: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchNoAckMilestoneRequest {
    #[prost(string, tag = "1")]
    pub milestone_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchNoAckMilestoneResponse {
    #[prost(string, tag = "1")]
    pub height: String,

    #[prost(message, optional, tag = "2")]
    pub result: Option<NoAckMilestone>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct NoAckMilestone {
    #[prost(bool, tag = "1")]
    pub result: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchLastNoAckMilestoneResponse {
    #[prost(string, tag = "1")]
    pub height: String,

    #[prost(message, optional, tag = "2")]
    pub result: Option<LastNoAckMilestone>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LastNoAckMilestone {
    #[prost(string, tag = "1")]
    pub result: String,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct SpanRequest {
    #[prost(uint64, tag = "1")]
    pub id: u64,
}

/// Request of the [LATEST_SPAN] call; the oracle picks the span.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct LatestSpanRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SpanResponse {
    #[prost(string, tag = "1")]
    pub height: String,

    #[prost(message, optional, tag = "2")]
    pub result: Option<Span>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Span {
    #[prost(uint64, tag = "1")]
    pub id: u64,

    #[prost(uint64, tag = "2")]
    pub start_block: u64,

    #[prost(uint64, tag = "3")]
    pub end_block: u64,

    #[prost(message, optional, tag = "4")]
    pub validator_set: Option<ValidatorSet>,

    #[prost(message, repeated, tag = "5")]
    pub selected_producers: Vec<Validator>,

    #[prost(string, tag = "6")]
    pub chain_id: String,
}

impl TryFrom<Span> for RawSpan {
    type Error = DecodeError;

    fn try_from(span: Span) -> Result<Self, Self::Error> {
        let validator_set = span
            .validator_set
            .ok_or(DecodeError::missing("span.validator_set"))?;

        let validators = validator_set
            .validators
            .into_iter()
            .map(domain::Validator::try_from)
            .collect::<Result<_, _>>()?;

        let proposer = validator_set
            .proposer
            .map(domain::Validator::try_from)
            .transpose()?;

        let selected_producers = span
            .selected_producers
            .into_iter()
            .map(domain::Validator::try_from)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            id: span.id,
            start_block: span.start_block,
            end_block: span.end_block,
            chain_id: span.chain_id,
            validators,
            proposer,
            selected_producers,
        })
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValidatorSet {
    #[prost(message, repeated, tag = "1")]
    pub validators: Vec<Validator>,

    #[prost(message, optional, tag = "2")]
    pub proposer: Option<Validator>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Validator {
    #[prost(uint64, tag = "1")]
    pub id: u64,

    #[prost(message, optional, tag = "2")]
    pub address: Option<H160>,

    #[prost(int64, tag = "3")]
    pub voting_power: i64,

    #[prost(int64, tag = "4")]
    pub proposer_priority: i64,
}

impl TryFrom<Validator> for domain::Validator {
    type Error = DecodeError;

    fn try_from(validator: Validator) -> Result<Self, Self::Error> {
        let address = validator
            .address
            .ok_or(DecodeError::missing("validator.address"))?;

        Ok(Self {
            id: validator.id,
            address: address.into(),
            voting_power: validator.voting_power,
            proposer_priority: validator.proposer_priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{self, DecodeCause, DecodeError, RawSpan},
        infra::grpc_oracle::proto::{
            Checkpoint, H128, H160, H256, LATEST_SPAN, LatestSpanRequest, SPAN, Span, SpanRequest,
            Validator, ValidatorSet,
        },
    };
    use assert_matches::assert_matches;
    use prost::Message;
    use whitelist_common::domain::{Address, ByteArray, Hash};

    #[test]
    fn test_h160() {
        let h160 = H160 {
            hi: Some(H128 {
                hi: 0x0102030405060708,
                lo: 0x090a0b0c0d0e0f10,
            }),
            lo: 0x11121314,
        };
        let address = Address::from(h160);
        assert_eq!(address.0, core::array::from_fn::<u8, 20, _>(|n| n as u8 + 1));
        assert_eq!(H160::from(address), h160);

        let address = Address::from(H160 { hi: None, lo: 1 });
        assert_eq!(address.0[..19], [0; 19]);
        assert_eq!(address.0[19], 1);
    }

    #[test]
    fn test_h256() {
        let hash = ByteArray(core::array::from_fn::<u8, 32, _>(|n| n as u8));
        let h256 = H256::from(hash);
        assert_eq!(
            h256.hi,
            Some(H128 {
                hi: 0x0001020304050607,
                lo: 0x08090a0b0c0d0e0f,
            })
        );
        assert_eq!(Hash::from(h256), hash);
    }

    #[test]
    fn test_checkpoint() {
        let checkpoint = Checkpoint {
            proposer: Some(ByteArray([1; 20]).into()),
            start_block: 1_025,
            end_block: 1_280,
            root_hash: Some(ByteArray([2; 32]).into()),
            bor_chain_id: "137".to_owned(),
            timestamp: 1_700_000_000,
        };

        // Decoded from the wire, as it would be received.
        let bytes = checkpoint.encode_to_vec();
        let received = Checkpoint::decode(bytes.as_slice()).expect("can be decoded");

        let checkpoint = domain::Checkpoint::try_from(received.clone()).expect("can be converted");
        assert_eq!(checkpoint.proposer, ByteArray([1; 20]));
        assert_eq!(checkpoint.root_hash, ByteArray([2; 32]));
        assert_eq!(checkpoint.end_block, 1_280);

        let missing_hash = Checkpoint {
            root_hash: None,
            ..received.clone()
        };
        assert_matches!(
            domain::Checkpoint::try_from(missing_hash),
            Err(DecodeError {
                field: "checkpoint.root_hash",
                cause: DecodeCause::Missing,
            })
        );

        let invalid_range = Checkpoint {
            start_block: 2_000,
            ..received
        };
        assert_matches!(
            domain::Checkpoint::try_from(invalid_range),
            Err(DecodeError {
                cause: DecodeCause::InvalidRange { .. },
                ..
            })
        );
    }

    #[test]
    fn test_span() {
        let validator = |id: u8| Validator {
            id: id as u64,
            address: Some(ByteArray([id; 20]).into()),
            voting_power: id as i64 * 100,
            proposer_priority: 0,
        };

        let span = Span {
            id: 9,
            start_block: 100,
            end_block: 199,
            validator_set: Some(ValidatorSet {
                validators: vec![validator(2), validator(1)],
                proposer: Some(validator(1)),
            }),
            selected_producers: vec![validator(2), validator(1)],
            chain_id: "137".to_owned(),
        };

        let raw_span = RawSpan::try_from(span.clone()).expect("can be converted");
        assert_eq!(raw_span.id, 9);
        assert_eq!(raw_span.proposer.map(|v| v.id), Some(1));
        assert_eq!(raw_span.selected_producers[0].id, 2);

        let span = Span {
            validator_set: None,
            ..span
        };
        assert_matches!(
            RawSpan::try_from(span),
            Err(DecodeError {
                field: "span.validator_set",
                ..
            })
        );
    }

    #[test]
    fn test_latest_span_request() {
        assert_eq!(LATEST_SPAN, "/proto.Heimdall/LatestSpan");
        assert_ne!(LATEST_SPAN, SPAN);

        // The latest span is a call of its own without any span ID on the wire.
        assert!(LatestSpanRequest {}.encode_to_vec().is_empty());
        assert!(
            LatestSpanRequest::decode(SpanRequest { id: 7 }.encode_to_vec().as_slice()).is_ok()
        );
        assert_eq!(
            SpanRequest::decode(LatestSpanRequest {}.encode_to_vec().as_slice())
                .expect("can be decoded"),
            SpanRequest { id: 0 }
        );
    }
}
