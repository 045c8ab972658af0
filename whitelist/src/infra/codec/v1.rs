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

//! Wire types of the first protocol generation: REST responses wrapped in a `height`/`result`
//! envelope with native JSON numbers and `0x` prefixed hex hashes.

use crate::{
    domain::{self, DecodeError, RawSpan},
    infra::codec::{check_range, decode_hex},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub struct Checkpoint {
    proposer: String,
    start_block: u64,
    end_block: u64,
    root_hash: String,
    bor_chain_id: String,
    timestamp: u64,
}

impl TryFrom<Checkpoint> for domain::Checkpoint {
    type Error = DecodeError;

    fn try_from(checkpoint: Checkpoint) -> Result<Self, Self::Error> {
        check_range("checkpoint", checkpoint.start_block, checkpoint.end_block)?;

        Ok(Self {
            proposer: decode_hex("checkpoint.proposer", &checkpoint.proposer)?,
            start_block: checkpoint.start_block,
            end_block: checkpoint.end_block,
            root_hash: decode_hex("checkpoint.root_hash", &checkpoint.root_hash)?,
            chain_id: checkpoint.bor_chain_id,
            timestamp: checkpoint.timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckpointCount {
    pub result: i64,
}

#[derive(Debug, Deserialize)]
pub struct Milestone {
    proposer: String,
    start_block: u64,
    end_block: u64,
    hash: String,
    bor_chain_id: String,
    milestone_id: String,
    timestamp: u64,
}

impl TryFrom<Milestone> for domain::Milestone {
    type Error = DecodeError;

    fn try_from(milestone: Milestone) -> Result<Self, Self::Error> {
        check_range("milestone", milestone.start_block, milestone.end_block)?;

        Ok(Self {
            proposer: decode_hex("milestone.proposer", &milestone.proposer)?,
            start_block: milestone.start_block,
            end_block: milestone.end_block,
            hash: decode_hex("milestone.hash", &milestone.hash)?,
            chain_id: milestone.bor_chain_id,
            milestone_id: milestone.milestone_id,
            timestamp: milestone.timestamp,
            // Not part of this generation.
            total_difficulty: 0,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MilestoneCount {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct Span {
    span_id: u64,
    start_block: u64,
    end_block: u64,
    validator_set: ValidatorSet,
    selected_producers: Vec<Validator>,
    bor_chain_id: String,
}

#[derive(Debug, Deserialize)]
struct ValidatorSet {
    validators: Vec<Validator>,
    proposer: Option<Validator>,
}

impl TryFrom<Span> for RawSpan {
    type Error = DecodeError;

    fn try_from(span: Span) -> Result<Self, Self::Error> {
        let validators = span
            .validator_set
            .validators
            .into_iter()
            .map(domain::Validator::try_from)
            .collect::<Result<_, _>>()?;

        let proposer = span
            .validator_set
            .proposer
            .map(domain::Validator::try_from)
            .transpose()?;

        let selected_producers = span
            .selected_producers
            .into_iter()
            .map(domain::Validator::try_from)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            id: span.span_id,
            start_block: span.start_block,
            end_block: span.end_block,
            chain_id: span.bor_chain_id,
            validators,
            proposer,
            selected_producers,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Validator {
    #[serde(rename = "ID")]
    id: u64,
    signer: String,
    power: i64,
    accum: i64,
}

impl TryFrom<Validator> for domain::Validator {
    type Error = DecodeError;

    fn try_from(validator: Validator) -> Result<Self, Self::Error> {
        Ok(Self {
            id: validator.id,
            address: decode_hex("validator.signer", &validator.signer)?,
            voting_power: validator.power,
            proposer_priority: validator.accum,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NoAck {
    pub result: bool,
}

#[derive(Debug, Deserialize)]
pub struct LastNoAck {
    pub result: String,
}
