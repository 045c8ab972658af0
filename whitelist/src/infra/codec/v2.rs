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

//! Wire types of the second protocol generation: proto3 JSON, i.e. 64-bit numbers as decimal
//! strings and bytes as standard base64.

use crate::{
    domain::{self, DecodeError, RawSpan},
    infra::codec::{check_range, decode_base64_hash, decode_hex, parse_i64, parse_u64},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CheckpointResponse {
    pub checkpoint: Checkpoint,
}

#[derive(Debug, Deserialize)]
pub struct Checkpoint {
    proposer: String,
    start_block: String,
    end_block: String,
    root_hash: String,
    bor_chain_id: String,
    timestamp: String,
}

impl TryFrom<Checkpoint> for domain::Checkpoint {
    type Error = DecodeError;

    fn try_from(checkpoint: Checkpoint) -> Result<Self, Self::Error> {
        let start_block = parse_u64("checkpoint.start_block", &checkpoint.start_block)?;
        let end_block = parse_u64("checkpoint.end_block", &checkpoint.end_block)?;
        check_range("checkpoint", start_block, end_block)?;

        Ok(Self {
            proposer: decode_hex("checkpoint.proposer", &checkpoint.proposer)?,
            start_block,
            end_block,
            root_hash: decode_base64_hash("checkpoint.root_hash", &checkpoint.root_hash)?,
            chain_id: checkpoint.bor_chain_id,
            timestamp: parse_u64("checkpoint.timestamp", &checkpoint.timestamp)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckpointCount {
    pub ack_count: String,
}

#[derive(Debug, Deserialize)]
pub struct MilestoneResponse {
    pub milestone: Milestone,
}

#[derive(Debug, Deserialize)]
pub struct Milestone {
    proposer: String,
    start_block: String,
    end_block: String,
    hash: String,
    bor_chain_id: String,
    milestone_id: String,
    timestamp: String,
    total_difficulty: String,
}

impl TryFrom<Milestone> for domain::Milestone {
    type Error = DecodeError;

    fn try_from(milestone: Milestone) -> Result<Self, Self::Error> {
        let start_block = parse_u64("milestone.start_block", &milestone.start_block)?;
        let end_block = parse_u64("milestone.end_block", &milestone.end_block)?;
        check_range("milestone", start_block, end_block)?;

        Ok(Self {
            proposer: decode_hex("milestone.proposer", &milestone.proposer)?,
            start_block,
            end_block,
            hash: decode_base64_hash("milestone.hash", &milestone.hash)?,
            chain_id: milestone.bor_chain_id,
            milestone_id: milestone.milestone_id,
            timestamp: parse_u64("milestone.timestamp", &milestone.timestamp)?,
            total_difficulty: parse_u64(
                "milestone.total_difficulty",
                &milestone.total_difficulty,
            )?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MilestoneCount {
    pub count: String,
}

#[derive(Debug, Deserialize)]
pub struct SpanResponse {
    pub span: Span,
}

#[derive(Debug, Deserialize)]
pub struct Span {
    id: String,
    start_block: String,
    end_block: String,
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
            id: parse_u64("span.id", &span.id)?,
            start_block: parse_u64("span.start_block", &span.start_block)?,
            end_block: parse_u64("span.end_block", &span.end_block)?,
            chain_id: span.bor_chain_id,
            validators,
            proposer,
            selected_producers,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Validator {
    val_id: String,
    signer: String,
    voting_power: String,
    proposer_priority: String,
}

impl TryFrom<Validator> for domain::Validator {
    type Error = DecodeError;

    fn try_from(validator: Validator) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_u64("validator.val_id", &validator.val_id)?,
            address: decode_hex("validator.signer", &validator.signer)?,
            voting_power: parse_i64("validator.voting_power", &validator.voting_power)?,
            proposer_priority: parse_i64(
                "validator.proposer_priority",
                &validator.proposer_priority,
            )?,
        })
    }
}
