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

use derive_more::Display;
use thiserror::Error;
use whitelist_common::domain::{Address, Hash};

/// A finalized, contiguous block range attested by the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub root_hash: Hash,
    pub chain_id: String,
    pub timestamp: u64,
}

/// A faster, less final hint than a [Checkpoint], used for rapid reorg protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub hash: Hash,
    pub chain_id: String,
    pub milestone_id: String,
    pub timestamp: u64,
    pub total_difficulty: u64,
}

/// Which checkpoint to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CheckpointNumber {
    #[display("latest")]
    Latest,

    #[display("{_0}")]
    At(u64),
}

impl TryFrom<i64> for CheckpointNumber {
    type Error = InvalidCheckpointNumber;

    /// `-1` means latest, any other negative number is invalid.
    fn try_from(number: i64) -> Result<Self, Self::Error> {
        match number {
            -1 => Ok(Self::Latest),
            number => u64::try_from(number)
                .map(Self::At)
                .map_err(|_| InvalidCheckpointNumber(number)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid checkpoint number {0}, expected -1 for latest or a non-negative index")]
pub struct InvalidCheckpointNumber(pub i64);

/// The two kinds of anchors, tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AnchorKind {
    #[display("checkpoint")]
    Checkpoint,

    #[display("milestone")]
    Milestone,
}

/// The part of a [Checkpoint] or [Milestone] that is verified against the local chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub start_block: u64,
    pub end_block: u64,
    pub hash: Hash,
}

impl From<&Checkpoint> for Candidate {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            start_block: checkpoint.start_block,
            end_block: checkpoint.end_block,
            hash: checkpoint.root_hash,
        }
    }
}

impl From<&Milestone> for Candidate {
    fn from(milestone: &Milestone) -> Self {
        Self {
            start_block: milestone.start_block,
            end_block: milestone.end_block,
            hash: milestone.hash,
        }
    }
}
