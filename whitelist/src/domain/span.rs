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

use std::collections::HashSet;
use thiserror::Error;
use whitelist_common::domain::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    pub id: u64,
    pub address: Address,
    pub voting_power: i64,
    pub proposer_priority: i64,
}

/// The validators of a span along with the proposer designated by the oracle. Membership has set
/// semantics: the order in which the oracle transmits the validators is not significant, hence
/// validators are kept ordered by address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    proposer: Validator,
}

impl ValidatorSet {
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn proposer(&self) -> &Validator {
        &self.proposer
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.validators
            .binary_search_by(|v| v.address.cmp(address))
            .is_ok()
    }

    pub fn total_voting_power(&self) -> i64 {
        self.validators.iter().map(|v| v.voting_power).sum()
    }
}

/// Which validators are eligible proposers for a block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub id: u64,
    pub start_block: u64,
    pub end_block: u64,
    pub chain_id: String,
    pub validator_set: ValidatorSet,

    /// Proposer rotation order for the block range, exactly as designated by the oracle.
    pub selected_producers: Vec<Validator>,
}

impl Span {
    pub fn contains_block(&self, number: u64) -> bool {
        self.start_block <= number && number <= self.end_block
    }
}

/// A span as transmitted by the oracle, before validator set resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpan {
    pub id: u64,
    pub start_block: u64,
    pub end_block: u64,
    pub chain_id: String,
    pub validators: Vec<Validator>,
    pub proposer: Option<Validator>,
    pub selected_producers: Vec<Validator>,
}

/// Resolve the given [RawSpan] into a [Span]. The proposer is the one designated by the oracle,
/// it is never re-derived from voting power; the order of the selected producers is kept.
pub fn resolve(raw_span: RawSpan) -> Result<Span, ResolveError> {
    let RawSpan {
        id,
        start_block,
        end_block,
        chain_id,
        mut validators,
        proposer,
        selected_producers,
    } = raw_span;

    if start_block > end_block {
        return Err(ResolveError::InvalidRange {
            start_block,
            end_block,
        });
    }

    let mut addresses = HashSet::with_capacity(validators.len());
    if let Some(duplicate) = validators.iter().find(|v| !addresses.insert(v.address)) {
        return Err(ResolveError::DuplicateValidator(duplicate.address));
    }
    validators.sort_unstable_by_key(|v| v.address);

    let proposer = proposer.ok_or(ResolveError::MissingProposer(id))?;
    if !addresses.contains(&proposer.address) {
        return Err(ResolveError::ProposerNotInSet(proposer.address));
    }

    Ok(Span {
        id,
        start_block,
        end_block,
        chain_id,
        validator_set: ValidatorSet {
            validators,
            proposer,
        },
        selected_producers,
    })
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("span start block {start_block} is after end block {end_block}")]
    InvalidRange { start_block: u64, end_block: u64 },

    #[error("validator {0} occurs more than once")]
    DuplicateValidator(Address),

    #[error("no proposer designated for span {0}")]
    MissingProposer(u64),

    #[error("proposer {0} is not a member of the validator set")]
    ProposerNotInSet(Address),
}
