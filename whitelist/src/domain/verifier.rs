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

use crate::domain::{AnchorKind, Candidate};
use thiserror::Error;
use whitelist_common::domain::Hash;

/// Checks whether a candidate block range with a given hash is consistent with the locally known
/// chain. Verification is synchronous: it only consults local state.
pub trait Verifier
where
    Self: Send + Sync + 'static,
{
    /// Return the locally known hash for the candidate's range, which equals the candidate hash
    /// on success.
    fn verify(&self, candidate: &Candidate, kind: AnchorKind) -> Result<Hash, VerificationError>;
}

/// Read access to locally known headers, provided by the chain engine.
pub trait ChainReader
where
    Self: Send + Sync + 'static,
{
    /// Whether all headers from `start` to `end` (inclusive) are known locally.
    fn is_known_range(&self, start: u64, end: u64) -> bool;

    /// The canonical hash at the given block number, `None` if not (yet) known.
    fn hash_at(&self, number: u64) -> Option<Hash>;
}

/// A [Verifier] comparing the candidate hash with the canonical hash at the candidate's end
/// block.
#[derive(Debug, Clone)]
pub struct ChainVerifier<C> {
    chain: C,
}

impl<C> ChainVerifier<C>
where
    C: ChainReader,
{
    pub fn new(chain: C) -> Self {
        Self { chain }
    }
}

impl<C> Verifier for ChainVerifier<C>
where
    C: ChainReader,
{
    fn verify(&self, candidate: &Candidate, kind: AnchorKind) -> Result<Hash, VerificationError> {
        let Candidate {
            start_block,
            end_block,
            hash,
        } = *candidate;

        let local = self
            .chain
            .hash_at(end_block)
            .ok_or(VerificationError::Syncing { kind, end_block })?;

        if !self.chain.is_known_range(start_block, end_block) {
            return Err(VerificationError::UnknownRange {
                kind,
                start_block,
                end_block,
            });
        }

        if local != hash {
            return Err(VerificationError::HashMismatch {
                kind,
                end_block,
                expected: hash,
                local,
            });
        }

        Ok(local)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("{kind} end block {end_block} not yet known locally, still syncing")]
    Syncing { kind: AnchorKind, end_block: u64 },

    #[error("{kind} range {start_block}..={end_block} not fully known locally")]
    UnknownRange {
        kind: AnchorKind,
        start_block: u64,
        end_block: u64,
    },

    #[error("{kind} hash {expected} at block {end_block} conflicts with local hash {local}")]
    HashMismatch {
        kind: AnchorKind,
        end_block: u64,
        expected: Hash,
        local: Hash,
    },
}

impl VerificationError {
    /// Whether the local chain conflicts with the oracle, as opposed to merely lagging behind.
    pub fn is_conflict(&self) -> bool {
        matches!(self, VerificationError::HashMismatch { .. })
    }
}
