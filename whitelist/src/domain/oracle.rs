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

use crate::domain::{Checkpoint, CheckpointNumber, Milestone, ResolveError, Span};
use std::{num::ParseIntError, time::Duration};
use thiserror::Error;
use whitelist_common::{domain::ByteArrayLenError, error::BoxError};

/// Oracle abstraction. Every call is a single attempt bounded by the client's request timeout;
/// implementations never retry and hold no state across calls.
#[trait_variant::make(Send)]
pub trait Oracle
where
    Self: Clone + Send + Sync + 'static,
{
    /// Fetch the checkpoint with the given number or the latest one.
    async fn fetch_checkpoint(&self, number: CheckpointNumber) -> Result<Checkpoint, OracleError>;

    /// Fetch the number of checkpoints.
    async fn fetch_checkpoint_count(&self) -> Result<i64, OracleError>;

    /// Fetch the latest milestone; fails with [OracleError::NotAvailable] if there is none yet.
    async fn fetch_milestone(&self) -> Result<Milestone, OracleError>;

    /// Fetch the number of milestones.
    async fn fetch_milestone_count(&self) -> Result<i64, OracleError>;

    async fn fetch_span(&self, span_id: u64) -> Result<Span, OracleError>;

    async fn fetch_latest_span(&self) -> Result<Span, OracleError>;

    /// Check that the milestone with the given ID is in the oracle's list of rejected
    /// milestones; fails with [OracleError::NotInRejectedList] otherwise.
    async fn fetch_no_ack_milestone(&self, milestone_id: &str) -> Result<(), OracleError>;

    /// Fetch the ID of the most recently rejected milestone.
    async fn fetch_last_no_ack_milestone(&self) -> Result<String, OracleError>;

    /// Release this handle on the underlying connection.
    async fn close(self);
}

/// Errors shared by all [Oracle] implementations, independent of the wire protocol.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} not available yet")]
    NotAvailable(&'static str),

    #[error("milestone {0} is not in the list of rejected milestones")]
    NotInRejectedList(String),

    #[error("request {0} timed out after {1:?}")]
    Timeout(&'static str, Duration),

    #[error("cannot send request {0}")]
    Transport(&'static str, #[source] BoxError),

    #[error("request {0} failed with status {1}")]
    Status(&'static str, String),
}

impl OracleError {
    /// Whether a later poll may succeed; decode errors indicate version skew and are not
    /// retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OracleError::Decode(_))
    }

    /// Whether the oracle simply has no data yet, e.g. during cold start.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            OracleError::NotFound(_) | OracleError::NotAvailable(_)
        )
    }

    /// Short label, e.g. for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Decode(_) => "decode",
            OracleError::NotFound(_) => "not_found",
            OracleError::NotAvailable(_) => "not_available",
            OracleError::NotInRejectedList(_) => "not_in_rejected_list",
            OracleError::Timeout(..) => "timeout",
            OracleError::Transport(..) => "transport",
            OracleError::Status(..) => "status",
        }
    }
}

/// A malformed oracle payload. Decoding is atomic: on error no partially decoded value is
/// returned.
#[derive(Debug, Error)]
#[error("cannot decode {field}")]
pub struct DecodeError {
    pub field: &'static str,

    #[source]
    pub cause: DecodeCause,
}

impl DecodeError {
    pub fn new(field: &'static str, cause: impl Into<DecodeCause>) -> Self {
        Self {
            field,
            cause: cause.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, DecodeCause::Missing)
    }
}

#[derive(Debug, Error)]
pub enum DecodeCause {
    #[error("invalid JSON")]
    Json(#[from] serde_json::Error),

    #[error("invalid decimal number {0:?}")]
    Integer(String, #[source] ParseIntError),

    #[error("unexpected sign in unsigned number {0:?}")]
    UnexpectedSign(String),

    #[error("invalid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid hex")]
    Hex(#[from] const_hex::FromHexError),

    #[error(transparent)]
    Len(#[from] ByteArrayLenError),

    #[error("required field is missing")]
    Missing,

    #[error("start block {start_block} is after end block {end_block}")]
    InvalidRange { start_block: u64, end_block: u64 },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
