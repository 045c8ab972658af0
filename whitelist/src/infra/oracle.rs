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

use crate::{
    domain::{Checkpoint, CheckpointNumber, Milestone, Oracle, OracleError, Span},
    infra::{
        grpc_oracle::{self, GrpcOracle},
        rest_oracle::{self, RestOracle},
    },
};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use whitelist_common::domain::{ActiveGeneration, ProtocolGeneration};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: Transport,

    pub url: String,

    #[serde(default)]
    pub generation: ProtocolGeneration,

    #[serde(with = "humantime_serde", default = "request_timeout_default")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Rest,
    Grpc,
}

/// The [Oracle] implementation selected by configuration.
#[derive(Debug, Clone)]
pub enum OracleClient {
    Rest(RestOracle),
    Grpc(GrpcOracle),
}

impl OracleClient {
    /// Create a client for the configured transport; the REST client decodes according to the
    /// given shared generation flag.
    pub fn new(config: Config, generation: ActiveGeneration) -> Result<Self, OracleClientError> {
        let Config {
            transport,
            url,
            request_timeout,
            ..
        } = config;

        let client = match transport {
            Transport::Rest => {
                OracleClient::Rest(RestOracle::new(url, generation, request_timeout)?)
            }
            Transport::Grpc => OracleClient::Grpc(GrpcOracle::new(url, request_timeout)?),
        };

        Ok(client)
    }
}

impl Oracle for OracleClient {
    async fn fetch_checkpoint(&self, number: CheckpointNumber) -> Result<Checkpoint, OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_checkpoint(number).await,
            OracleClient::Grpc(oracle) => oracle.fetch_checkpoint(number).await,
        }
    }

    async fn fetch_checkpoint_count(&self) -> Result<i64, OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_checkpoint_count().await,
            OracleClient::Grpc(oracle) => oracle.fetch_checkpoint_count().await,
        }
    }

    async fn fetch_milestone(&self) -> Result<Milestone, OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_milestone().await,
            OracleClient::Grpc(oracle) => oracle.fetch_milestone().await,
        }
    }

    async fn fetch_milestone_count(&self) -> Result<i64, OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_milestone_count().await,
            OracleClient::Grpc(oracle) => oracle.fetch_milestone_count().await,
        }
    }

    async fn fetch_span(&self, span_id: u64) -> Result<Span, OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_span(span_id).await,
            OracleClient::Grpc(oracle) => oracle.fetch_span(span_id).await,
        }
    }

    async fn fetch_latest_span(&self) -> Result<Span, OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_latest_span().await,
            OracleClient::Grpc(oracle) => oracle.fetch_latest_span().await,
        }
    }

    async fn fetch_no_ack_milestone(&self, milestone_id: &str) -> Result<(), OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_no_ack_milestone(milestone_id).await,
            OracleClient::Grpc(oracle) => oracle.fetch_no_ack_milestone(milestone_id).await,
        }
    }

    async fn fetch_last_no_ack_milestone(&self) -> Result<String, OracleError> {
        match self {
            OracleClient::Rest(oracle) => oracle.fetch_last_no_ack_milestone().await,
            OracleClient::Grpc(oracle) => oracle.fetch_last_no_ack_milestone().await,
        }
    }

    async fn close(self) {
        match self {
            OracleClient::Rest(oracle) => oracle.close().await,
            OracleClient::Grpc(oracle) => oracle.close().await,
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleClientError {
    #[error("cannot create REST oracle client")]
    Rest(#[from] rest_oracle::Error),

    #[error("cannot create gRPC oracle client")]
    Grpc(#[from] grpc_oracle::Error),
}

/// Bound the given oracle call by the given timeout.
pub(super) async fn with_timeout<T>(
    request: &'static str,
    timeout: Duration,
    call: impl Future<Output = Result<T, OracleError>>,
) -> Result<T, OracleError> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| OracleError::Timeout(request, timeout))?
}

fn request_timeout_default() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}
