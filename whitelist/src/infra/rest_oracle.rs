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
    infra::{codec::JsonCodec, oracle::with_timeout},
};
use log::debug;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use whitelist_common::domain::{ActiveGeneration, ProtocolGeneration};

/// An [Oracle] implementation talking JSON over HTTP. The wire generation is read from the shared
/// flag once per call, hence a single call never mixes decode paths.
#[derive(Debug, Clone)]
pub struct RestOracle {
    client: Client,
    url: String,
    generation: ActiveGeneration,
    request_timeout: Duration,
}

impl RestOracle {
    pub fn new(
        url: impl Into<String>,
        generation: ActiveGeneration,
        request_timeout: Duration,
    ) -> Result<Self, Error> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()?;

        let url = url.into().trim_end_matches('/').to_owned();

        Ok(Self {
            client,
            url,
            generation,
            request_timeout,
        })
    }

    fn codec(&self) -> JsonCodec {
        JsonCodec::new(self.generation.get())
    }

    async fn get(&self, request: &'static str, path: &str) -> Result<Vec<u8>, OracleError> {
        let url = format!("{}{path}", self.url);
        debug!(url:%; "requesting {request}");

        let call = async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|error| self.map_reqwest_error(request, error))?;

            match response.status() {
                status if status.is_success() => {}
                StatusCode::NOT_FOUND => return Err(OracleError::NotFound(path.to_owned())),
                StatusCode::SERVICE_UNAVAILABLE => return Err(OracleError::NotAvailable(request)),
                status => return Err(OracleError::Status(request, status.to_string())),
            }

            let body = response
                .bytes()
                .await
                .map_err(|error| self.map_reqwest_error(request, error))?;

            Ok(body.to_vec())
        };

        with_timeout(request, self.request_timeout, call).await
    }

    fn map_reqwest_error(&self, request: &'static str, error: reqwest::Error) -> OracleError {
        if error.is_timeout() {
            OracleError::Timeout(request, self.request_timeout)
        } else {
            OracleError::Transport(request, error.into())
        }
    }
}

impl Oracle for RestOracle {
    async fn fetch_checkpoint(&self, number: CheckpointNumber) -> Result<Checkpoint, OracleError> {
        let codec = self.codec();
        let body = self
            .get("checkpoint", &format!("/checkpoints/{number}"))
            .await?;

        Ok(codec.decode_checkpoint(&body)?)
    }

    async fn fetch_checkpoint_count(&self) -> Result<i64, OracleError> {
        let codec = self.codec();
        let body = self.get("checkpoint count", "/checkpoints/count").await?;

        Ok(codec.decode_checkpoint_count(&body)?)
    }

    async fn fetch_milestone(&self) -> Result<Milestone, OracleError> {
        let codec = self.codec();
        let path = match codec.generation() {
            ProtocolGeneration::V1 => "/milestone/latest",
            ProtocolGeneration::V2 => "/milestones/latest",
        };

        // Before the first milestone the oracle answers with "not found" or "unavailable".
        let body = self
            .get("milestone", path)
            .await
            .map_err(|error| match error {
                OracleError::NotFound(_) | OracleError::NotAvailable(_) => {
                    OracleError::NotAvailable("milestone")
                }
                other => other,
            })?;

        Ok(codec.decode_milestone(&body)?)
    }

    async fn fetch_milestone_count(&self) -> Result<i64, OracleError> {
        let codec = self.codec();
        let path = match codec.generation() {
            ProtocolGeneration::V1 => "/milestone/count",
            ProtocolGeneration::V2 => "/milestones/count",
        };
        let body = self.get("milestone count", path).await?;

        Ok(codec.decode_milestone_count(&body)?)
    }

    async fn fetch_span(&self, span_id: u64) -> Result<Span, OracleError> {
        let codec = self.codec();
        let path = match codec.generation() {
            ProtocolGeneration::V1 => format!("/bor/span/{span_id}"),
            ProtocolGeneration::V2 => format!("/bor/spans/{span_id}"),
        };
        let body = self.get("span", &path).await?;

        Ok(codec.decode_span(&body)?)
    }

    async fn fetch_latest_span(&self) -> Result<Span, OracleError> {
        let codec = self.codec();
        let path = match codec.generation() {
            ProtocolGeneration::V1 => "/bor/latest-span",
            ProtocolGeneration::V2 => "/bor/spans/latest",
        };
        let body = self.get("latest span", path).await?;

        Ok(codec.decode_span(&body)?)
    }

    async fn fetch_no_ack_milestone(&self, milestone_id: &str) -> Result<(), OracleError> {
        let codec = self.codec();
        if codec.generation() == ProtocolGeneration::V2 {
            return Err(OracleError::NotAvailable("no-ack milestone"));
        }

        let body = self
            .get("no-ack milestone", &format!("/milestone/noAck/{milestone_id}"))
            .await?;

        if codec.decode_no_ack(&body)? {
            Ok(())
        } else {
            Err(OracleError::NotInRejectedList(milestone_id.to_owned()))
        }
    }

    async fn fetch_last_no_ack_milestone(&self) -> Result<String, OracleError> {
        let codec = self.codec();
        if codec.generation() == ProtocolGeneration::V2 {
            return Err(OracleError::NotAvailable("last no-ack milestone"));
        }

        let body = self
            .get("last no-ack milestone", "/milestone/lastNoAck")
            .await?;

        Ok(codec.decode_last_no_ack(&body)?)
    }

    async fn close(self) {
        debug!(url:% = self.url; "closing REST oracle client");
    }
}

#[derive(Debug, Error)]
#[error("cannot build HTTP client")]
pub struct Error(#[from] reqwest::Error);
