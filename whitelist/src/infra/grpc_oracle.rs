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

mod proto;

use crate::{
    domain::{Checkpoint, CheckpointNumber, DecodeError, Milestone, Oracle, OracleError, Span},
    infra::oracle::with_timeout,
};
use log::debug;
use std::time::Duration;
use thiserror::Error;
use tonic::{
    Code, Request, Status,
    client::Grpc,
    codec::ProstCodec,
    codegen::http::uri::{InvalidUri, PathAndQuery},
    transport::Channel,
};

/// An [Oracle] implementation using the oracle's protobuf RPC stream service. The channel
/// connects lazily and reconnects on its own; clones share it.
#[derive(Debug, Clone)]
pub struct GrpcOracle {
    grpc: Grpc<Channel>,
    request_timeout: Duration,
}

impl GrpcOracle {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, Error> {
        let channel = Channel::from_shared(url.into())?
            .timeout(request_timeout)
            .connect_lazy();

        Ok(Self {
            grpc: Grpc::new(channel),
            request_timeout,
        })
    }

    async fn unary<M1, M2>(
        &self,
        request: &'static str,
        path: &'static str,
        message: M1,
    ) -> Result<M2, OracleError>
    where
        M1: prost::Message + Send + Sync + 'static,
        M2: prost::Message + Default + Send + Sync + 'static,
    {
        debug!(path; "requesting {request}");

        let mut grpc = self.grpc.clone();
        let call = async move {
            grpc.ready()
                .await
                .map_err(|error| OracleError::Transport(request, error.into()))?;

            let response = grpc
                .unary(
                    Request::new(message),
                    PathAndQuery::from_static(path),
                    ProstCodec::default(),
                )
                .await
                .map_err(|status| self.map_status(request, status))?;

            Ok(response.into_inner())
        };

        with_timeout(request, self.request_timeout, call).await
    }

    async fn span<M>(
        &self,
        request: &'static str,
        path: &'static str,
        message: M,
    ) -> Result<Span, OracleError>
    where
        M: prost::Message + Send + Sync + 'static,
    {
        let response = self
            .unary::<_, proto::SpanResponse>(request, path, message)
            .await?;
        let span = response.result.ok_or(DecodeError::missing("span"))?;

        let span = crate::domain::resolve(span.try_into()?)
            .map_err(|error| DecodeError::new("span", error))?;

        Ok(span)
    }

    fn map_status(&self, request: &'static str, status: Status) -> OracleError {
        match status.code() {
            Code::NotFound => OracleError::NotFound(request.to_owned()),
            Code::DeadlineExceeded => OracleError::Timeout(request, self.request_timeout),
            _ => OracleError::Status(request, status.to_string()),
        }
    }
}

impl Oracle for GrpcOracle {
    async fn fetch_checkpoint(&self, number: CheckpointNumber) -> Result<Checkpoint, OracleError> {
        let id = match number {
            CheckpointNumber::Latest => -1,
            CheckpointNumber::At(n) => i64::try_from(n)
                .map_err(|_| OracleError::NotFound(format!("checkpoint {n}")))?,
        };

        let response = self
            .unary::<_, proto::FetchCheckpointResponse>(
                "checkpoint",
                proto::FETCH_CHECKPOINT,
                proto::FetchCheckpointRequest { id },
            )
            .await?;
        let checkpoint = response
            .result
            .ok_or(DecodeError::missing("checkpoint"))?;

        Ok(checkpoint.try_into()?)
    }

    async fn fetch_checkpoint_count(&self) -> Result<i64, OracleError> {
        let response = self
            .unary::<_, proto::FetchCheckpointCountResponse>(
                "checkpoint count",
                proto::FETCH_CHECKPOINT_COUNT,
                (),
            )
            .await?;
        let count = response
            .result
            .ok_or(DecodeError::missing("checkpoint count"))?;

        Ok(count.result)
    }

    async fn fetch_milestone(&self) -> Result<Milestone, OracleError> {
        let response = self
            .unary::<_, proto::FetchMilestoneResponse>("milestone", proto::FETCH_MILESTONE, ())
            .await
            .map_err(|error| match error {
                OracleError::NotFound(_) => OracleError::NotAvailable("milestone"),
                other => other,
            })?;
        let milestone = response
            .result
            .ok_or(DecodeError::missing("milestone"))?;

        Ok(milestone.try_into()?)
    }

    async fn fetch_milestone_count(&self) -> Result<i64, OracleError> {
        let response = self
            .unary::<_, proto::FetchMilestoneCountResponse>(
                "milestone count",
                proto::FETCH_MILESTONE_COUNT,
                (),
            )
            .await?;
        let count = response
            .result
            .ok_or(DecodeError::missing("milestone count"))?;

        Ok(count.count)
    }

    async fn fetch_span(&self, span_id: u64) -> Result<Span, OracleError> {
        self.span("span", proto::SPAN, proto::SpanRequest { id: span_id })
            .await
    }

    async fn fetch_latest_span(&self) -> Result<Span, OracleError> {
        self.span("latest span", proto::LATEST_SPAN, proto::LatestSpanRequest {})
            .await
    }

    async fn fetch_no_ack_milestone(&self, milestone_id: &str) -> Result<(), OracleError> {
        let response = self
            .unary::<_, proto::FetchNoAckMilestoneResponse>(
                "no-ack milestone",
                proto::FETCH_NO_ACK_MILESTONE,
                proto::FetchNoAckMilestoneRequest {
                    milestone_id: milestone_id.to_owned(),
                },
            )
            .await?;
        let no_ack = response
            .result
            .ok_or(DecodeError::missing("no-ack"))?;

        if no_ack.result {
            Ok(())
        } else {
            Err(OracleError::NotInRejectedList(milestone_id.to_owned()))
        }
    }

    async fn fetch_last_no_ack_milestone(&self) -> Result<String, OracleError> {
        let response = self
            .unary::<_, proto::FetchLastNoAckMilestoneResponse>(
                "last no-ack milestone",
                proto::FETCH_LAST_NO_ACK_MILESTONE,
                (),
            )
            .await?;
        let last_no_ack = response
            .result
            .ok_or(DecodeError::missing("last no-ack"))?;

        Ok(last_no_ack.result)
    }

    async fn close(self) {
        debug!("closing gRPC oracle client");
    }
}

#[derive(Debug, Error)]
#[error("invalid oracle URL")]
pub struct Error(#[from] InvalidUri);

#[cfg(test)]
mod tests {
    use crate::{domain::OracleError, infra::grpc_oracle::GrpcOracle};
    use std::time::Duration;
    use tonic::Status;

    #[tokio::test]
    async fn test_map_status() {
        let oracle = GrpcOracle::new("http://localhost:3132", Duration::from_secs(5))
            .expect("oracle can be created");

        let error = oracle.map_status("milestone", Status::not_found("no milestone"));
        assert!(matches!(error, OracleError::NotFound(_)));
        assert!(error.is_not_ready());

        let error = oracle.map_status("span", Status::deadline_exceeded("slow"));
        assert!(matches!(error, OracleError::Timeout("span", _)));

        let error = oracle.map_status("span", Status::internal("boom"));
        assert!(matches!(error, OracleError::Status("span", _)));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_invalid_url() {
        assert!(GrpcOracle::new("not a url", Duration::from_secs(5)).is_err());
    }
}
