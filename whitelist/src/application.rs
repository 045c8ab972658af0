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

mod metrics;

use crate::{
    application::metrics::Metrics,
    domain::{
        Anchor, AnchorKind, AnchorState, Candidate, Checkpoint, CheckpointNumber, Milestone,
        Oracle, OracleError, VerificationError, Verifier, Whitelist,
    },
};
use anyhow::{Context, anyhow};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    select,
    signal::unix::Signal,
    task,
    time::{MissedTickBehavior, interval},
};
use whitelist_common::{domain::Hash, error::StdErrorExt};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(with = "humantime_serde", default = "checkpoint_interval_default")]
    pub checkpoint_interval: Duration,

    #[serde(with = "humantime_serde", default = "milestone_interval_default")]
    pub milestone_interval: Duration,

    #[serde(with = "humantime_serde", default = "no_ack_interval_default")]
    pub no_ack_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint_interval: checkpoint_interval_default(),
            milestone_interval: milestone_interval_default(),
            no_ack_interval: no_ack_interval_default(),
        }
    }
}

/// Run the whitelist service: checkpoints and milestones are polled, verified and committed by
/// independent tasks until SIGTERM is received, after which the oracle client is closed.
pub async fn run(
    config: Config,
    oracle: impl Oracle,
    verifier: impl Verifier,
    whitelist: Whitelist,
    mut sigterm: Signal,
) -> anyhow::Result<()> {
    let Config {
        checkpoint_interval,
        milestone_interval,
        no_ack_interval,
    } = config;

    info!(
        generation:% = whitelist.active_generation(),
        checkpoint_interval:?,
        milestone_interval:?;
        "starting whitelist service"
    );

    let verifier = Arc::new(verifier);

    let checkpoint_task = task::spawn(poll_anchors(
        AnchorKind::Checkpoint,
        checkpoint_interval,
        oracle.clone(),
        verifier.clone(),
        whitelist.clone(),
    ));

    let milestone_task = task::spawn(poll_anchors(
        AnchorKind::Milestone,
        milestone_interval,
        oracle.clone(),
        verifier,
        whitelist,
    ));

    let no_ack_task = task::spawn(follow_no_ack(no_ack_interval, oracle.clone()));

    let abort_handles = [
        checkpoint_task.abort_handle(),
        milestone_task.abort_handle(),
        no_ack_task.abort_handle(),
    ];

    // Handle task completion or SIGTERM termination. Completion of the tasks is unexpected, they
    // loop forever.
    let result = select! {
        result = checkpoint_task => result
            .context("checkpoint_task panicked")
            .and_then(|()| Err(anyhow!("checkpoint_task completed"))),

        result = milestone_task => result
            .context("milestone_task panicked")
            .and_then(|()| Err(anyhow!("milestone_task completed"))),

        result = no_ack_task => result
            .context("no_ack_task panicked")
            .and_then(|()| Err(anyhow!("no_ack_task completed"))),

        _ = sigterm.recv() => {
            warn!("SIGTERM received");
            Ok(())
        }
    };

    // In-flight cycles are dropped; nothing is committed for them.
    for handle in abort_handles {
        handle.abort();
    }
    oracle.close().await;

    result
}

/// Fetch the latest checkpoint; fails with [WhitelistError::NoCheckpoint] if the oracle does not
/// have any checkpoints yet.
pub async fn fetch_whitelist_checkpoint(
    oracle: &impl Oracle,
) -> Result<Checkpoint, WhitelistError> {
    let count = oracle.fetch_checkpoint_count().await?;
    if count <= 0 {
        return Err(WhitelistError::NoCheckpoint);
    }

    let checkpoint = oracle.fetch_checkpoint(CheckpointNumber::Latest).await?;
    Ok(checkpoint)
}

/// Fetch the latest milestone; fails with [WhitelistError::NoMilestone] if the oracle does not
/// have any milestones yet.
pub async fn fetch_whitelist_milestone(
    oracle: &impl Oracle,
) -> Result<Milestone, WhitelistError> {
    match oracle.fetch_milestone().await {
        Ok(milestone) => Ok(milestone),
        Err(OracleError::NotAvailable(_) | OracleError::NotFound(_)) => {
            Err(WhitelistError::NoMilestone)
        }
        Err(other) => Err(other.into()),
    }
}

/// Verify the given candidate against the local chain and, on success, commit its end block and
/// hash as the new anchor of the given kind, returning the committed hash. Nothing is committed
/// on failure.
pub fn handle_whitelist_checkpoint(
    candidate: &Candidate,
    kind: AnchorKind,
    verifier: &impl Verifier,
    whitelist: &Whitelist,
) -> Result<Hash, WhitelistError> {
    let local = verifier.verify(candidate, kind)?;

    if local != candidate.hash {
        return Err(VerificationError::HashMismatch {
            kind,
            end_block: candidate.end_block,
            expected: candidate.hash,
            local,
        }
        .into());
    }

    whitelist.commit(kind, Anchor::from(candidate));
    Ok(candidate.hash)
}

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("no checkpoint available yet")]
    NoCheckpoint,

    #[error("no milestone available yet")]
    NoMilestone,

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl WhitelistError {
    /// Whether the next poll may succeed; only decode errors are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WhitelistError::Oracle(error) => error.is_retryable(),
            _ => true,
        }
    }

    /// Whether the oracle simply has no data yet, e.g. during cold start.
    pub fn is_not_ready(&self) -> bool {
        match self {
            WhitelistError::NoCheckpoint | WhitelistError::NoMilestone => true,
            WhitelistError::Oracle(error) => error.is_not_ready(),
            WhitelistError::Verification(_) => false,
        }
    }
}

/// Poll the anchors of the given kind forever. Cycles are strictly sequential: a new fetch is
/// only issued after the previous cycle has completed.
async fn poll_anchors<O, V>(
    kind: AnchorKind,
    poll_interval: Duration,
    oracle: O,
    verifier: Arc<V>,
    whitelist: Whitelist,
) where
    O: Oracle,
    V: Verifier,
{
    let metrics = Metrics::new(kind);
    let mut state = AnchorState::default();

    let mut interval = interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        state = whitelist_cycle(kind, state, &oracle, &*verifier, &whitelist, &metrics).await;
    }
}

/// A single fetch, verify and commit cycle, returning the next state. If nothing can be fetched,
/// the state is kept.
async fn whitelist_cycle(
    kind: AnchorKind,
    state: AnchorState,
    oracle: &impl Oracle,
    verifier: &impl Verifier,
    whitelist: &Whitelist,
    metrics: &Metrics,
) -> AnchorState {
    let fetched = match kind {
        AnchorKind::Checkpoint => fetch_whitelist_checkpoint(oracle)
            .await
            .map(|checkpoint| (Candidate::from(&checkpoint), None)),

        AnchorKind::Milestone => fetch_whitelist_milestone(oracle)
            .await
            .map(|milestone| (Candidate::from(&milestone), Some(milestone.milestone_id))),
    };

    let (candidate, milestone_id) = match fetched {
        Ok(fetched) => fetched,

        Err(error) => {
            log_error(kind, &error);
            if let WhitelistError::Oracle(error) = &error {
                metrics.oracle_error(error.kind());
            }
            return state;
        }
    };

    let pending = AnchorState::Pending(candidate);
    debug!(kind:%, state:? = pending, previous:? = state; "{kind} pending");

    match handle_whitelist_checkpoint(&candidate, kind, verifier, whitelist) {
        Ok(hash) => {
            let anchor = Anchor::from(&candidate);

            if pending_changes_anchor(state, anchor) {
                info!(
                    kind:%,
                    end_block = anchor.end_block,
                    hash:%,
                    generation:% = whitelist.active_generation();
                    "{kind} whitelisted"
                );
            }
            metrics.whitelisted(anchor.end_block);

            AnchorState::Whitelisted(anchor)
        }

        Err(error) => {
            log_error(kind, &error);
            metrics.rejected();

            if let (WhitelistError::Verification(error), Some(milestone_id)) =
                (&error, milestone_id)
            {
                if error.is_conflict() {
                    report_no_ack(oracle.clone(), milestone_id);
                }
            }

            AnchorState::Rejected(candidate)
        }
    }
}

fn pending_changes_anchor(state: AnchorState, anchor: Anchor) -> bool {
    !matches!(state, AnchorState::Whitelisted(previous) if previous == anchor)
}

/// Report a rejected milestone to the oracle, fire-and-forget: the outcome is only logged.
fn report_no_ack(oracle: impl Oracle, milestone_id: String) {
    task::spawn(async move {
        match oracle.fetch_no_ack_milestone(&milestone_id).await {
            Ok(()) => debug!(milestone_id:%; "rejected milestone acknowledged by oracle"),

            Err(error) if error.is_not_ready() => {
                debug!(milestone_id:%, error:% = error.as_chain(); "no-ack not available")
            }

            Err(error) => {
                info!(
                    milestone_id:%,
                    error:% = error.as_chain();
                    "cannot report rejected milestone"
                )
            }
        }
    });
}

/// Follow the ID of the most recently rejected milestone as reported by the oracle.
async fn follow_no_ack(poll_interval: Duration, oracle: impl Oracle) {
    let mut last_no_ack = None::<String>;

    let mut interval = interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match oracle.fetch_last_no_ack_milestone().await {
            Ok(milestone_id) if last_no_ack.as_ref() != Some(&milestone_id) => {
                info!(milestone_id:%; "last rejected milestone changed");
                last_no_ack = Some(milestone_id);
            }

            Ok(_) => {}

            Err(error) if error.is_not_ready() => {
                debug!(error:% = error.as_chain(); "last no-ack milestone not available")
            }

            Err(error) => {
                warn!(error:% = error.as_chain(); "cannot fetch last no-ack milestone")
            }
        }
    }
}

fn log_error(kind: AnchorKind, error: &WhitelistError) {
    let message = error.as_chain();

    match error {
        error if error.is_not_ready() => debug!(kind:%, error:% = message; "{kind} not ready"),

        error if !error.is_retryable() => {
            error!(
                kind:%,
                error:% = message;
                "cannot decode {kind}, client and oracle protocol generations differ"
            )
        }

        WhitelistError::Verification(verification) if verification.is_conflict() => {
            warn!(kind:%, error:% = message; "{kind} conflicts with local chain")
        }

        _ => info!(kind:%, error:% = message; "cannot whitelist {kind}"),
    }
}

fn checkpoint_interval_default() -> Duration {
    Duration::from_secs(100)
}

fn milestone_interval_default() -> Duration {
    Duration::from_secs(12)
}

fn no_ack_interval_default() -> Duration {
    Duration::from_secs(6)
}
