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

use crate::domain::AnchorKind;
use metrics::{Counter, Gauge, counter, gauge};

/// Whitelist metrics, one set per anchor kind.
#[derive(Debug, Clone)]
pub struct Metrics {
    kind: AnchorKind,
    end_block: Gauge,
    rejections: Counter,
}

impl Metrics {
    pub fn new(kind: AnchorKind) -> Self {
        let end_block = match kind {
            AnchorKind::Checkpoint => gauge!("whitelist_checkpoint_end_block"),
            AnchorKind::Milestone => gauge!("whitelist_milestone_end_block"),
        };
        let rejections = counter!("whitelist_rejections_total", "kind" => kind.to_string());

        Self {
            kind,
            end_block,
            rejections,
        }
    }

    pub fn whitelisted(&self, end_block: u64) {
        self.end_block.set(end_block as f64);
    }

    pub fn rejected(&self) {
        self.rejections.increment(1);
    }

    pub fn oracle_error(&self, error: &'static str) {
        counter!(
            "whitelist_oracle_errors_total",
            "kind" => self.kind.to_string(),
            "error" => error
        )
        .increment(1);
    }
}
