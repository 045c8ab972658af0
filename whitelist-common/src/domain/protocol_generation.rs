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

use serde::Deserialize;
use std::{
    fmt::{self, Display},
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;

/// The generation of the oracle wire protocol. Selected explicitly by configuration, never
/// auto-detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolGeneration {
    /// REST-era JSON: native JSON numbers, hex hashes.
    #[default]
    V1,

    /// Protobuf-derived JSON: 64-bit numbers as decimal strings, base64 hashes.
    V2,
}

impl Display for ProtocolGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolGeneration::V1 => write!(f, "v1"),
            ProtocolGeneration::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for ProtocolGeneration {
    type Err = UnknownProtocolGeneration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" | "V1" => Ok(Self::V1),
            "v2" | "V2" => Ok(Self::V2),
            other => Err(UnknownProtocolGeneration(other.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown protocol generation {0}")]
pub struct UnknownProtocolGeneration(String);

/// Process-wide flag telling which [ProtocolGeneration] is active. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct ActiveGeneration(Arc<AtomicBool>);

impl ActiveGeneration {
    pub fn new(generation: ProtocolGeneration) -> Self {
        let active = Self::default();
        active.set(generation);
        active
    }

    pub fn get(&self) -> ProtocolGeneration {
        if self.0.load(Ordering::Acquire) {
            ProtocolGeneration::V2
        } else {
            ProtocolGeneration::V1
        }
    }

    pub fn set(&self, generation: ProtocolGeneration) {
        self.0
            .store(generation == ProtocolGeneration::V2, Ordering::Release);
    }
}
