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

use crate::domain::ChainReader;
use log::{debug, warn};
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::{collections::BTreeMap, num::ParseIntError, sync::Arc, time::Duration};
use thiserror::Error;
use whitelist_common::{
    domain::{BlockRef, Hash, ParseByteArrayError},
    error::StdErrorExt,
};

/// Number of blocks below the known head which are fetched again on each poll to pick up
/// shallow reorgs.
const REORG_DEPTH: u64 = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,

    #[serde(with = "humantime_serde", default = "poll_interval_default")]
    pub poll_interval: Duration,

    #[serde(default = "retain_default")]
    pub retain: u64,
}

/// Follows the canonical headers of a local EVM node via JSON-RPC, keeping the hashes of a
/// bounded window of the most recent blocks. Cloning shares the window.
#[derive(Debug, Clone)]
pub struct NodeHeaders {
    client: Client,
    url: String,
    headers: Arc<RwLock<Headers>>,
}

impl NodeHeaders {
    pub fn new(config: &Config) -> Result<Self, NodeError> {
        let client = Client::builder().timeout(config.poll_interval).build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            headers: Arc::new(RwLock::new(Headers::new(config.retain))),
        })
    }

    /// Poll the node forever, updating the header window; errors are logged and the poll
    /// retried after the given interval.
    pub async fn follow(self, poll_interval: Duration) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if let Err(error) = self.poll().await {
                warn!(error:% = error.as_chain(); "cannot poll node headers");
            }
        }
    }

    async fn poll(&self) -> Result<(), NodeError> {
        let head = self
            .call::<String>("eth_blockNumber", json!([]))
            .await?
            .ok_or(NodeError::Rpc("eth_blockNumber", "empty result".to_owned()))?;
        let head = parse_quantity(&head)?;
        let from = self.headers.read().next_to_fetch(head);

        // Blocks fetched before a failure are kept.
        let mut blocks = Vec::with_capacity(head.saturating_add(1).saturating_sub(from) as usize);
        let result = self.fetch_blocks(from, head, &mut blocks).await;

        debug!(head, from, fetched = blocks.len(); "node headers polled");
        self.headers.write().update(head, blocks);

        result
    }

    async fn fetch_blocks(
        &self,
        from: u64,
        head: u64,
        blocks: &mut Vec<BlockRef>,
    ) -> Result<(), NodeError> {
        for number in from..=head {
            let block = self
                .call::<Block>("eth_getBlockByNumber", json!([quantity(number), false]))
                .await?;

            // The node may not serve the block yet, e.g. right after the head moved.
            let Some(block) = block else {
                break;
            };
            blocks.push(block.try_into()?);
        }

        Ok(())
    }

    async fn call<T>(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<Option<T>, NodeError>
    where
        T: DeserializeOwned,
    {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<RpcResponse<T>>()
            .await?;

        match response.error {
            Some(error) => Err(NodeError::Rpc(method, error.message)),
            None => Ok(response.result),
        }
    }
}

impl ChainReader for NodeHeaders {
    fn is_known_range(&self, start: u64, end: u64) -> bool {
        self.headers.read().is_known_range(start, end)
    }

    fn hash_at(&self, number: u64) -> Option<Hash> {
        self.headers.read().hashes.get(&number).copied()
    }
}

#[derive(Debug)]
struct Headers {
    head: Option<u64>,
    hashes: BTreeMap<u64, Hash>,
    retain: u64,
}

impl Headers {
    fn new(retain: u64) -> Self {
        Self {
            head: None,
            hashes: BTreeMap::new(),
            retain: retain.max(1),
        }
    }

    fn lowest_retained(&self, head: u64) -> u64 {
        head.saturating_sub(self.retain - 1)
    }

    fn next_to_fetch(&self, head: u64) -> u64 {
        let from = match self.hashes.last_key_value() {
            Some((&known, _)) => known.saturating_add(1).saturating_sub(REORG_DEPTH),
            None => 0,
        };

        from.max(self.lowest_retained(head))
    }

    /// Apply freshly fetched contiguous blocks at or below the given head. A block whose hash
    /// differs from the stored one invalidates all stored blocks above it.
    fn update(&mut self, head: u64, blocks: Vec<BlockRef>) {
        // The canonical chain got shorter.
        self.hashes.retain(|n, _| *n <= head);

        for BlockRef { number, hash } in blocks {
            if self.hashes.get(&number).is_some_and(|known| *known != hash) {
                self.hashes.retain(|n, _| *n < number);
            }
            self.hashes.insert(number, hash);
        }

        let lowest = self.lowest_retained(head);
        self.hashes = self.hashes.split_off(&lowest);
        self.head = Some(head);
    }

    fn is_known_range(&self, start: u64, end: u64) -> bool {
        if start > end || self.head.is_none_or(|head| end > head) {
            return false;
        }

        self.hashes.range(start..=end).count() as u64 == (end - start).saturating_add(1)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Block {
    number: String,
    hash: String,
}

impl TryFrom<Block> for BlockRef {
    type Error = NodeError;

    fn try_from(block: Block) -> Result<Self, Self::Error> {
        Ok(Self {
            number: parse_quantity(&block.number)?,
            hash: block.hash.parse()?,
        })
    }
}

fn parse_quantity(s: &str) -> Result<u64, NodeError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|error| NodeError::Quantity(s.to_owned(), error))
}

fn quantity(n: u64) -> String {
    format!("{n:#x}")
}

fn poll_interval_default() -> Duration {
    Duration::from_secs(2)
}

fn retain_default() -> u64 {
    4_096
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("cannot send JSON-RPC request")]
    Transport(#[from] reqwest::Error),

    #[error("JSON-RPC call {0} failed: {1}")]
    Rpc(&'static str, String),

    #[error("invalid quantity {0}")]
    Quantity(String, #[source] ParseIntError),

    #[error("invalid block hash")]
    Hash(#[from] ParseByteArrayError),
}
