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

use log::{LevelFilter, info, warn};
use logforth::append;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use std::{env, net::IpAddr};

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "metrics")]
    pub metrics_config: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: IpAddr,
    pub port: u16,
}

/// Initialize logging; the level is taken from `RUST_LOG` and defaults to info.
pub fn init_logging() {
    let level = env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    logforth::builder()
        .dispatch(|d| d.filter(level).append(append::Stdout::default()))
        .apply();
}

/// Initialize metrics by installing a Prometheus exporter, if enabled. Must be called within a
/// Tokio runtime.
pub fn init_metrics(config: MetricsConfig) {
    let MetricsConfig {
        enabled,
        address,
        port,
    } = config;

    if enabled {
        match PrometheusBuilder::new()
            .with_http_listener((address, port))
            .install()
        {
            Ok(()) => info!(address:%, port; "Prometheus exporter installed"),
            Err(error) => warn!(error:%; "cannot install Prometheus exporter"),
        }
    }
}
