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

#[tokio::main]
async fn main() {
    use log::error;
    use std::panic;
    use whitelist_common::telemetry;

    telemetry::init_logging();
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    if let Err(error) = run().await {
        let backtrace = error.backtrace();
        let error = format!("{error:#}");
        error!(error, backtrace:%; "process exited with ERROR");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    use anyhow::Context;
    use log::info;
    use tokio::signal::unix::{SignalKind, signal};
    use whitelist::{
        application,
        config::Config,
        domain::{ChainVerifier, Whitelist},
        infra::{self, node::NodeHeaders, oracle::OracleClient},
    };
    use whitelist_common::{config::ConfigExt, domain::ActiveGeneration, telemetry};

    let sigterm = signal(SignalKind::terminate()).context("register SIGTERM handler")?;
    let config = Config::load().context("load configuration")?;
    info!(config:?; "starting");
    let Config {
        application_config,
        infra_config,
        telemetry_config: telemetry::Config { metrics_config },
    } = config;

    telemetry::init_metrics(metrics_config);

    let infra::Config {
        oracle_config,
        node_config,
    } = infra_config;

    let generation = ActiveGeneration::new(oracle_config.generation);
    let whitelist = Whitelist::new(generation.clone());

    let oracle =
        OracleClient::new(oracle_config, generation).context("create oracle client")?;

    let node_headers = NodeHeaders::new(&node_config).context("create node header follower")?;
    tokio::spawn(node_headers.clone().follow(node_config.poll_interval));
    let verifier = ChainVerifier::new(node_headers);

    application::run(application_config, oracle, verifier, whitelist, sigterm)
        .await
        .context("run whitelist application")
}
