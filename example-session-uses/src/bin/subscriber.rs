/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod common;

use clap::Parser;
use common::cli::load_session_config;
use common::{PublishReceiver, DEFAULT_KEY};
use pubsub_session::{Error, Session};
use tracing::info;

/// Prints every sample published on a standalone local session.
///
/// Only publications made on this same session reach it; `getting_started` and `bench_rtt`
/// show two sessions connected over the loopback hub.
#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Args {
    /// JSON5 session configuration file
    #[arg(long)]
    config: Option<String>,
    /// Session name, overriding the configuration file
    #[arg(long)]
    name: Option<String>,
    /// Key expression to subscribe to; wildcards are allowed
    #[arg(long, default_value = DEFAULT_KEY)]
    key: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = Args::parse();
    let config = load_session_config(args.config.as_deref(), args.name.as_deref(), &[])?;

    info!("Started subscriber");

    let session = Session::open(config).await?;
    let subscriber = session
        .declare_subscriber(args.key.as_str(), PublishReceiver::new("Rust sub"))
        .await?;
    info!("Declared subscriber {} on '{}'", subscriber.id(), subscriber.key_expr());

    if let Err(err) = tokio::signal::ctrl_c().await {
        info!("unable to listen for Ctrl-C: {err}");
    }

    let stats = session.stats();
    info!(
        "delivered={} callback_failures={}",
        stats.delivered, stats.callback_failures
    );
    session.close().await
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::CommandFactory;

    #[test]
    fn help_points_to_connected_demos() {
        let help = Args::command().render_long_help().to_string();

        assert!(!help.contains("--connect"));
        assert!(help.contains("bench_rtt"));
        assert!(help.contains("demo/zenoh/getting-started"));
    }
}
