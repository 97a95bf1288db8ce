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

//! Publisher and subscriber on two sessions joined by an in-process loopback hub.

mod common;

use clap::Parser;
use common::cli::load_session_config;
use common::{open_on_hub, PublishReceiver, DEFAULT_KEY};
use loopback_transport::LoopbackHub;
use pubsub_session::Error;
use std::time::Duration;
use tracing::info;

const PUBLISHER_NODE: &str = "node-pub";
const SUBSCRIBER_NODE: &str = "node-sub";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Key expression both sides use
    #[arg(long, default_value = DEFAULT_KEY)]
    key: String,
    /// Delay between two publications
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Number of publications before exiting (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 5)]
    count: u64,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = Args::parse();
    let hub = LoopbackHub::new();

    let sub_config = load_session_config(None, Some(SUBSCRIBER_NODE), &[])?;
    let sub_session = open_on_hub(sub_config, &hub).await?;
    sub_session
        .declare_subscriber(args.key.as_str(), PublishReceiver::new("Rust sub"))
        .await?;

    let pub_config =
        load_session_config(None, Some(PUBLISHER_NODE), &[SUBSCRIBER_NODE.to_string()])?;
    let pub_session = open_on_hub(pub_config, &hub).await?;
    let publisher = pub_session.declare_publisher(args.key.as_str()).await?;

    info!("Started getting_started: {PUBLISHER_NODE} -> {SUBSCRIBER_NODE}");

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let message = format!("Hello from Rust #{sent}");
        println!(
            "[Rust pub] Putting Data ('{}': '{message}')...",
            publisher.key_expr()
        );
        publisher.put(message).await?;

        sent += 1;
        if args.count != 0 && sent >= args.count {
            break;
        }
    }

    pub_session.close().await?;
    sub_session.close().await?;

    let stats = sub_session.stats();
    info!(
        "subscriber side: remote_received={} delivered={}",
        stats.remote_received, stats.delivered
    );
    Ok(())
}
