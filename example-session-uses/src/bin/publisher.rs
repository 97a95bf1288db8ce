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
use std::time::Duration;
use tracing::{info, warn};

/// Publishes "Hello from Rust #n" on a standalone local session.
///
/// This session has no transport, so a configuration listing `connect.endpoints` is rejected.
/// `getting_started` and `bench_rtt` show two sessions connected over the loopback hub.
#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Args {
    /// JSON5 session configuration file
    #[arg(long)]
    config: Option<String>,
    /// Session name, overriding the configuration file
    #[arg(long)]
    name: Option<String>,
    /// Key expression to publish on
    #[arg(long, default_value = DEFAULT_KEY)]
    key: String,
    /// Also subscribe to the key on the same session and print what arrives
    #[arg(long)]
    local_subscriber: bool,
    /// Delay between two publications
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Stop after this many publications (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    count: u64,
}

async fn open_local(args: &Args) -> Result<Session, Error> {
    let config = load_session_config(args.config.as_deref(), args.name.as_deref(), &[])?;
    Session::open(config).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = Args::parse();
    let session = open_local(&args).await?;

    info!("Started publisher");

    if args.local_subscriber {
        session
            .declare_subscriber(args.key.as_str(), PublishReceiver::new("Rust sub"))
            .await?;
    }
    let publisher = session.declare_publisher(args.key.as_str()).await?;

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }

        let message = format!("Hello from Rust #{sent}");
        println!(
            "[Rust pub] Putting Data ('{}': '{message}')...",
            publisher.key_expr()
        );
        if let Err(err) = publisher.put(message).await {
            warn!("publication failed: {err}");
            break;
        }

        sent += 1;
        if args.count != 0 && sent >= args.count {
            break;
        }
    }

    let stats = session.stats();
    info!("published={} delivered={}", stats.published, stats.delivered);
    session.close().await
}
