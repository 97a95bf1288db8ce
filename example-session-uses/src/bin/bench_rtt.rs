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

//! Round-trip benchmark between an echo-ack session and a publishing client session.
//!
//! The client publishes sequenced requests on the request key at a fixed rate; the echo side
//! answers each one on the ack key. Both sessions share one loopback hub and one monotonic
//! clock origin.

mod common;

use clap::Parser;
use common::bench_protocol::{
    make_req_payload, DEFAULT_ACK_KEY, DEFAULT_PAYLOAD_BYTES, DEFAULT_REQ_KEY,
    REQ_HEADER_LEN,
};
use common::cli::{load_session_config, parse_payload_bytes, parse_positive_f64};
use common::stats::RttTracker;
use common::{monotonic_ns, open_on_hub, AckCollector, EchoAckResponder};
use loopback_transport::LoopbackHub;
use pubsub_session::{Error, KeyExpr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

const CLIENT_NODE: &str = "bench-client";
const SERVER_NODE: &str = "bench-server";

fn parse_payload_flag(raw: &str) -> Result<usize, String> {
    parse_payload_bytes("--payload-bytes", raw, REQ_HEADER_LEN)
}

fn parse_rate_flag(raw: &str) -> Result<f64, String> {
    parse_positive_f64("--rate-hz", raw)
}

fn parse_duration_flag(raw: &str) -> Result<f64, String> {
    parse_positive_f64("--duration-sec", raw)
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Key the client publishes requests on
    #[arg(long, default_value = DEFAULT_REQ_KEY)]
    req_key: String,
    /// Key the echo side publishes acks on
    #[arg(long, default_value = DEFAULT_ACK_KEY)]
    ack_key: String,
    /// Request size in bytes, header included
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_BYTES, value_parser = parse_payload_flag)]
    payload_bytes: usize,
    /// Requests per second
    #[arg(long, default_value_t = 1000.0, value_parser = parse_rate_flag)]
    rate_hz: f64,
    /// Number of requests; 0 runs for --duration-sec instead
    #[arg(long, default_value_t = 0)]
    count: u64,
    /// Run time when --count is 0
    #[arg(long, default_value_t = 10.0, value_parser = parse_duration_flag)]
    duration_sec: f64,
    /// Requests without an ack after this long count as timed out
    #[arg(long, default_value_t = 100)]
    ack_timeout_ms: u64,
    /// Delivery queue size of both sessions
    #[arg(long)]
    queue_size: Option<usize>,
    /// Suppress periodic progress lines
    #[arg(long)]
    quiet: bool,
}

impl Args {
    fn is_done(&self, sent: u64, started: Instant) -> bool {
        if self.count != 0 {
            sent >= self.count
        } else {
            started.elapsed() >= Duration::from_secs_f64(self.duration_sec)
        }
    }
}

async fn open_node(
    hub: &Arc<LoopbackHub>,
    name: &str,
    remote: &str,
    queue_size: Option<usize>,
) -> Result<pubsub_session::Session, Error> {
    let mut config = load_session_config(None, Some(name), &[remote.to_string()])?;
    if let Some(queue_size) = queue_size {
        config.insert_json5("message_queue_size", &queue_size.to_string())?;
    }
    open_on_hub(config, hub).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = Args::parse();
    let req_key = KeyExpr::literal(&args.req_key)?;
    let ack_key = KeyExpr::literal(&args.ack_key)?;
    let origin = Instant::now();
    let hub = LoopbackHub::new();

    let server = open_node(&hub, SERVER_NODE, CLIENT_NODE, args.queue_size).await?;
    let responder = Arc::new(EchoAckResponder::new(
        server.clone(),
        ack_key.clone(),
        origin,
        args.quiet,
    ));
    server
        .declare_subscriber(req_key.clone(), responder.clone())
        .await?;

    let client = open_node(&hub, CLIENT_NODE, SERVER_NODE, args.queue_size).await?;
    let tracker = Arc::new(Mutex::new(RttTracker::new(Duration::from_millis(
        args.ack_timeout_ms,
    ))));
    client
        .declare_subscriber(ack_key, AckCollector::new(tracker.clone()))
        .await?;
    let publisher = client.declare_publisher(req_key).await?;

    info!(
        "bench_rtt: payload_bytes={} rate_hz={} count={} duration_sec={} ack_timeout_ms={}",
        args.payload_bytes, args.rate_hz, args.count, args.duration_sec, args.ack_timeout_ms
    );

    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / args.rate_hz));
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let started = Instant::now();
    let mut sent = 0u64;

    while !args.is_done(sent, started) {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping early");
                break;
            }
        }

        let sent_at = Instant::now();
        let payload = make_req_payload(sent, monotonic_ns(origin), args.payload_bytes);
        record(&tracker, |tracker| tracker.on_send(sent, sent_at))?;
        if let Err(err) = publisher.put(payload).await {
            warn!("request {sent} failed: {err}");
            break;
        }
        sent += 1;

        let expired = record(&tracker, |tracker| tracker.expire(Instant::now()))?;
        if !args.quiet && expired > 0 {
            info!("{expired} request(s) timed out");
        }
        if !args.quiet && sent % 1000 == 0 {
            let acked = record(&tracker, |tracker| tracker.acked())?;
            info!("sent={sent} acked={acked}");
        }
    }

    // Drain outstanding acks until they arrive or time out.
    let drain_deadline = Instant::now() + Duration::from_millis(args.ack_timeout_ms);
    loop {
        let pending = record(&tracker, |tracker| {
            tracker.expire(Instant::now());
            tracker.pending()
        })?;
        if pending == 0 || Instant::now() > drain_deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let elapsed = started.elapsed();

    client.close().await?;
    server.close().await?;

    let summary = record(&tracker, |tracker| {
        tracker.summary(sent, elapsed, args.payload_bytes)
    })?;
    println!("{summary}");
    if !args.quiet {
        println!("echo side: received={}", responder.received());
    }
    Ok(())
}

fn record<T>(
    tracker: &Mutex<RttTracker>,
    f: impl FnOnce(&mut RttTracker) -> T,
) -> Result<T, Error> {
    let mut guard = tracker
        .lock()
        .map_err(|_| Error::Runtime("rtt tracker lock poisoned".to_string()))?;
    Ok(f(&mut guard))
}
