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

#[allow(dead_code)]
pub(crate) mod bench_protocol;
#[allow(dead_code)]
pub(crate) mod cli;
#[allow(dead_code)]
pub(crate) mod stats;

use async_trait::async_trait;
use bench_protocol::{make_ack_payload, parse_ack_payload, parse_req_payload};
use loopback_transport::LoopbackHub;
use pubsub_session::listener::{ListenerError, SampleListener};
use pubsub_session::{KeyExpr, Sample, Session, SessionConfig};
use stats::RttTracker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Key used by the getting-started demos.
#[allow(dead_code)]
pub(crate) const DEFAULT_KEY: &str = "demo/zenoh/getting-started";

/// Opens `config` on `hub`, bound to the node named after the session.
#[allow(dead_code)]
pub(crate) async fn open_on_hub(
    config: SessionConfig,
    hub: &Arc<LoopbackHub>,
) -> pubsub_session::Result<Session> {
    let transport = hub.transport(config.name.clone());
    Session::open_with_transport(config, transport).await
}

/// Nanoseconds elapsed since `origin`, the clock both benchmark sides share.
#[allow(dead_code)]
pub(crate) fn monotonic_ns(origin: Instant) -> u64 {
    u64::try_from(origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

#[allow(dead_code)]
pub(crate) struct PublishReceiver {
    tag: &'static str,
}

impl PublishReceiver {
    #[allow(dead_code)]
    pub(crate) fn new(tag: &'static str) -> Self {
        Self { tag }
    }
}

#[async_trait]
impl SampleListener for PublishReceiver {
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
        let payload = String::from_utf8_lossy(sample.payload());
        println!(
            "[{}] Received ('{}': '{}')",
            self.tag,
            sample.key_expr(),
            payload
        );
        debug!("PublishReceiver: sample timestamp {}", sample.timestamp());
        Ok(())
    }
}

/// Answers every benchmark request with an ack published on `ack_key`.
#[allow(dead_code)]
pub(crate) struct EchoAckResponder {
    session: Session,
    ack_key: KeyExpr,
    origin: Instant,
    quiet: bool,
    received: AtomicU64,
}

impl EchoAckResponder {
    #[allow(dead_code)]
    pub(crate) fn new(session: Session, ack_key: KeyExpr, origin: Instant, quiet: bool) -> Self {
        Self {
            session,
            ack_key,
            origin,
            quiet,
            received: AtomicU64::new(0),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SampleListener for EchoAckResponder {
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
        let server_recv_mono_ns = monotonic_ns(self.origin);
        let Some(request) = parse_req_payload(sample.payload()) else {
            return Err(format!("request of {} bytes is too short", sample.payload().len()).into());
        };

        let ack = make_ack_payload(request.seq, server_recv_mono_ns, monotonic_ns(self.origin));
        self.session.put(self.ack_key.clone(), ack).await?;

        let total = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.quiet && total % 1000 == 0 {
            info!("recv seq={} total={total}", request.seq);
        }
        Ok(())
    }
}

/// Feeds benchmark acks into a shared [`RttTracker`].
#[allow(dead_code)]
pub(crate) struct AckCollector {
    tracker: Arc<Mutex<RttTracker>>,
}

impl AckCollector {
    #[allow(dead_code)]
    pub(crate) fn new(tracker: Arc<Mutex<RttTracker>>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl SampleListener for AckCollector {
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
        let received_at = Instant::now();
        let Some(ack) = parse_ack_payload(sample.payload()) else {
            return Err(format!("ack of {} bytes is too short", sample.payload().len()).into());
        };
        let mut tracker = self
            .tracker
            .lock()
            .map_err(|_| "rtt tracker lock poisoned")?;
        tracker.on_ack(ack.seq, received_at);
        Ok(())
    }
}
