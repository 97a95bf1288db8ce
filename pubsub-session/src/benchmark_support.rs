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

//! Deterministic benchmark fixtures for the Criterion harness.

use crate::control_plane::registry::Registry;
use crate::data_plane::frame_codec::{decode_sample, encode_sample};
use crate::listener::{ListenerError, SampleListener};
use crate::routing::key_expr::KeyExpr;
use crate::sample::Sample;
use crate::session::Session;
use crate::{Result, SessionConfig};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn pattern(index: usize) -> String {
    match index % 4 {
        0 => format!("bench/{index}/*/*"),
        1 => format!("bench/**/leaf{index}"),
        2 => format!("bench/{index}/**"),
        _ => format!("bench/*/node/leaf{index}"),
    }
}

fn literal_key(index: usize) -> String {
    format!("bench/{index}/node/leaf{index}")
}

/// Registry with `rows` subscription patterns mixing `*` and `**`.
pub struct KeyMatchFixture {
    registry: Registry<usize>,
    keys: Vec<KeyExpr>,
}

impl KeyMatchFixture {
    pub fn new(rows: usize) -> Result<Self> {
        let mut registry = Registry::new();
        let mut keys = Vec::with_capacity(rows);
        for index in 0..rows {
            registry.add_subscription(KeyExpr::parse(&pattern(index))?, index);
            keys.push(KeyExpr::literal(&literal_key(index))?);
        }
        Ok(Self { registry, keys })
    }

    /// Matches every fixture key once and returns the total number of hits.
    pub fn match_count(&self) -> usize {
        self.keys
            .iter()
            .map(|key| self.registry.match_subscribers(key).len())
            .sum()
    }
}

pub struct FrameCodecFixture {
    sample: Sample,
}

impl FrameCodecFixture {
    pub fn new(payload_bytes: usize) -> Result<Self> {
        let key = KeyExpr::literal("demo/zenoh/bench/req")?;
        Ok(Self {
            sample: Sample::new(key, vec![0u8; payload_bytes]),
        })
    }

    /// Encodes and decodes the fixture sample, returning the decoded payload length.
    pub fn encode_decode_once(&self) -> usize {
        encode_sample(&self.sample)
            .ok()
            .and_then(|frame| decode_sample(frame).ok())
            .map_or(0, |sample| sample.payload().len())
    }
}

#[derive(Default)]
struct CountingListener {
    received: AtomicUsize,
}

#[async_trait]
impl SampleListener for CountingListener {
    async fn on_sample(&self, _sample: Sample) -> std::result::Result<(), ListenerError> {
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Opens a session, publishes `samples` samples to one subscriber, closes and returns the
/// number of samples the subscriber saw.
pub async fn run_local_dispatch_once(samples: usize) -> Result<usize> {
    let session = Session::open(SessionConfig::default()).await?;
    let listener = Arc::new(CountingListener::default());
    session
        .declare_subscriber("bench/**", listener.clone())
        .await?;
    let publisher = session.declare_publisher("bench/dispatch/sample").await?;

    for _ in 0..samples {
        publisher.put(&b"payload"[..]).await?;
    }
    session.close().await?;

    Ok(listener.received.load(Ordering::Relaxed))
}
