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

use crate::integration_test_listeners::SampleStore;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

const SEQUENCE_SEPARATOR: char = ':';
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Installs a test-friendly `tracing` subscriber once per process.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Payload of the form `<publisher>:<seq>` used by ordering checks.
pub fn sequenced_payload(publisher: &str, seq: u64) -> String {
    format!("{publisher}{SEQUENCE_SEPARATOR}{seq}")
}

pub fn parse_sequenced_payload(payload: &[u8]) -> Option<(String, u64)> {
    let payload = std::str::from_utf8(payload).ok()?;
    let (publisher, seq) = payload.rsplit_once(SEQUENCE_SEPARATOR)?;
    Some((publisher.to_string(), seq.parse().ok()?))
}

/// Panics unless, per publisher, sequence numbers arrive strictly increasing.
///
/// Samples whose payload is not sequenced are ignored. Returns how many samples each
/// publisher contributed.
pub async fn check_samples_in_order(samples: SampleStore) -> HashMap<String, usize> {
    let samples = samples.lock().await;

    let mut last_seen: HashMap<String, u64> = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for sample in samples.iter() {
        let Some((publisher, seq)) = parse_sequenced_payload(sample.payload()) else {
            continue;
        };
        if let Some(prev_seq) = last_seen.get(&publisher) {
            debug!("publisher: {publisher}, prev_seq: {prev_seq}, curr_seq: {seq}");
            if seq <= *prev_seq {
                panic!(
                    "!! -- Sample ordering issue for publisher: {publisher} with prev_seq: {prev_seq} and curr_seq: {seq} -- !!"
                );
            }
        }
        *counts.entry(publisher.clone()).or_default() += 1;
        last_seen.insert(publisher, seq);
    }
    counts
}

/// Polls `samples` until it holds at least `count` entries or `timeout` elapses.
pub async fn wait_for_samples(samples: &SampleStore, count: usize, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if samples.lock().await.len() >= count {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(WAIT_POLL_INTERVAL).await;
    }
}
