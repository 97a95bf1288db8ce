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

use async_trait::async_trait;
use pubsub_session::{ListenerError, Sample, SampleListener};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub type SampleStore = Arc<Mutex<Vec<Sample>>>;

/// Listener that keeps every sample it receives.
#[derive(Clone)]
pub struct RecordingListener {
    sample_store: SampleStore,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self {
            sample_store: Arc::new(Mutex::new(Vec::with_capacity(10000))),
        }
    }

    pub fn retrieve_sample_store(&self) -> SampleStore {
        self.sample_store.clone()
    }

    /// Payloads received so far, decoded as UTF-8 (lossy).
    pub async fn payloads(&self) -> Vec<String> {
        self.sample_store
            .lock()
            .await
            .iter()
            .map(|sample| String::from_utf8_lossy(sample.payload()).into_owned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sample_store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sample_store.lock().await.is_empty()
    }
}

#[async_trait]
impl SampleListener for RecordingListener {
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
        debug!("within recording_listener! key: {}", sample.key_expr());
        self.sample_store.lock().await.push(sample);
        Ok(())
    }
}

impl Default for RecordingListener {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener that records every sample, then fails or panics on chosen payloads.
#[derive(Clone, Default)]
pub struct FailingListener {
    recorder: RecordingListener,
    fail_on: HashSet<String>,
    panic_on: HashSet<String>,
}

impl FailingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an error for samples carrying exactly `payload`.
    pub fn fail_on(mut self, payload: impl Into<String>) -> Self {
        self.fail_on.insert(payload.into());
        self
    }

    /// Panics for samples carrying exactly `payload`.
    pub fn panic_on(mut self, payload: impl Into<String>) -> Self {
        self.panic_on.insert(payload.into());
        self
    }

    pub fn recorder(&self) -> &RecordingListener {
        &self.recorder
    }
}

#[async_trait]
impl SampleListener for FailingListener {
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
        let payload = String::from_utf8_lossy(sample.payload()).into_owned();
        self.recorder.on_sample(sample).await?;

        if self.panic_on.contains(&payload) {
            panic!("failing_listener panics on '{payload}'");
        }
        if self.fail_on.contains(&payload) {
            return Err(format!("failing_listener rejects '{payload}'").into());
        }
        Ok(())
    }
}
