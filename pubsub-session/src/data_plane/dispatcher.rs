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

//! Fan-out of one sample onto the queues of its matching subscriptions.

use crate::control_plane::registry::EntityId;
use crate::observability::{events, fields::SampleFields};
use crate::sample::Sample;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn, Level};

const COMPONENT: &str = "dispatcher";

/// Registry-side handle of a subscription: the sending half of its delivery queue.
#[derive(Clone)]
pub(crate) struct SubscriberSink {
    subscriber_id: EntityId,
    sender: Sender<Sample>,
}

impl SubscriberSink {
    pub(crate) fn new(subscriber_id: EntityId, sender: Sender<Sample>) -> Self {
        Self {
            subscriber_id,
            sender,
        }
    }

    pub(crate) fn subscriber_id(&self) -> EntityId {
        self.subscriber_id
    }
}

/// Enqueues samples for delivery. Callbacks never run on the dispatching task.
pub(crate) struct Dispatcher {
    session_id: String,
}

impl Dispatcher {
    pub(crate) fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// Enqueues `sample` on every target in order and returns how many accepted it.
    ///
    /// A full queue suspends the caller until its worker makes room. A target whose worker
    /// is gone is skipped.
    pub(crate) async fn dispatch(&self, sample: &Sample, targets: &[SubscriberSink]) -> usize {
        if targets.is_empty() {
            if tracing::enabled!(Level::DEBUG) {
                let sample_fields = SampleFields::from_sample(sample);
                debug!(
                    event = events::DISPATCH_NO_MATCH,
                    component = COMPONENT,
                    session = self.session_id.as_str(),
                    key = sample_fields.key.as_str(),
                    payload_len = sample_fields.payload_len,
                    "no subscription matches sample"
                );
            }
            return 0;
        }

        let mut enqueued = 0;
        for target in targets {
            if let Err(err) = target.sender.send(sample.clone()).await {
                warn!(
                    event = events::DISPATCH_ENQUEUE_FAILED,
                    component = COMPONENT,
                    session = self.session_id.as_str(),
                    subscriber_id = target.subscriber_id.as_u64(),
                    key = sample.key_expr().as_str(),
                    err = %err,
                    "delivery queue is gone; skipping subscriber"
                );
                continue;
            }
            enqueued += 1;
        }
        enqueued
    }
}
