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

//! Delivery worker that invokes one subscription's listener for each queued sample.

use crate::control_plane::registry::EntityId;
use crate::error::{Error, Result};
use crate::listener::SampleListener;
use crate::runtime::worker_runtime::{
    spawn_delivery_loop, DeliveryLoopHandle, DEFAULT_DELIVERY_RUNTIME_THREAD_NAME,
};
use crate::sample::Sample;
use crate::stats::StatsCounters;
use crate::{
    observability::events,
    observability::fields::{self, SampleFields, WorkerContext},
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn, Level};
use uuid::Uuid;

const DELIVERY_RUNTIME_THREAD_NAME_PREFIX: &str = "ps-sub-";
const DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "delivery_worker";

/// Worker state that owns the spawned delivery thread handle.
pub(crate) struct DeliveryWorker {
    worker_id: String,
    loop_handle: DeliveryLoopHandle,
}

impl DeliveryWorker {
    /// Spawns a dedicated runtime thread that drains `sample_receiver` into `listener`.
    pub(crate) fn spawn(
        subscriber_id: EntityId,
        listener: Arc<dyn SampleListener>,
        sample_receiver: Receiver<Sample>,
        counters: Arc<StatsCounters>,
    ) -> Result<Self> {
        let worker_id = Uuid::new_v4().hyphenated().to_string();
        let runtime_thread_name = Self::build_runtime_thread_name(subscriber_id);
        let worker_id_for_loop = worker_id.clone();

        let loop_handle = spawn_delivery_loop(runtime_thread_name, move || async move {
            Self::delivery_loop(
                worker_id_for_loop,
                subscriber_id,
                listener,
                sample_receiver,
                counters,
            )
            .await;
        })?;

        Ok(Self {
            worker_id,
            loop_handle,
        })
    }

    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Returns the worker runtime thread label for diagnostics.
    pub(crate) fn runtime_thread(&self) -> &str {
        self.loop_handle.worker_thread()
    }

    pub(crate) fn is_current_thread(&self) -> bool {
        self.loop_handle.is_current_thread()
    }

    pub(crate) fn is_finished(&mut self) -> bool {
        self.loop_handle.is_finished()
    }

    /// Waits until the queue is drained and the loop has returned.
    pub(crate) async fn join(self) {
        self.loop_handle.wait().await;
    }

    fn build_runtime_thread_name(subscriber_id: EntityId) -> String {
        let thread_name = format!("{DELIVERY_RUNTIME_THREAD_NAME_PREFIX}{subscriber_id}");
        if thread_name.len() <= DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN {
            thread_name
        } else {
            DEFAULT_DELIVERY_RUNTIME_THREAD_NAME.to_string()
        }
    }

    /// Invokes the listener once per received sample until every sender is dropped.
    ///
    /// A listener error or panic is reported as [`Error::CallbackFailure`] and the loop moves
    /// on to the next sample.
    pub(crate) async fn delivery_loop(
        worker_id: String,
        subscriber_id: EntityId,
        listener: Arc<dyn SampleListener>,
        mut sample_receiver: Receiver<Sample>,
        counters: Arc<StatsCounters>,
    ) {
        let worker_context = WorkerContext::with_current_thread(worker_id);
        let subscriber = subscriber_id.as_u64();

        while let Some(sample) = sample_receiver.recv().await {
            let key = sample.key_expr().clone();

            if tracing::enabled!(Level::DEBUG) {
                let sample_fields = SampleFields::from_sample(&sample);
                debug!(
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    worker_thread = worker_context.worker_thread.as_str(),
                    subscriber_id = subscriber,
                    key = sample_fields.key.as_str(),
                    payload_len = sample_fields.payload_len,
                    "invoking listener"
                );
            }

            let outcome = AssertUnwindSafe(listener.on_sample(sample))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => counters.record_delivered(),
                Ok(Err(err)) => {
                    counters.record_callback_failure();
                    let failure = Error::CallbackFailure {
                        subscriber: subscriber_id,
                        reason: err.to_string(),
                    };
                    warn!(
                        event = events::DELIVERY_CALLBACK_FAILED,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        worker_thread = worker_context.worker_thread.as_str(),
                        subscriber_id = subscriber,
                        key = key.as_str(),
                        err = %failure,
                        "listener returned an error"
                    );
                }
                Err(panic) => {
                    counters.record_callback_failure();
                    let failure = Error::CallbackFailure {
                        subscriber: subscriber_id,
                        reason: fields::format_panic_payload(panic.as_ref()),
                    };
                    warn!(
                        event = events::DELIVERY_CALLBACK_PANICKED,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        worker_thread = worker_context.worker_thread.as_str(),
                        subscriber_id = subscriber,
                        key = key.as_str(),
                        err = %failure,
                        "listener panicked"
                    );
                }
            }
        }

        info!(
            event = events::DELIVERY_QUEUE_CLOSED,
            component = COMPONENT,
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            subscriber_id = subscriber,
            reason = fields::REASON_QUEUE_CLOSED,
            "queue closed; stopping delivery loop"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{DeliveryWorker, DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN};
    use crate::control_plane::registry::EntityId;
    use crate::listener::{ListenerError, SampleListener};
    use crate::runtime::worker_runtime::DEFAULT_DELIVERY_RUNTIME_THREAD_NAME;
    use crate::stats::StatsCounters;
    use crate::{KeyExpr, Sample};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct ScriptedListener {
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedListener {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SampleListener for ScriptedListener {
        async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
            let payload = sample.payload_as_str()?.to_string();
            self.seen.lock().unwrap().push(payload.clone());
            match payload.as_str() {
                "fail" => Err("rejected".into()),
                "panic" => panic!("listener blew up"),
                _ => Ok(()),
            }
        }
    }

    fn sample(payload: &'static str) -> Sample {
        Sample::new(KeyExpr::literal("a/b").unwrap(), payload)
    }

    #[tokio::test]
    async fn delivery_loop_exits_on_closed_queue() {
        let listener = Arc::new(ScriptedListener::default());
        let counters = Arc::new(StatsCounters::default());
        let (sender, receiver) = mpsc::channel(4);
        drop(sender);

        DeliveryWorker::delivery_loop(
            "closed-loop".to_string(),
            EntityId::from(1),
            listener.clone(),
            receiver,
            counters.clone(),
        )
        .await;

        assert!(listener.seen().is_empty());
        assert_eq!(counters.snapshot().delivered, 0);
    }

    #[tokio::test]
    async fn delivery_loop_drains_queue_before_exit() {
        let listener = Arc::new(ScriptedListener::default());
        let counters = Arc::new(StatsCounters::default());
        let (sender, receiver) = mpsc::channel(4);
        sender.send(sample("one")).await.unwrap();
        sender.send(sample("two")).await.unwrap();
        drop(sender);

        DeliveryWorker::delivery_loop(
            "drain-loop".to_string(),
            EntityId::from(1),
            listener.clone(),
            receiver,
            counters.clone(),
        )
        .await;

        assert_eq!(listener.seen(), vec!["one", "two"]);
        assert_eq!(counters.snapshot().delivered, 2);
    }

    #[tokio::test]
    async fn delivery_loop_continues_after_error_and_panic() {
        let listener = Arc::new(ScriptedListener::default());
        let counters = Arc::new(StatsCounters::default());
        let (sender, receiver) = mpsc::channel(8);
        for payload in ["fail", "after-fail", "panic", "after-panic"] {
            sender.send(sample(payload)).await.unwrap();
        }
        drop(sender);

        DeliveryWorker::delivery_loop(
            "isolation-loop".to_string(),
            EntityId::from(7),
            listener.clone(),
            receiver,
            counters.clone(),
        )
        .await;

        assert_eq!(
            listener.seen(),
            vec!["fail", "after-fail", "panic", "after-panic"]
        );
        let stats = counters.snapshot();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.callback_failures, 2);
    }

    #[tokio::test]
    async fn spawned_worker_runs_on_named_thread_and_joins() {
        let listener = Arc::new(ScriptedListener::default());
        let counters = Arc::new(StatsCounters::default());
        let (sender, receiver) = mpsc::channel(4);

        let worker =
            DeliveryWorker::spawn(EntityId::from(3), listener.clone(), receiver, counters.clone())
                .expect("delivery worker should spawn");
        assert_eq!(worker.runtime_thread(), "ps-sub-3");
        assert!(!worker.worker_id().is_empty());
        assert!(!worker.is_current_thread());

        sender.send(sample("hello")).await.unwrap();
        drop(sender);
        worker.join().await;

        assert_eq!(listener.seen(), vec!["hello"]);
    }

    #[test]
    fn build_runtime_thread_name_falls_back_when_too_long() {
        let thread_name = DeliveryWorker::build_runtime_thread_name(EntityId::from(42));
        assert_eq!(thread_name, "ps-sub-42");

        let thread_name = DeliveryWorker::build_runtime_thread_name(EntityId::from(u64::MAX));
        assert!(thread_name.len() <= DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN);
        assert_eq!(thread_name, DEFAULT_DELIVERY_RUNTIME_THREAD_NAME);
    }
}
