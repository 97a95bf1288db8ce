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

//! Runtime helper for spawning subscription delivery loops.

use crate::error::{Error, Result};
use crate::observability::{events, fields};
use std::future::Future;
use std::thread::{self, ThreadId};
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub(crate) const DEFAULT_DELIVERY_RUNTIME_THREAD_NAME: &str = "ps-delivery";
const COMPONENT: &str = "worker_runtime";

/// Handle to a running delivery loop thread.
pub(crate) struct DeliveryLoopHandle {
    worker_thread: String,
    thread_id: ThreadId,
    finished: Option<oneshot::Receiver<()>>,
}

impl DeliveryLoopHandle {
    pub(crate) fn worker_thread(&self) -> &str {
        &self.worker_thread
    }

    /// Returns `true` when called from the loop's own thread.
    pub(crate) fn is_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Returns `true` once the loop has returned (or its thread is gone).
    pub(crate) fn is_finished(&mut self) -> bool {
        let Some(finished) = self.finished.as_mut() else {
            return true;
        };
        if let Err(oneshot::error::TryRecvError::Empty) = finished.try_recv() {
            return false;
        }
        self.finished = None;
        true
    }

    /// Waits until the loop returns. A panicked thread counts as returned.
    pub(crate) async fn wait(self) {
        if let Some(finished) = self.finished {
            let _ = finished.await;
        }
    }
}

/// Spawns `run_loop` on a dedicated, named thread driving its own current-thread runtime.
pub(crate) fn spawn_delivery_loop<F, Fut>(
    thread_name: String,
    run_loop: F,
) -> Result<DeliveryLoopHandle>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let runtime = Builder::new_current_thread().enable_all().build().map_err(|err| {
        warn!(
            event = events::RUNTIME_SPAWN_FAILED,
            component = COMPONENT,
            worker_thread = thread_name.as_str(),
            err = %err,
            "unable to build delivery runtime"
        );
        Error::Runtime(err.to_string())
    })?;

    let (finished_tx, finished_rx) = oneshot::channel();
    let join_handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            runtime.block_on(run_loop());
            let _ = finished_tx.send(());
        })
        .map_err(|err| {
            warn!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                worker_thread = thread_name.as_str(),
                err = %err,
                "unable to spawn delivery thread"
            );
            Error::Runtime(err.to_string())
        })?;

    let worker_thread = join_handle
        .thread()
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| {
            debug!(
                event = events::RUNTIME_THREAD_NAME_FALLBACK,
                component = COMPONENT,
                reason = fields::REASON_INVALID_THREAD_NAME,
                "delivery thread has no name"
            );
            DEFAULT_DELIVERY_RUNTIME_THREAD_NAME.to_string()
        });

    debug!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        worker_thread = worker_thread.as_str(),
        "delivery thread started"
    );

    Ok(DeliveryLoopHandle {
        worker_thread,
        thread_id: join_handle.thread().id(),
        finished: Some(finished_rx),
    })
}
