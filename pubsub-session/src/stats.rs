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

//! Session counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a session's counters, returned by
/// [`Session::stats`](crate::Session::stats).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SessionStats {
    /// Successful `put` calls, local and remote propagation included.
    pub published: u64,
    /// Samples a listener accepted.
    pub delivered: u64,
    /// Samples a listener rejected or panicked on.
    pub callback_failures: u64,
    pub remote_sent: u64,
    pub remote_send_failures: u64,
    /// Frames from the transport that decoded and were dispatched.
    pub remote_received: u64,
    /// Frames from the transport that were undecodable or arrived after close.
    pub remote_dropped: u64,
}

#[derive(Default)]
pub(crate) struct StatsCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    callback_failures: AtomicU64,
    remote_sent: AtomicU64,
    remote_send_failures: AtomicU64,
    remote_received: AtomicU64,
    remote_dropped: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_callback_failure(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_sent(&self) {
        self.remote_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_send_failure(&self) {
        self.remote_send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_received(&self) {
        self.remote_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_dropped(&self) {
        self.remote_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SessionStats {
        SessionStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            remote_sent: self.remote_sent.load(Ordering::Relaxed),
            remote_send_failures: self.remote_send_failures.load(Ordering::Relaxed),
            remote_received: self.remote_received.load(Ordering::Relaxed),
            remote_dropped: self.remote_dropped.load(Ordering::Relaxed),
        }
    }
}
