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

//! Round-trip bookkeeping for the benchmark client.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// Running mean and variance (Welford).
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct OnlineStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl OnlineStats {
    pub(crate) fn add(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn mean(&self) -> f64 {
        self.mean
    }

    pub(crate) fn min(&self) -> f64 {
        self.min
    }

    pub(crate) fn max(&self) -> f64 {
        self.max
    }

    /// Sample variance; zero until two values were added.
    pub(crate) fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }

    pub(crate) fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Nearest-rank-below percentile of an ascending slice, `p` in `0.0..=1.0`.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return 0.0;
    };
    if p <= 0.0 {
        return *first;
    }
    if p >= 1.0 {
        return *last;
    }
    let index = (p * (sorted.len() - 1) as f64) as usize;
    sorted[index]
}

/// Tracks in-flight requests and the round trips of their acks.
pub(crate) struct RttTracker {
    timeout: Duration,
    inflight: VecDeque<(u64, Instant)>,
    send_times: HashMap<u64, Instant>,
    rtt_us: Vec<f64>,
    rtt_stats: OnlineStats,
    acked: u64,
    timeouts: u64,
    out_of_order: u64,
    last_ack_seq: Option<u64>,
}

impl RttTracker {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inflight: VecDeque::new(),
            send_times: HashMap::new(),
            rtt_us: Vec::new(),
            rtt_stats: OnlineStats::default(),
            acked: 0,
            timeouts: 0,
            out_of_order: 0,
            last_ack_seq: None,
        }
    }

    pub(crate) fn on_send(&mut self, seq: u64, at: Instant) {
        self.inflight.push_back((seq, at));
        self.send_times.insert(seq, at);
    }

    /// Records an ack and returns its round trip in microseconds.
    ///
    /// Acks for unknown or already expired requests return `None`.
    pub(crate) fn on_ack(&mut self, seq: u64, at: Instant) -> Option<f64> {
        if self.last_ack_seq.is_some_and(|last| seq <= last) {
            self.out_of_order += 1;
        } else {
            self.last_ack_seq = Some(seq);
        }

        let sent_at = self.send_times.remove(&seq)?;
        let rtt_us = at.saturating_duration_since(sent_at).as_secs_f64() * 1e6;
        self.acked += 1;
        self.rtt_us.push(rtt_us);
        self.rtt_stats.add(rtt_us);
        Some(rtt_us)
    }

    /// Expires requests older than the ack timeout and returns how many expired.
    pub(crate) fn expire(&mut self, now: Instant) -> u64 {
        let mut expired = 0;
        while let Some((seq, sent_at)) = self.inflight.front().copied() {
            if !self.send_times.contains_key(&seq) {
                self.inflight.pop_front();
                continue;
            }
            if now.saturating_duration_since(sent_at) <= self.timeout {
                break;
            }
            self.inflight.pop_front();
            self.send_times.remove(&seq);
            expired += 1;
        }
        self.timeouts += expired;
        expired
    }

    pub(crate) fn pending(&self) -> usize {
        self.send_times.len()
    }

    pub(crate) fn acked(&self) -> u64 {
        self.acked
    }

    pub(crate) fn summary(&self, sent: u64, elapsed: Duration, payload_bytes: usize) -> RttSummary {
        let mut sorted = self.rtt_us.clone();
        sorted.sort_by(f64::total_cmp);
        let secs = elapsed.as_secs_f64().max(f64::EPSILON);

        RttSummary {
            elapsed_s: elapsed.as_secs_f64(),
            sent,
            acked: self.acked,
            timeouts: self.timeouts,
            out_of_order: self.out_of_order,
            pending: self.pending(),
            sent_per_s: sent as f64 / secs,
            ack_per_s: self.acked as f64 / secs,
            mib_per_s: (sent as f64 * payload_bytes as f64) / secs / (1024.0 * 1024.0),
            rtt_us_avg: self.rtt_stats.mean(),
            rtt_us_min: self.rtt_stats.min(),
            rtt_us_max: self.rtt_stats.max(),
            rtt_us_p50: percentile_sorted(&sorted, 0.50),
            rtt_us_p95: percentile_sorted(&sorted, 0.95),
            rtt_us_p99: percentile_sorted(&sorted, 0.99),
            rtt_us_stddev: self.rtt_stats.stddev(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RttSummary {
    pub(crate) elapsed_s: f64,
    pub(crate) sent: u64,
    pub(crate) acked: u64,
    pub(crate) timeouts: u64,
    pub(crate) out_of_order: u64,
    pub(crate) pending: usize,
    pub(crate) sent_per_s: f64,
    pub(crate) ack_per_s: f64,
    pub(crate) mib_per_s: f64,
    pub(crate) rtt_us_avg: f64,
    pub(crate) rtt_us_min: f64,
    pub(crate) rtt_us_max: f64,
    pub(crate) rtt_us_p50: f64,
    pub(crate) rtt_us_p95: f64,
    pub(crate) rtt_us_p99: f64,
    pub(crate) rtt_us_stddev: f64,
}

impl fmt::Display for RttSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "summary duration_s={:.3} sent={} acked={} timeouts={} out_of_order={} pending={} \
             sent_per_s={:.1} ack_per_s={:.1} mib_per_s={:.3} \
             rtt_us_avg={:.1} rtt_us_min={:.1} rtt_us_max={:.1} \
             rtt_us_p50={:.1} rtt_us_p95={:.1} rtt_us_p99={:.1} rtt_us_stddev={:.1}",
            self.elapsed_s,
            self.sent,
            self.acked,
            self.timeouts,
            self.out_of_order,
            self.pending,
            self.sent_per_s,
            self.ack_per_s,
            self.mib_per_s,
            self.rtt_us_avg,
            self.rtt_us_min,
            self.rtt_us_max,
            self.rtt_us_p50,
            self.rtt_us_p95,
            self.rtt_us_p99,
            self.rtt_us_stddev,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_stats_matches_textbook_values() {
        let mut stats = OnlineStats::default();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(value);
        }
        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-9);
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-9);
        assert_eq!(stats.min(), 2.0);
        assert_eq!(stats.max(), 9.0);
    }

    #[test]
    fn single_value_has_zero_variance() {
        let mut stats = OnlineStats::default();
        stats.add(3.5);
        assert_eq!(stats.variance(), 0.0);
        assert_eq!(stats.stddev(), 0.0);
    }

    #[test]
    fn percentile_handles_bounds() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&[], 0.5), 0.0);
        assert_eq!(percentile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(percentile_sorted(&sorted, 1.0), 5.0);
        assert_eq!(percentile_sorted(&sorted, 0.5), 3.0);
        assert_eq!(percentile_sorted(&sorted, 0.99), 4.0);
    }

    #[test]
    fn tracker_counts_acks_out_of_order_and_timeouts() {
        let start = Instant::now();
        let mut tracker = RttTracker::new(Duration::from_millis(100));
        for seq in 0..4 {
            tracker.on_send(seq, start);
        }

        let rtt = tracker.on_ack(1, start + Duration::from_micros(250)).unwrap();
        assert!((rtt - 250.0).abs() < 1e-6);
        assert!(tracker.on_ack(0, start + Duration::from_micros(300)).is_some());
        assert_eq!(tracker.pending(), 2);

        assert_eq!(tracker.expire(start + Duration::from_millis(50)), 0);
        assert_eq!(tracker.expire(start + Duration::from_millis(150)), 2);
        assert_eq!(tracker.pending(), 0);
        assert_eq!(tracker.on_ack(3, start + Duration::from_millis(200)), None);

        let summary = tracker.summary(4, Duration::from_secs(1), 1024);
        assert_eq!(summary.acked, 2);
        assert_eq!(summary.timeouts, 2);
        assert_eq!(summary.out_of_order, 1);
        assert_eq!(summary.pending, 0);
        assert!((summary.rtt_us_min - 250.0).abs() < 1e-6);
        assert!(summary.to_string().starts_with("summary duration_s=1.000 sent=4 acked=2"));
    }
}
