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

//! Canonical structured field values and value-format helpers.

use crate::sample::Sample;

pub const REASON_QUEUE_CLOSED: &str = "queue_closed";
pub const REASON_SESSION_CLOSED: &str = "session_closed";
pub const REASON_INVALID_THREAD_NAME: &str = "invalid_thread_name";
pub const DEFAULT_WORKER_THREAD: &str = "unknown-thread";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerContext {
    pub worker_id: String,
    pub worker_thread: String,
}

impl WorkerContext {
    pub fn with_current_thread(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: thread_name_or_default(std::thread::current().name()),
        }
    }
}

fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_WORKER_THREAD).to_string()
}

/// Formats a panic payload caught from a listener.
pub fn format_panic_payload(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Key and payload size of a sample, pre-rendered for log fields.
pub struct SampleFields {
    pub key: String,
    pub payload_len: usize,
}

impl SampleFields {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            key: sample.key_expr().to_string(),
            payload_len: sample.payload().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        format_panic_payload, thread_name_or_default, SampleFields, WorkerContext,
        DEFAULT_WORKER_THREAD,
    };
    use crate::{KeyExpr, Sample};

    #[test]
    fn worker_context_uses_default_for_unnamed_threads() {
        assert_eq!(thread_name_or_default(None), DEFAULT_WORKER_THREAD);
        assert_eq!(thread_name_or_default(Some("ps-deliver-1")), "ps-deliver-1");
    }

    #[test]
    fn worker_context_captures_current_thread_name() {
        let context = std::thread::Builder::new()
            .name("ps-sub-7".to_string())
            .spawn(|| WorkerContext::with_current_thread("worker-7"))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(context.worker_id, "worker-7");
        assert_eq!(context.worker_thread, "ps-sub-7");

        let unnamed = std::thread::spawn(|| WorkerContext::with_current_thread("worker-8"))
            .join()
            .unwrap();
        assert_eq!(unnamed.worker_thread, DEFAULT_WORKER_THREAD);
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let from_str: Box<dyn std::any::Any + Send> = Box::new("boom");
        let from_string: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn std::any::Any + Send> = Box::new(42u8);

        assert_eq!(format_panic_payload(from_str.as_ref()), "boom");
        assert_eq!(format_panic_payload(from_string.as_ref()), "bang");
        assert_eq!(format_panic_payload(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn sample_fields_capture_key_and_size() {
        let sample = Sample::new(KeyExpr::literal("a/b").unwrap(), "hello");
        let fields = SampleFields::from_sample(&sample);
        assert_eq!(fields.key, "a/b");
        assert_eq!(fields.payload_len, 5);
    }
}
