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

use crate::routing::key_expr::KeyExpr;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::str::Utf8Error;

/// [`Sample`] is one published unit of data: the literal key it was put on, the payload and
/// the time the publisher created it.
///
/// Samples are immutable values. Cloning shares the payload buffer.
///
/// # Examples
///
/// ```
/// use pubsub_session::{KeyExpr, Sample};
///
/// let key = KeyExpr::literal("demo/zenoh/getting-started").unwrap();
/// let sample = Sample::new(key, "Hello from Rust #0");
///
/// assert_eq!(sample.key_expr().as_str(), "demo/zenoh/getting-started");
/// assert_eq!(sample.payload_as_str().unwrap(), "Hello from Rust #0");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    key_expr: KeyExpr,
    payload: Bytes,
    timestamp: DateTime<Utc>,
}

impl Sample {
    /// Builds a sample stamped with the current time.
    pub fn new(key_expr: KeyExpr, payload: impl Into<Bytes>) -> Self {
        Self::with_timestamp(key_expr, payload, Utc::now())
    }

    pub fn with_timestamp(
        key_expr: KeyExpr,
        payload: impl Into<Bytes>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key_expr,
            payload: payload.into(),
            timestamp,
        }
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn payload_as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
