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

//! Transport seam consumed by a [`Session`](crate::Session).
//!
//! The session treats a transport as an opaque pipe for framed bytes: it sends one frame per
//! remote endpoint listed in its configuration and registers a single [`FrameReceiver`] for
//! frames coming back. Discovery, connection management and encryption belong to the
//! implementation.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a transport implementation.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Receives raw frames delivered by a transport.
#[async_trait]
pub trait FrameReceiver: Send + Sync {
    async fn on_receive(&self, frame: Bytes);
}

/// Sends and receives framed bytes on behalf of a session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one frame to `remote`. Addressing is implementation defined.
    async fn send(&self, remote: &str, frame: Bytes) -> Result<(), TransportError>;

    /// Starts feeding received frames to `receiver`.
    async fn register_receiver(&self, receiver: Arc<dyn FrameReceiver>)
        -> Result<(), TransportError>;

    /// Stops feeding frames to a receiver previously passed to `register_receiver`.
    async fn unregister_receiver(
        &self,
        receiver: Arc<dyn FrameReceiver>,
    ) -> Result<(), TransportError>;
}
