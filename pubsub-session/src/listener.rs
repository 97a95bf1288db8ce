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

//! Subscriber callback seam.

use crate::sample::Sample;
use async_trait::async_trait;
use std::sync::Arc;

/// Error a listener reports for one sample. It is logged and never reaches the publisher.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Callback attached to a subscription.
///
/// Invocations for one subscription are strictly sequential and happen on that subscription's
/// delivery worker, in the order the samples were enqueued.
#[async_trait]
pub trait SampleListener: Send + Sync {
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError>;
}

#[async_trait]
impl<L: SampleListener + ?Sized> SampleListener for Arc<L> {
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
        (**self).on_sample(sample).await
    }
}

/// Listener backed by a plain closure. Build one with [`from_fn`].
pub struct FnListener<F> {
    callback: F,
}

#[async_trait]
impl<F> SampleListener for FnListener<F>
where
    F: Fn(Sample) -> Result<(), ListenerError> + Send + Sync,
{
    async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
        (self.callback)(sample)
    }
}

/// Wraps a synchronous closure as a [`SampleListener`].
///
/// ```
/// use pubsub_session::listener::from_fn;
///
/// let _listener = from_fn(|sample| {
///     println!("Received ('{}': {:?})", sample.key_expr(), sample.payload_as_str());
///     Ok(())
/// });
/// ```
pub fn from_fn<F>(callback: F) -> FnListener<F>
where
    F: Fn(Sample) -> Result<(), ListenerError> + Send + Sync,
{
    FnListener { callback }
}
