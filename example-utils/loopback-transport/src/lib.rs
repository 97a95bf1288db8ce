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

//! In-process [`Transport`] for demos and tests.
//!
//! A [`LoopbackHub`] stands in for the network. Each [`LoopbackTransport`] is bound to a node
//! name on the hub; `send(remote, frame)` hands the frame to every receiver registered on the
//! node called `remote`, inline on the sending task.
//!
//! ```
//! use loopback_transport::LoopbackHub;
//! use pubsub_session::{listener, Session, SessionConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let hub = LoopbackHub::new();
//!
//! let mut config_a = SessionConfig::default();
//! config_a.name = "node-a".to_string();
//! config_a.connect.endpoints.push("node-b".to_string());
//! let node_a = Session::open_with_transport(config_a, hub.transport("node-a")).await.unwrap();
//!
//! let mut config_b = SessionConfig::default();
//! config_b.name = "node-b".to_string();
//! let node_b = Session::open_with_transport(config_b, hub.transport("node-b")).await.unwrap();
//! node_b
//!     .declare_subscriber("demo/**", listener::from_fn(|sample| {
//!         println!("node-b received {}", sample.key_expr());
//!         Ok(())
//!     }))
//!     .await
//!     .unwrap();
//!
//! node_a.put("demo/zenoh/getting-started", "hello").await.unwrap();
//! node_a.close().await.unwrap();
//! node_b.close().await.unwrap();
//! assert_eq!(node_b.stats().delivered, 1);
//! # });
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use pubsub_session::{FrameReceiver, Transport, TransportError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "loopback_transport";

type ReceiverMap = HashMap<String, Vec<Arc<dyn FrameReceiver>>>;

fn same_receiver(left: &Arc<dyn FrameReceiver>, right: &Arc<dyn FrameReceiver>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(left) as *const (),
        Arc::as_ptr(right) as *const (),
    )
}

/// Shared medium connecting loopback transports by node name.
#[derive(Default)]
pub struct LoopbackHub {
    receivers: Mutex<ReceiverMap>,
}

impl LoopbackHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a transport bound to `node` on this hub.
    pub fn transport(self: &Arc<Self>, node: impl Into<String>) -> Arc<LoopbackTransport> {
        Arc::new(LoopbackTransport {
            hub: self.clone(),
            node: node.into(),
            frames_sent: AtomicU64::new(0),
        })
    }

    /// Number of receivers currently registered on `node`.
    pub async fn receiver_count(&self, node: &str) -> usize {
        self.receivers
            .lock()
            .await
            .get(node)
            .map_or(0, |receivers| receivers.len())
    }

    async fn receivers_of(&self, node: &str) -> Vec<Arc<dyn FrameReceiver>> {
        self.receivers
            .lock()
            .await
            .get(node)
            .cloned()
            .unwrap_or_default()
    }
}

pub struct LoopbackTransport {
    hub: Arc<LoopbackHub>,
    node: String,
    frames_sent: AtomicU64,
}

impl LoopbackTransport {
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Frames this transport handed to at least one receiver.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, remote: &str, frame: Bytes) -> Result<(), TransportError> {
        // Snapshot so that receivers may register or unregister while being fed.
        let receivers = self.hub.receivers_of(remote).await;
        if receivers.is_empty() {
            warn!(
                component = COMPONENT,
                node = self.node.as_str(),
                remote,
                "no receiver registered on remote node"
            );
            return Err(TransportError::new(format!(
                "no receiver registered on node '{remote}'"
            )));
        }

        debug!(
            component = COMPONENT,
            node = self.node.as_str(),
            remote,
            frame_len = frame.len(),
            receivers = receivers.len(),
            "delivering frame"
        );
        for receiver in receivers {
            receiver.on_receive(frame.clone()).await;
        }
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn register_receiver(
        &self,
        receiver: Arc<dyn FrameReceiver>,
    ) -> Result<(), TransportError> {
        let mut receivers = self.hub.receivers.lock().await;
        let node_receivers = receivers.entry(self.node.clone()).or_default();
        if node_receivers
            .iter()
            .any(|registered| same_receiver(registered, &receiver))
        {
            return Err(TransportError::new(format!(
                "receiver already registered on node '{}'",
                self.node
            )));
        }
        node_receivers.push(receiver);
        Ok(())
    }

    async fn unregister_receiver(
        &self,
        receiver: Arc<dyn FrameReceiver>,
    ) -> Result<(), TransportError> {
        let mut receivers = self.hub.receivers.lock().await;
        let Some(node_receivers) = receivers.get_mut(&self.node) else {
            return Err(TransportError::new(format!(
                "no receiver registered on node '{}'",
                self.node
            )));
        };
        let Some(position) = node_receivers
            .iter()
            .position(|registered| same_receiver(registered, &receiver))
        else {
            return Err(TransportError::new(format!(
                "receiver is not registered on node '{}'",
                self.node
            )));
        };
        node_receivers.remove(position);
        if node_receivers.is_empty() {
            receivers.remove(&self.node);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LoopbackHub;
    use async_trait::async_trait;
    use bytes::Bytes;
    use pubsub_session::{FrameReceiver, Transport};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CollectFrames {
        frames: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl FrameReceiver for CollectFrames {
        async fn on_receive(&self, frame: Bytes) {
            self.frames.lock().unwrap().push(frame);
        }
    }

    #[tokio::test]
    async fn send_reaches_receivers_on_the_named_node_only() {
        let hub = LoopbackHub::new();
        let node_a = hub.transport("node-a");
        let node_b = hub.transport("node-b");
        let on_a = Arc::new(CollectFrames::default());
        let on_b = Arc::new(CollectFrames::default());
        node_a.register_receiver(on_a.clone()).await.unwrap();
        node_b.register_receiver(on_b.clone()).await.unwrap();

        node_a
            .send("node-b", Bytes::from_static(b"frame"))
            .await
            .unwrap();

        assert!(on_a.frames.lock().unwrap().is_empty());
        assert_eq!(on_b.frames.lock().unwrap().as_slice(), &[Bytes::from_static(b"frame")]);
        assert_eq!(node_a.frames_sent(), 1);
        assert_eq!(node_a.node(), "node-a");
    }

    #[tokio::test]
    async fn send_to_unknown_node_fails() {
        let hub = LoopbackHub::new();
        let node_a = hub.transport("node-a");
        let err = node_a
            .send("nowhere", Bytes::from_static(b"frame"))
            .await
            .unwrap_err();
        assert!(err.message().contains("nowhere"));
        assert_eq!(node_a.frames_sent(), 0);
    }

    #[tokio::test]
    async fn register_and_unregister_track_identity() {
        let hub = LoopbackHub::new();
        let node = hub.transport("node-a");
        let receiver: Arc<dyn FrameReceiver> = Arc::new(CollectFrames::default());

        node.register_receiver(receiver.clone()).await.unwrap();
        assert!(node.register_receiver(receiver.clone()).await.is_err());
        assert_eq!(hub.receiver_count("node-a").await, 1);

        node.unregister_receiver(receiver.clone()).await.unwrap();
        assert!(node.unregister_receiver(receiver).await.is_err());
        assert_eq!(hub.receiver_count("node-a").await, 0);
    }
}
