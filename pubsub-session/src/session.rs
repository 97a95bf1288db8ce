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

//! Session facade: lifecycle, declarations and publishing.

use crate::config::SessionConfig;
use crate::control_plane::registry::{EntityId, Registry, Removed};
use crate::data_plane::delivery_worker::DeliveryWorker;
use crate::data_plane::dispatcher::{Dispatcher, SubscriberSink};
use crate::data_plane::frame_codec::encode_sample;
use crate::data_plane::ingress_receiver::IngressReceiver;
use crate::error::{Error, Result};
use crate::listener::SampleListener;
use crate::observability::events;
use crate::routing::key_expr::KeyExpr;
use crate::sample::Sample;
use crate::stats::{SessionStats, StatsCounters};
use crate::transport::{FrameReceiver, Transport};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "session";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SessionState {
    Open,
    Closed,
}

struct SessionInner {
    state: SessionState,
    registry: Registry<SubscriberSink>,
    workers: HashMap<EntityId, DeliveryWorker>,
    // Workers of undeclared subscriptions that may still be draining.
    retired: Vec<DeliveryWorker>,
}

impl SessionInner {
    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(Error::SessionClosed),
        }
    }
}

pub(crate) struct SessionShared {
    id: String,
    config: SessionConfig,
    transport: Option<Arc<dyn Transport>>,
    ingress: Option<Arc<dyn FrameReceiver>>,
    dispatcher: Dispatcher,
    counters: Arc<StatsCounters>,
    inner: RwLock<SessionInner>,
}

impl SessionShared {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn counters(&self) -> &StatsCounters {
        &self.counters
    }

    /// Dispatches a sample that arrived from the transport. Nothing is propagated further.
    pub(crate) async fn dispatch_received(&self, sample: Sample) -> Result<usize> {
        let targets = self.match_targets(&sample).await?;
        Ok(self.dispatcher.dispatch(&sample, &targets).await)
    }

    /// Snapshots the queues matching `sample`.
    ///
    /// The lock is released before enqueueing, so a full queue never blocks declarations or
    /// `close`. The cloned senders keep their queues open until the dispatch returns, which is
    /// what makes `close` wait for samples already matched.
    async fn match_targets(&self, sample: &Sample) -> Result<Vec<SubscriberSink>> {
        let inner = self.inner.read().await;
        inner.ensure_open()?;
        Ok(inner.registry.match_subscribers(sample.key_expr()))
    }

    async fn publish(
        &self,
        publisher: Option<EntityId>,
        key_expr: Result<KeyExpr>,
        payload: Bytes,
    ) -> Result<()> {
        let (sample, targets) = {
            let inner = self.inner.read().await;
            inner.ensure_open()?;
            if let Some(id) = publisher {
                if !inner.registry.contains_publisher(id) {
                    return Err(Error::NotFound(id));
                }
            }
            let key_expr = key_expr?;
            key_expr.ensure_literal()?;

            let sample = Sample::new(key_expr, payload);
            let targets = inner.registry.match_subscribers(sample.key_expr());
            (sample, targets)
        };

        self.dispatcher.dispatch(&sample, &targets).await;
        // Release the queues before the remote sends so close is not held up by them.
        drop(targets);

        self.counters.record_published();
        self.propagate(&sample).await;
        Ok(())
    }

    async fn propagate(&self, sample: &Sample) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        if self.config.connect.endpoints.is_empty() {
            return;
        }

        let frame = match encode_sample(sample) {
            Ok(frame) => frame,
            Err(err) => {
                self.counters.record_remote_send_failure();
                warn!(
                    event = events::REMOTE_ENCODE_FAILED,
                    component = COMPONENT,
                    session = self.id.as_str(),
                    key = sample.key_expr().as_str(),
                    err = %err,
                    "unable to encode sample for remote endpoints"
                );
                return;
            }
        };

        for remote in &self.config.connect.endpoints {
            match transport.send(remote, frame.clone()).await {
                Ok(()) => {
                    self.counters.record_remote_sent();
                    debug!(
                        event = events::REMOTE_SEND_OK,
                        component = COMPONENT,
                        session = self.id.as_str(),
                        remote = remote.as_str(),
                        key = sample.key_expr().as_str(),
                        "sample sent to remote endpoint"
                    );
                }
                Err(err) => {
                    self.counters.record_remote_send_failure();
                    warn!(
                        event = events::REMOTE_SEND_FAILED,
                        component = COMPONENT,
                        session = self.id.as_str(),
                        remote = remote.as_str(),
                        key = sample.key_expr().as_str(),
                        err = %err,
                        "remote send failed"
                    );
                }
            }
        }
    }
}

/// A publish/subscribe session.
///
/// A session is created open by [`Session::open`] and stays usable until [`Session::close`];
/// afterwards every operation fails with [`Error::SessionClosed`]. Clones share the same
/// session and may be used from any number of tasks.
///
/// Each subscription has its own delivery thread and bounded queue of
/// [`SessionConfig::message_queue_size`] samples. `put` waits while a matching queue is full,
/// without holding the session lock, so listeners may publish into their own session. A listener
/// that publishes onto a key its own subscription matches still deadlocks once that queue is full.
///
/// ```
/// use pubsub_session::{listener, Session, SessionConfig};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let session = Session::open(SessionConfig::default()).await.unwrap();
///
/// let subscriber = session
///     .declare_subscriber("demo/zenoh/**", listener::from_fn(|sample| {
///         println!("Received ('{}': {:?})", sample.key_expr(), sample.payload_as_str());
///         Ok(())
///     }))
///     .await
///     .unwrap();
///
/// let publisher = session
///     .declare_publisher("demo/zenoh/getting-started")
///     .await
///     .unwrap();
/// publisher.put("Hello from Rust #0").await.unwrap();
///
/// subscriber.undeclare().await.unwrap();
/// session.close().await.unwrap();
/// assert!(session.put("demo/zenoh/getting-started", "late").await.unwrap_err().is_session_closed());
/// # });
/// ```
#[derive(Clone)]
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    /// Opens a session that only delivers to its own subscribers.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        if !config.connect.endpoints.is_empty() {
            return Err(Error::Config(
                "connect.endpoints requires a transport; use Session::open_with_transport"
                    .to_string(),
            ));
        }
        Ok(Self::build(config, None))
    }

    /// Opens a session that also propagates samples through `transport` and dispatches the
    /// frames it receives from it.
    pub async fn open_with_transport(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let session = Self::build(config, Some(transport.clone()));

        if let Some(ingress) = session.shared.ingress.clone() {
            transport.register_receiver(ingress).await.map_err(|err| {
                warn!(
                    event = events::INGRESS_REGISTER_FAILED,
                    component = COMPONENT,
                    session = session.id(),
                    err = %err,
                    "unable to register ingress receiver"
                );
                Error::Transport(err.to_string())
            })?;
        }

        Ok(session)
    }

    fn build(config: SessionConfig, transport: Option<Arc<dyn Transport>>) -> Self {
        let id = Uuid::new_v4().hyphenated().to_string();

        let shared = Arc::new_cyclic(|weak| {
            let ingress = transport.as_ref().map(|_| {
                Arc::new(IngressReceiver::new(id.clone(), weak.clone())) as Arc<dyn FrameReceiver>
            });
            SessionShared {
                id: id.clone(),
                dispatcher: Dispatcher::new(id.clone()),
                counters: Arc::new(StatsCounters::default()),
                inner: RwLock::new(SessionInner {
                    state: SessionState::Open,
                    registry: Registry::new(),
                    workers: HashMap::new(),
                    retired: Vec::new(),
                }),
                config,
                transport,
                ingress,
            }
        });

        info!(
            event = events::SESSION_OPEN,
            component = COMPONENT,
            session = shared.id.as_str(),
            name = shared.config.name.as_str(),
            endpoints = shared.config.connect.endpoints.len(),
            message_queue_size = shared.config.message_queue_size,
            "session opened"
        );

        Self { shared }
    }

    pub fn id(&self) -> &str {
        self.shared.id()
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.counters.snapshot()
    }

    pub async fn is_closed(&self) -> bool {
        self.shared.inner.read().await.state == SessionState::Closed
    }

    /// Declares a publisher on a wildcard-free key expression.
    pub async fn declare_publisher<K>(&self, key_expr: K) -> Result<Publisher>
    where
        K: TryInto<KeyExpr>,
        Error: From<K::Error>,
    {
        let key_expr = key_expr.try_into().map_err(Error::from);
        let mut inner = self.shared.inner.write().await;
        inner.ensure_open()?;
        let key_expr = key_expr?;
        let id = inner.registry.add_publisher(key_expr.clone())?;
        drop(inner);

        info!(
            event = events::DECLARE_PUBLISHER_OK,
            component = COMPONENT,
            session = self.id(),
            publisher_id = id.as_u64(),
            key = key_expr.as_str(),
            "publisher declared"
        );

        Ok(Publisher {
            id,
            key_expr,
            session: self.clone(),
        })
    }

    /// Declares a subscription and starts its delivery worker.
    ///
    /// The subscription stays active until [`Subscriber::undeclare`], [`Session::undeclare`] or
    /// [`Session::close`]; dropping the returned handle does not undeclare it.
    pub async fn declare_subscriber<K, L>(&self, key_expr: K, listener: L) -> Result<Subscriber>
    where
        K: TryInto<KeyExpr>,
        Error: From<K::Error>,
        L: SampleListener + 'static,
    {
        let key_expr = key_expr.try_into().map_err(Error::from);
        let mut inner = self.shared.inner.write().await;
        inner.ensure_open()?;
        let key_expr = key_expr?;

        let id = inner.registry.peek_next_id();
        let (sender, receiver) = mpsc::channel(self.shared.config.message_queue_size);
        let worker = DeliveryWorker::spawn(
            id,
            Arc::new(listener),
            receiver,
            self.shared.counters.clone(),
        )?;
        let worker_id = worker.worker_id().to_string();
        let worker_thread = worker.runtime_thread().to_string();

        let registered = inner
            .registry
            .add_subscription(key_expr.clone(), SubscriberSink::new(id, sender));
        debug_assert_eq!(registered, id);
        inner.workers.insert(id, worker);
        drop(inner);

        info!(
            event = events::DECLARE_SUBSCRIBER_OK,
            component = COMPONENT,
            session = self.id(),
            subscriber_id = id.as_u64(),
            key = key_expr.as_str(),
            worker_id = worker_id.as_str(),
            worker_thread = worker_thread.as_str(),
            "subscriber declared"
        );

        Ok(Subscriber {
            id,
            key_expr,
            session: self.clone(),
        })
    }

    /// Publishes `payload` on a wildcard-free key.
    ///
    /// Local subscribers are enqueued first, then one frame is sent to each configured remote
    /// endpoint. Remote failures are logged and counted, never returned.
    pub async fn put<K, P>(&self, key_expr: K, payload: P) -> Result<()>
    where
        K: TryInto<KeyExpr>,
        Error: From<K::Error>,
        P: Into<Bytes>,
    {
        let key_expr = key_expr.try_into().map_err(Error::from);
        self.shared.publish(None, key_expr, payload.into()).await
    }

    /// Removes a publisher or subscription by id.
    ///
    /// A removed subscription is not matched by later puts. Samples already queued for it, or
    /// matched by a put that was in progress, are still delivered.
    pub async fn undeclare(&self, id: EntityId) -> Result<()> {
        let mut inner = self.shared.inner.write().await;
        inner.ensure_open()?;

        let removed = match inner.registry.remove(id) {
            Ok(removed) => removed,
            Err(err) => {
                debug!(
                    event = events::UNDECLARE_NOT_FOUND,
                    component = COMPONENT,
                    session = self.id(),
                    entity_id = id.as_u64(),
                    "nothing declared under this id"
                );
                return Err(err);
            }
        };

        let (kind, key_expr) = match removed {
            Removed::Publisher(key_expr) => ("publisher", key_expr),
            Removed::Subscription(key_expr, sink) => {
                drop(sink);
                if let Some(worker) = inner.workers.remove(&id) {
                    inner.retired.retain_mut(|retired| !retired.is_finished());
                    inner.retired.push(worker);
                }
                ("subscriber", key_expr)
            }
        };
        drop(inner);

        info!(
            event = events::UNDECLARE_OK,
            component = COMPONENT,
            session = self.id(),
            entity_id = id.as_u64(),
            kind,
            key = key_expr.as_str(),
            "declaration removed"
        );
        Ok(())
    }

    /// Closes the session.
    ///
    /// Every declaration is released and the ingress receiver is unregistered from the
    /// transport. Returns once every delivery worker has drained its queue, so no listener of
    /// this session runs after `close` returns. When called from inside a listener, the
    /// caller's own worker finishes after this call returns.
    pub async fn close(&self) -> Result<()> {
        let workers = {
            let mut inner = self.shared.inner.write().await;
            inner.ensure_open()?;
            inner.state = SessionState::Closed;

            info!(
                event = events::SESSION_CLOSE_START,
                component = COMPONENT,
                session = self.id(),
                subscriptions = inner.registry.subscription_count(),
                publishers = inner.registry.publisher_count(),
                "closing session"
            );

            drop(inner.registry.clear());
            let mut workers: Vec<DeliveryWorker> =
                inner.workers.drain().map(|(_, worker)| worker).collect();
            workers.append(&mut inner.retired);
            workers
        };

        if let (Some(transport), Some(ingress)) =
            (self.shared.transport.as_ref(), self.shared.ingress.clone())
        {
            if let Err(err) = transport.unregister_receiver(ingress).await {
                warn!(
                    event = events::INGRESS_UNREGISTER_FAILED,
                    component = COMPONENT,
                    session = self.id(),
                    err = %err,
                    "unable to unregister ingress receiver"
                );
            }
        }

        let drained = workers.len();
        for worker in workers {
            if worker.is_current_thread() {
                info!(
                    event = events::SESSION_CLOSE_SKIP_SELF_DRAIN,
                    component = COMPONENT,
                    session = self.id(),
                    worker_id = worker.worker_id(),
                    worker_thread = worker.runtime_thread(),
                    "close called from a listener; not waiting for its own worker"
                );
                continue;
            }
            worker.join().await;
        }

        info!(
            event = events::SESSION_CLOSE_OK,
            component = COMPONENT,
            session = self.id(),
            workers = drained,
            "session closed"
        );
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.shared.id)
            .field("name", &self.shared.config.name)
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`Session::declare_publisher`].
#[derive(Debug)]
pub struct Publisher {
    id: EntityId,
    key_expr: KeyExpr,
    session: Session,
}

impl Publisher {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    /// Publishes on this publisher's key. Fails with `NotFound` once undeclared.
    pub async fn put(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.session
            .shared
            .publish(Some(self.id), Ok(self.key_expr.clone()), payload.into())
            .await
    }

    pub async fn undeclare(self) -> Result<()> {
        self.session.undeclare(self.id).await
    }
}

/// Handle returned by [`Session::declare_subscriber`].
#[derive(Debug)]
pub struct Subscriber {
    id: EntityId,
    key_expr: KeyExpr,
    session: Session,
}

impl Subscriber {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    pub async fn undeclare(self) -> Result<()> {
        self.session.undeclare(self.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::listener::{from_fn, ListenerError, SampleListener};
    use crate::{KeyExpr, Sample, SessionConfig};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Collect {
        payloads: Mutex<Vec<String>>,
    }

    impl Collect {
        fn payloads(&self) -> Vec<String> {
            self.payloads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SampleListener for Collect {
        async fn on_sample(&self, sample: Sample) -> Result<(), ListenerError> {
            self.payloads
                .lock()
                .unwrap()
                .push(sample.payload_as_str()?.to_string());
            Ok(())
        }
    }

    async fn open() -> Session {
        Session::open(SessionConfig::default())
            .await
            .expect("local session should open")
    }

    #[tokio::test]
    async fn put_reaches_matching_subscribers_only() {
        let session = open().await;
        let wide = Arc::new(Collect::default());
        let narrow = Arc::new(Collect::default());
        let other = Arc::new(Collect::default());

        session.declare_subscriber("a/**", wide.clone()).await.unwrap();
        session.declare_subscriber("a/*/c", narrow.clone()).await.unwrap();
        session.declare_subscriber("b/*", other.clone()).await.unwrap();

        session.put("a/x/c", "one").await.unwrap();
        session.put("a/x/y/c", "two").await.unwrap();
        session.close().await.unwrap();

        assert_eq!(wide.payloads(), vec!["one", "two"]);
        assert_eq!(narrow.payloads(), vec!["one"]);
        assert!(other.payloads().is_empty());
        let stats = session.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.delivered, 3);
    }

    #[tokio::test]
    async fn put_and_declare_publisher_reject_wildcards() {
        let session = open().await;

        assert!(session.put("a/*", "x").await.unwrap_err().is_invalid_key_expr());
        assert!(session.put("a//b", "x").await.unwrap_err().is_invalid_key_expr());
        assert!(session
            .declare_publisher("a/**")
            .await
            .unwrap_err()
            .is_invalid_key_expr());
        assert_eq!(session.stats().published, 0);
    }

    #[tokio::test]
    async fn declare_accepts_parsed_key_exprs() {
        let session = open().await;
        let key = KeyExpr::literal("a/b").unwrap();
        let publisher = session.declare_publisher(key.clone()).await.unwrap();
        assert_eq!(publisher.key_expr(), &key);
        session.put(key, "x").await.unwrap();
    }

    #[tokio::test]
    async fn undeclared_publisher_put_fails_with_not_found() {
        let session = open().await;
        let publisher = session.declare_publisher("a/b").await.unwrap();
        let id = publisher.id();

        session.undeclare(id).await.unwrap();
        assert!(publisher.put("late").await.unwrap_err().is_not_found());
        assert!(session.undeclare(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn undeclared_subscriber_stops_receiving() {
        let session = open().await;
        let collect = Arc::new(Collect::default());
        let subscriber = session.declare_subscriber("a/b", collect.clone()).await.unwrap();

        session.put("a/b", "before").await.unwrap();
        subscriber.undeclare().await.unwrap();
        session.put("a/b", "after").await.unwrap();
        session.close().await.unwrap();

        assert_eq!(collect.payloads(), vec!["before"]);
    }

    #[tokio::test]
    async fn operations_after_close_fail_with_session_closed() {
        let session = open().await;
        let publisher = session.declare_publisher("a/b").await.unwrap();
        session.close().await.unwrap();

        assert!(session.is_closed().await);
        assert!(session.put("a/b", "x").await.unwrap_err().is_session_closed());
        assert!(publisher.put("x").await.unwrap_err().is_session_closed());
        assert!(session
            .declare_publisher("a/b")
            .await
            .unwrap_err()
            .is_session_closed());
        assert!(session
            .declare_subscriber("a/b", from_fn(|_| Ok(())))
            .await
            .unwrap_err()
            .is_session_closed());
        assert!(session
            .undeclare(publisher.id())
            .await
            .unwrap_err()
            .is_session_closed());
        assert!(session.close().await.unwrap_err().is_session_closed());
    }

    #[tokio::test]
    async fn close_waits_for_slow_listeners_to_drain() {
        let session = open().await;
        let collect = Arc::new(Collect::default());
        let slow = collect.clone();
        session
            .declare_subscriber(
                "a/b",
                from_fn(move |sample| {
                    std::thread::sleep(Duration::from_millis(5));
                    slow.on_sample_blocking(sample)
                }),
            )
            .await
            .unwrap();

        for i in 0..10 {
            session.put("a/b", format!("{i}")).await.unwrap();
        }
        session.close().await.unwrap();

        assert_eq!(collect.payloads().len(), 10);
    }

    #[tokio::test]
    async fn close_from_inside_a_listener_does_not_wait_for_itself() {
        let session = open().await;
        let closer = session.clone();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let done_tx = Mutex::new(Some(done_tx));

        session
            .declare_subscriber(
                "ctl/stop",
                ClosingListener {
                    session: closer,
                    done: done_tx,
                },
            )
            .await
            .unwrap();

        session.put("ctl/stop", "now").await.unwrap();
        let closed = tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .expect("listener close should not deadlock")
            .unwrap();
        assert!(closed);
        assert!(session.is_closed().await);
    }

    #[tokio::test]
    async fn open_rejects_endpoints_without_transport() {
        let mut config = SessionConfig::default();
        config.connect.endpoints.push("node-b".to_string());
        let err = Session::open(config).await.unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    struct ClosingListener {
        session: Session,
        done: Mutex<Option<tokio::sync::oneshot::Sender<bool>>>,
    }

    #[async_trait]
    impl SampleListener for ClosingListener {
        async fn on_sample(&self, _sample: Sample) -> Result<(), ListenerError> {
            let closed = self.session.close().await.is_ok();
            if let Some(done) = self.done.lock().unwrap().take() {
                let _ = done.send(closed);
            }
            Ok(())
        }
    }

    impl Collect {
        fn on_sample_blocking(&self, sample: Sample) -> Result<(), ListenerError> {
            self.payloads
                .lock()
                .unwrap()
                .push(sample.payload_as_str()?.to_string());
            Ok(())
        }
    }
}
