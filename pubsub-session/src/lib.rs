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

//! # pubsub-session
//!
//! `pubsub-session` is a small publish/subscribe session core: hierarchical key expressions
//! with `*` and `**` wildcards, a declaration registry, per-subscription delivery workers and
//! a [`Transport`] seam for exchanging samples with other sessions.
//!
//! Typical usage is API-first and centered on [`Session`], [`Publisher`] and [`Subscriber`].
//! Internal modules are organized by domain layer to keep behavior ownership explicit.
//!
//! ## Local publish/subscribe
//!
//! ```
//! use pubsub_session::{listener, Session, SessionConfig};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let session = Session::open(SessionConfig::default()).await.unwrap();
//!
//! let received = Arc::new(AtomicUsize::new(0));
//! let counter = received.clone();
//! session
//!     .declare_subscriber("demo/zenoh/**", listener::from_fn(move |_sample| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     }))
//!     .await
//!     .unwrap();
//!
//! let publisher = session.declare_publisher("demo/zenoh/getting-started").await.unwrap();
//! for idx in 0..3 {
//!     publisher.put(format!("Hello from Rust #{idx}")).await.unwrap();
//! }
//!
//! // close() drains every delivery worker before returning.
//! session.close().await.unwrap();
//! assert_eq!(received.load(Ordering::SeqCst), 3);
//! # });
//! ```
//!
//! ## Contract
//!
//! Publish keys are wildcard-free, unknown ids fail with `NotFound`, and a closed session
//! rejects everything.
//!
//! ```
//! use pubsub_session::{EntityId, Session, SessionConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let session = Session::open(SessionConfig::default()).await.unwrap();
//!
//! assert!(session.put("a/*/c", "x").await.unwrap_err().is_invalid_key_expr());
//! assert!(session.undeclare(EntityId::from(42)).await.unwrap_err().is_not_found());
//!
//! session.close().await.unwrap();
//! assert!(session.put("a/b/c", "x").await.unwrap_err().is_session_closed());
//! assert!(session.declare_publisher("a/b/c").await.unwrap_err().is_session_closed());
//! # });
//! ```
//!
//! ## Remote endpoints
//!
//! A session opened with [`Session::open_with_transport`] sends every `put` as one frame to
//! each entry of `connect.endpoints`, and dispatches frames received from the transport to its
//! local subscribers only. Received samples are never forwarded again.
//!
//! ## Internal architecture map
//!
//! - API facade: outward `Session`/`Publisher`/`Subscriber` surface
//! - Routing: key-expression parsing and matching policy
//! - Control plane: declaration registry and id space
//! - Data plane: dispatcher, delivery workers, ingress receiver and frame codec
//! - Runtime: delivery thread boundary
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not unconditionally initialize a global
//! subscriber. Binaries and tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod config;
pub use config::{ConnectConfig, SessionConfig, DEFAULT_MESSAGE_QUEUE_SIZE, DEFAULT_SESSION_NAME};

mod control_plane;
pub use control_plane::registry::EntityId;

mod data_plane;

mod error;
pub use error::{Error, Result};

pub mod listener;
pub use listener::{ListenerError, SampleListener};

#[doc(hidden)]
pub mod benchmark_support;
#[doc(hidden)]
pub mod observability;

mod routing;
pub use routing::key_expr::{KeyExpr, Segment};

mod runtime;

mod sample;
pub use sample::Sample;

mod session;
pub use session::{Publisher, Session, Subscriber};

mod stats;
pub use stats::SessionStats;

pub mod transport;
pub use transport::{FrameReceiver, Transport, TransportError};
