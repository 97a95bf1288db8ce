//! Control-plane layer.
//!
//! Owns the declaration registry: id allocation, publisher and subscription bookkeeping,
//! and `NotFound` semantics for removal.
//!
//! ```
//! use pubsub_session::{listener, Session, SessionConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let session = Session::open(SessionConfig::default()).await.unwrap();
//! let publisher = session.declare_publisher("a/b").await.unwrap();
//! let subscriber = session
//!     .declare_subscriber("a/*", listener::from_fn(|_| Ok(())))
//!     .await
//!     .unwrap();
//!
//! // Publishers and subscriptions share one id space.
//! assert_ne!(publisher.id(), subscriber.id());
//!
//! let id = publisher.id();
//! publisher.undeclare().await.unwrap();
//! assert!(session.undeclare(id).await.unwrap_err().is_not_found());
//! session.close().await.unwrap();
//! # });
//! ```

pub(crate) mod registry;
