//! Data-plane layer.
//!
//! Moves samples from publishers to listeners: the dispatcher enqueues onto per-subscription
//! bounded queues, one delivery worker per subscription drains its queue into the listener,
//! and the ingress receiver turns transport frames back into samples for local dispatch.
//! The frame codec defines the bytes exchanged with a transport.

pub(crate) mod delivery_worker;
pub(crate) mod dispatcher;
pub(crate) mod frame_codec;
pub(crate) mod ingress_receiver;
