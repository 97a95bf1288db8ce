//! Canonical structured event names used across `pubsub-session`.

// Session lifecycle events.
pub const SESSION_OPEN: &str = "session_open";
pub const SESSION_CLOSE_START: &str = "session_close_start";
pub const SESSION_CLOSE_OK: &str = "session_close_ok";
pub const SESSION_CLOSE_SKIP_SELF_DRAIN: &str = "session_close_skip_self_drain";

// Control-plane declaration events.
pub const DECLARE_PUBLISHER_OK: &str = "declare_publisher_ok";
pub const DECLARE_SUBSCRIBER_OK: &str = "declare_subscriber_ok";
pub const UNDECLARE_OK: &str = "undeclare_ok";
pub const UNDECLARE_NOT_FOUND: &str = "undeclare_not_found";

// Dispatch and delivery events.
pub const DISPATCH_NO_MATCH: &str = "dispatch_no_match";
pub const DISPATCH_ENQUEUE_FAILED: &str = "dispatch_enqueue_failed";
pub const DELIVERY_CALLBACK_FAILED: &str = "delivery_callback_failed";
pub const DELIVERY_CALLBACK_PANICKED: &str = "delivery_callback_panicked";
pub const DELIVERY_QUEUE_CLOSED: &str = "delivery_queue_closed";

// Remote propagation events.
pub const REMOTE_ENCODE_FAILED: &str = "remote_encode_failed";
pub const REMOTE_SEND_OK: &str = "remote_send_ok";
pub const REMOTE_SEND_FAILED: &str = "remote_send_failed";
pub const INGRESS_RECEIVE: &str = "ingress_receive";
pub const INGRESS_DECODE_FAILED: &str = "ingress_decode_failed";
pub const INGRESS_DROP_SESSION_CLOSED: &str = "ingress_drop_session_closed";
pub const INGRESS_REGISTER_FAILED: &str = "ingress_register_failed";
pub const INGRESS_UNREGISTER_FAILED: &str = "ingress_unregister_failed";

// Runtime events.
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
pub const RUNTIME_THREAD_NAME_FALLBACK: &str = "runtime_thread_name_fallback";
