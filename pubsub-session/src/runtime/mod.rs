//! Runtime integration layer.
//!
//! Isolates the delivery thread boundary so that threading behavior stays localized:
//! every subscription callback runs on a dedicated named thread driving its own
//! current-thread runtime, independent of the caller's executor.

pub(crate) mod worker_runtime;
