//! Observability vocabulary shared by every layer: canonical event names and field helpers.

pub mod events;
pub mod fields;
