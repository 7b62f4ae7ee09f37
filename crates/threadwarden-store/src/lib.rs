//! Desired-state store: per-thread policy and the commands that mutate it.
//!
//! `DesiredStateStore` is a plain owned value. The runtime keeps it inside a
//! single control task; everything else reaches it through that task's queue.

pub mod store;
pub mod types;

pub use store::DesiredStateStore;
pub use types::*;
