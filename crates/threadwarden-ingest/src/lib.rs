//! Event ingestion: raw platform notifications to typed `Drift`.
//!
//! Accepts both the normalized `{threadId, actorId, changedAttribute,
//! newValue}` shape and the platform's own log-event shapes. One
//! notification yields at most one drift; anything unusable is dropped with
//! a warning and the stream carries on.

pub mod ingestor;
pub mod types;

pub use ingestor::EventIngestor;
pub use types::*;
