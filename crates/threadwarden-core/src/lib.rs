//! Threadwarden Core: shared error type, configuration, identifiers.

pub mod config;
pub mod error;
pub mod ids;

pub use config::WardenConfig;
pub use error::{Error, Result};
pub use ids::{ThreadId, UserId};
