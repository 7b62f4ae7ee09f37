//! Threadwarden runtime: the engine control task and its schedulers.
//!
//! `EngineHandle` is the only way in: raw notifications, operator commands
//! and queries all travel through one ordered queue to the task that owns
//! the policy store. `KeepAlive` pulses the active thread in the background.

pub mod engine;
pub mod keepalive;
pub mod types;

pub use engine::EngineHandle;
pub use keepalive::KeepAlive;
pub use types::EngineStatus;
