//! Action executor: runs corrective actions against the remote platform.
//!
//! Every action is issued, then issued again after a fixed delay ("double
//! protection") to cover the platform's eventual-consistency lag and silent
//! drops. After the last attempt the action is either applied or abandoned;
//! nothing retries forever. Actions on one resource key run strictly one at
//! a time in arrival order; different keys run concurrently up to a global
//! ceiling.

pub mod executor;
pub mod platform;
pub mod retry;
pub mod testing;
pub mod types;

pub use executor::{ActionExecutor, ExecutorConfig};
pub use platform::{issue, Platform, RemoteError};
pub use retry::{run_with_retry, RetryPolicy};
pub use types::*;
