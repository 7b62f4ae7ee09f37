//! Keyed policy store.

use std::collections::HashMap;

use tracing::{debug, info};

use threadwarden_core::ThreadId;

use crate::types::{Command, InvariantError, ThreadPolicy};

/// Holds one `ThreadPolicy` per governed thread.
#[derive(Debug, Default)]
pub struct DesiredStateStore {
    policies: HashMap<ThreadId, ThreadPolicy>,
}

impl DesiredStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for a thread, or an empty one if the thread was never governed.
    pub fn get(&self, thread_id: &str) -> ThreadPolicy {
        self.policies
            .get(thread_id)
            .cloned()
            .unwrap_or_else(|| ThreadPolicy::new(thread_id))
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.policies.contains_key(thread_id)
    }

    /// Ids of all threads holding a policy, sorted.
    pub fn threads(&self) -> Vec<ThreadId> {
        let mut ids: Vec<ThreadId> = self.policies.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Apply a command and return the resulting policy.
    ///
    /// The new policy is built on a copy and committed only after it passes
    /// `check_invariants`, so an error leaves the store untouched.
    pub fn apply(&mut self, command: &Command) -> Result<ThreadPolicy, InvariantError> {
        let thread_id = command.thread_id();
        if thread_id.is_empty() {
            return Err(InvariantError::EmptyThreadId);
        }

        if let Command::Reset { .. } = command {
            let existed = self.policies.remove(thread_id).is_some();
            info!(thread_id, existed, "Policy reset");
            return Ok(ThreadPolicy::new(thread_id));
        }

        let mut next = self.get(thread_id);
        next.apply_command(command)?;
        next.check_invariants()?;

        debug!(thread_id, command = command.name(), "Policy updated");
        self.policies.insert(thread_id.to_string(), next.clone());
        Ok(next)
    }
}
