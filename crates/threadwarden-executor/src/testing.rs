//! In-memory `Platform` that records every call.
//!
//! Used by this crate's tests and by the runtime scenario tests. Failures are
//! scripted in call order; an optional latency keeps calls in flight long
//! enough to observe overlap.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};

use threadwarden_core::UserId;
use threadwarden_reconcile::{CorrectiveAction, ResourceKey};

use crate::platform::{Platform, RemoteError};

#[derive(Default)]
struct Inner {
    calls: Vec<(CorrectiveAction, Instant)>,
    script: VecDeque<Option<RemoteError>>,
    members: HashMap<String, Vec<UserId>>,
    members_error: Option<RemoteError>,
    typing: Vec<(String, bool)>,
    in_flight: HashMap<ResourceKey, usize>,
    max_per_key: HashMap<ResourceKey, usize>,
    total_in_flight: usize,
    max_total: usize,
}

/// Recording fake platform.
#[derive(Default)]
pub struct RecordingPlatform {
    latency: Duration,
    roster_latency: Duration,
    inner: Mutex<Inner>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutating call takes `latency` to complete.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// `list_members` takes `latency` to answer.
    pub fn with_roster_latency(mut self, latency: Duration) -> Self {
        self.roster_latency = latency;
        self
    }

    /// Queue results for the next mutating calls, in order. `None` is a
    /// success; once the script runs out every call succeeds.
    pub fn script<I>(&self, results: I)
    where
        I: IntoIterator<Item = Option<RemoteError>>,
    {
        self.inner.lock().script.extend(results);
    }

    pub fn set_members(&self, thread_id: &str, members: &[&str]) {
        self.inner.lock().members.insert(
            thread_id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub fn fail_members(&self, error: RemoteError) {
        self.inner.lock().members_error = Some(error);
    }

    /// Mutating calls in the order they started.
    pub fn calls(&self) -> Vec<CorrectiveAction> {
        self.inner.lock().calls.iter().map(|(a, _)| a.clone()).collect()
    }

    /// Mutating calls with their start time.
    pub fn timed_calls(&self) -> Vec<(CorrectiveAction, Instant)> {
        self.inner.lock().calls.clone()
    }

    pub fn count(&self, action: &CorrectiveAction) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|(a, _)| a == action)
            .count()
    }

    pub fn typing_calls(&self) -> Vec<(String, bool)> {
        self.inner.lock().typing.clone()
    }

    /// Highest number of simultaneous calls seen on one key.
    pub fn max_in_flight_for(&self, key: &ResourceKey) -> usize {
        self.inner.lock().max_per_key.get(key).copied().unwrap_or(0)
    }

    /// Highest number of simultaneous calls seen overall.
    pub fn max_in_flight(&self) -> usize {
        self.inner.lock().max_total
    }

    async fn perform(&self, action: CorrectiveAction) -> Result<(), RemoteError> {
        let key = action.resource_key();
        let scripted = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            inner.calls.push((action, Instant::now()));

            let now = {
                let count = inner.in_flight.entry(key.clone()).or_insert(0);
                *count += 1;
                *count
            };
            let max = inner.max_per_key.entry(key.clone()).or_insert(0);
            *max = (*max).max(now);
            inner.total_in_flight += 1;
            inner.max_total = inner.max_total.max(inner.total_in_flight);

            inner.script.pop_front().flatten()
        };

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if let Some(count) = inner.in_flight.get_mut(&key) {
                *count -= 1;
            }
            inner.total_in_flight -= 1;
        }

        match scripted {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn set_title(&self, thread_id: &str, title: &str) -> Result<(), RemoteError> {
        self.perform(CorrectiveAction::SetTitle {
            thread_id: thread_id.to_string(),
            title: title.to_string(),
        })
        .await
    }

    async fn set_nickname(
        &self,
        thread_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), RemoteError> {
        self.perform(CorrectiveAction::SetNickname {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
        })
        .await
    }

    async fn add_member(&self, thread_id: &str, user_id: &str) -> Result<(), RemoteError> {
        self.perform(CorrectiveAction::ReAddMember {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
        })
        .await
    }

    async fn send_message(&self, thread_id: &str, text: &str) -> Result<(), RemoteError> {
        self.perform(CorrectiveAction::notify(thread_id, text)).await
    }

    async fn list_members(&self, thread_id: &str) -> Result<Vec<UserId>, RemoteError> {
        let result = {
            let inner = self.inner.lock();
            match &inner.members_error {
                Some(e) => Err(e.clone()),
                None => Ok(inner.members.get(thread_id).cloned().unwrap_or_default()),
            }
        };
        if !self.roster_latency.is_zero() {
            sleep(self.roster_latency).await;
        }
        result
    }

    async fn send_typing(&self, thread_id: &str, typing: bool) -> Result<(), RemoteError> {
        self.inner.lock().typing.push((thread_id.to_string(), typing));
        Ok(())
    }
}
