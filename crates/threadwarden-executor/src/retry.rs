//! Bounded, fixed-delay attempt loop.

use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use threadwarden_core::WardenConfig;
use threadwarden_reconcile::CorrectiveAction;

use crate::platform::{issue, Platform};
use crate::types::Outcome;

/// How many times an action is issued and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub attempts: u32,
    /// Fixed pause before every attempt after the first.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &WardenConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_delay())
    }
}

impl Default for RetryPolicy {
    /// Issue twice, 1.5 s apart.
    fn default() -> Self {
        Self::new(2, Duration::from_millis(1500))
    }
}

/// Run `action` under `policy` and return `(attempts issued, outcome)`.
///
/// Idempotent actions are issued on every attempt whatever the previous
/// result. A `Notify` stops after its first success, since posting it again
/// would duplicate the message. A permanent error ends the loop at once; the
/// outcome is `Rejected` unless an earlier attempt had already succeeded.
///
/// `gate` bounds remote calls across the whole executor; a permit is held
/// only for the call itself, not across the delay.
pub async fn run_with_retry(
    platform: &dyn Platform,
    action: &CorrectiveAction,
    policy: &RetryPolicy,
    gate: &Semaphore,
) -> (u32, Outcome) {
    let mut issued = 0;
    let mut applied = false;
    let mut last_error = None;

    for attempt in 1..=policy.attempts {
        if attempt > 1 {
            if applied && !action.is_idempotent() {
                break;
            }
            sleep(policy.delay).await;
        }

        let result = {
            let _permit = gate.acquire().await.ok();
            issue(platform, action).await
        };
        issued = attempt;

        match result {
            Ok(()) => {
                debug!("{} attempt {} ok", action, attempt);
                applied = true;
            }
            Err(e) if e.is_permanent() && applied => {
                // An earlier attempt already went through
                warn!("{} refused on attempt {} after applying: {}", action, attempt, e);
                break;
            }
            Err(e) if e.is_permanent() => {
                error!("{} refused on attempt {}: {}", action, attempt, e);
                return (
                    issued,
                    Outcome::Rejected {
                        error: e.to_string(),
                    },
                );
            }
            Err(e) => {
                warn!("{} attempt {} failed: {}", action, attempt, e);
                last_error = Some(e);
            }
        }
    }

    if applied {
        (issued, Outcome::Applied)
    } else {
        let error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        (issued, Outcome::Abandoned { error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RemoteError;
    use crate::testing::RecordingPlatform;

    fn set_title() -> CorrectiveAction {
        CorrectiveAction::SetTitle {
            thread_id: "t1".into(),
            title: "Alpha".into(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(500))
    }

    #[test]
    fn test_policy_clamps_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
        assert_eq!(RetryPolicy::default().attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_issued_twice_with_delay() {
        let platform = RecordingPlatform::new();
        let gate = Semaphore::new(1);

        let (attempts, outcome) = run_with_retry(&platform, &set_title(), &policy(), &gate).await;
        assert_eq!(attempts, 2);
        assert_eq!(outcome, Outcome::Applied);

        let calls = platform.timed_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, set_title());
        assert_eq!(calls[1].0, set_title());
        assert!(calls[1].1 - calls[0].1 >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_absorbed_by_second_attempt() {
        let platform = RecordingPlatform::new();
        platform.script([Some(RemoteError::Transient("rate limited".into())), None]);

        let (attempts, outcome) =
            run_with_retry(&platform, &set_title(), &policy(), &Semaphore::new(1)).await;
        assert_eq!(attempts, 2);
        assert_eq!(outcome, Outcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_does_not_undo_success() {
        let platform = RecordingPlatform::new();
        platform.script([None, Some(RemoteError::Transient("timeout".into()))]);

        let (_, outcome) =
            run_with_retry(&platform, &set_title(), &policy(), &Semaphore::new(1)).await;
        assert_eq!(outcome, Outcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_refusal_after_success_stays_applied() {
        let platform = RecordingPlatform::new();
        platform.script([None, Some(RemoteError::Permanent("denied".into()))]);

        let (attempts, outcome) =
            run_with_retry(&platform, &set_title(), &policy(), &Semaphore::new(1)).await;
        assert_eq!(attempts, 2);
        assert_eq!(outcome, Outcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_transient_failures_abandon() {
        let platform = RecordingPlatform::new();
        platform.script([
            Some(RemoteError::Transient("down".into())),
            Some(RemoteError::Transient("still down".into())),
        ]);

        let (attempts, outcome) =
            run_with_retry(&platform, &set_title(), &policy(), &Semaphore::new(1)).await;
        assert_eq!(attempts, 2);
        assert_eq!(
            outcome,
            Outcome::Abandoned {
                error: "transient: still down".into()
            }
        );
        // Bounded: nothing after the last attempt
        assert_eq!(platform.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let platform = RecordingPlatform::new();
        platform.script([Some(RemoteError::Permanent("not an admin".into()))]);

        let (attempts, outcome) =
            run_with_retry(&platform, &set_title(), &policy(), &Semaphore::new(1)).await;
        assert_eq!(attempts, 1);
        assert!(matches!(outcome, Outcome::Rejected { .. }));
        assert_eq!(platform.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_posts_once_on_success() {
        let platform = RecordingPlatform::new();
        let notify = CorrectiveAction::notify("t1", "hello");

        let (attempts, outcome) =
            run_with_retry(&platform, &notify, &policy(), &Semaphore::new(1)).await;
        assert_eq!(attempts, 1);
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(platform.calls(), vec![notify]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_retries_after_transient_failure() {
        let platform = RecordingPlatform::new();
        platform.script([Some(RemoteError::Transient("blip".into()))]);
        let notify = CorrectiveAction::notify("t1", "hello");

        let (attempts, outcome) =
            run_with_retry(&platform, &notify, &policy(), &Semaphore::new(1)).await;
        assert_eq!(attempts, 2);
        assert_eq!(outcome, Outcome::Applied);
    }
}
