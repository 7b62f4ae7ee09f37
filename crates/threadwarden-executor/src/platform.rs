//! The remote platform seam.

use async_trait::async_trait;
use thiserror::Error;

use threadwarden_core::UserId;
use threadwarden_reconcile::CorrectiveAction;

/// Failure of one remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failure, rate limiting, timeouts. Worth another attempt.
    #[error("transient: {0}")]
    Transient(String),

    /// Permission denied, unknown thread, and the like. Never retried.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl RemoteError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

/// Outbound calls the engine makes against the chat platform.
///
/// Session handling, transport and proxies live behind implementations of
/// this trait.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn set_title(&self, thread_id: &str, title: &str) -> Result<(), RemoteError>;

    async fn set_nickname(
        &self,
        thread_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), RemoteError>;

    async fn add_member(&self, thread_id: &str, user_id: &str) -> Result<(), RemoteError>;

    async fn send_message(&self, thread_id: &str, text: &str) -> Result<(), RemoteError>;

    /// Current members of a thread.
    async fn list_members(&self, thread_id: &str) -> Result<Vec<UserId>, RemoteError>;

    /// Liveness pulse: toggle the typing indicator.
    async fn send_typing(&self, thread_id: &str, typing: bool) -> Result<(), RemoteError>;
}

/// Issue one attempt of `action`.
pub async fn issue(platform: &dyn Platform, action: &CorrectiveAction) -> Result<(), RemoteError> {
    match action {
        CorrectiveAction::SetTitle { thread_id, title } => {
            platform.set_title(thread_id, title).await
        }
        CorrectiveAction::SetNickname {
            thread_id,
            user_id,
            nickname,
        } => platform.set_nickname(thread_id, user_id, nickname).await,
        CorrectiveAction::ReAddMember { thread_id, user_id } => {
            platform.add_member(thread_id, user_id).await
        }
        CorrectiveAction::Notify { thread_id, text } => {
            platform.send_message(thread_id, text).await
        }
    }
}
