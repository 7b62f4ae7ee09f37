//! Platform that only logs what it would do.
//!
//! Lets the daemon run without a chat session: every call succeeds and is
//! written to the log.

use async_trait::async_trait;
use tracing::info;

use threadwarden_core::UserId;
use threadwarden_executor::{Platform, RemoteError};

/// Succeeds at everything. The member list is always empty, so nickname
/// locks are only enforced through drift.
#[derive(Debug, Default)]
pub struct DryRunPlatform;

#[async_trait]
impl Platform for DryRunPlatform {
    async fn set_title(&self, thread_id: &str, title: &str) -> Result<(), RemoteError> {
        info!("[dry-run] {}: set title {:?}", thread_id, title);
        Ok(())
    }

    async fn set_nickname(
        &self,
        thread_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), RemoteError> {
        info!("[dry-run] {}: set nickname of {} to {:?}", thread_id, user_id, nickname);
        Ok(())
    }

    async fn add_member(&self, thread_id: &str, user_id: &str) -> Result<(), RemoteError> {
        info!("[dry-run] {}: add {}", thread_id, user_id);
        Ok(())
    }

    async fn send_message(&self, thread_id: &str, text: &str) -> Result<(), RemoteError> {
        info!("[dry-run] {}: say {:?}", thread_id, text);
        Ok(())
    }

    async fn list_members(&self, thread_id: &str) -> Result<Vec<UserId>, RemoteError> {
        info!("[dry-run] {}: no member list available", thread_id);
        Ok(Vec::new())
    }

    async fn send_typing(&self, thread_id: &str, typing: bool) -> Result<(), RemoteError> {
        info!("[dry-run] {}: typing={}", thread_id, typing);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_everything_succeeds() {
        let platform = DryRunPlatform;
        assert!(platform.set_title("t1", "Alpha").await.is_ok());
        assert!(platform.set_nickname("t1", "u1", "Bob").await.is_ok());
        assert!(platform.add_member("t1", "u2").await.is_ok());
        assert!(platform.send_message("t1", "hi").await.is_ok());
        assert!(platform.list_members("t1").await.unwrap().is_empty());
    }
}
