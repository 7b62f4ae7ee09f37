//! Policy and command types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use threadwarden_core::{ThreadId, UserId};

/// Operator-declared target configuration for one thread.
///
/// On each axis (title, nickname) at most one of "locked value" and
/// "auto-clear" is active. `DesiredStateStore::apply` keeps it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPolicy {
    pub thread_id: ThreadId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_title: Option<String>,
    #[serde(default)]
    pub title_auto_clear: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_nickname: Option<String>,
    #[serde(default)]
    pub nickname_auto_clear: bool,
    #[serde(default)]
    pub anti_out_enabled: bool,
}

impl ThreadPolicy {
    /// Empty policy: nothing governed.
    pub fn new(thread_id: impl Into<ThreadId>) -> Self {
        Self {
            thread_id: thread_id.into(),
            locked_title: None,
            title_auto_clear: false,
            locked_nickname: None,
            nickname_auto_clear: false,
            anti_out_enabled: false,
        }
    }

    /// Whether any attribute of the thread is governed.
    pub fn is_governed(&self) -> bool {
        self.locked_title.is_some()
            || self.title_auto_clear
            || self.locked_nickname.is_some()
            || self.nickname_auto_clear
            || self.anti_out_enabled
    }

    /// Apply a command in place. Resets are handled by the store.
    pub(crate) fn apply_command(&mut self, command: &Command) -> Result<(), InvariantError> {
        match command {
            Command::LockTitle { title, .. } => {
                if title.trim().is_empty() {
                    return Err(InvariantError::EmptyTitle(self.thread_id.clone()));
                }
                self.locked_title = Some(title.clone());
                self.title_auto_clear = false;
            }
            Command::ClearTitleLockEnableAutoRemove { .. } => {
                self.locked_title = None;
                self.title_auto_clear = true;
            }
            Command::LockNickname { nickname, .. } => {
                if nickname.trim().is_empty() {
                    return Err(InvariantError::EmptyNickname(self.thread_id.clone()));
                }
                self.locked_nickname = Some(nickname.clone());
                self.nickname_auto_clear = false;
            }
            Command::UnlockNickname { .. } => {
                self.locked_nickname = None;
            }
            Command::ClearAllNicknamesEnableAutoRemove { .. } => {
                self.locked_nickname = None;
                self.nickname_auto_clear = true;
            }
            Command::StopNicknameAutoRemove { .. } => {
                self.nickname_auto_clear = false;
            }
            Command::SetSingleNickname { user_id, .. } => {
                if user_id.is_empty() {
                    return Err(InvariantError::EmptyUserId(self.thread_id.clone()));
                }
            }
            Command::EnableAntiOut { .. } => self.anti_out_enabled = true,
            Command::DisableAntiOut { .. } => self.anti_out_enabled = false,
            Command::Reset { .. } => *self = ThreadPolicy::new(self.thread_id.clone()),
        }
        Ok(())
    }

    /// Reject a policy where a lock and auto-clear are both active on one axis.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.locked_title.is_some() && self.title_auto_clear {
            return Err(InvariantError::ConflictingTitlePolicy(self.thread_id.clone()));
        }
        if self.locked_nickname.is_some() && self.nickname_auto_clear {
            return Err(InvariantError::ConflictingNicknamePolicy(
                self.thread_id.clone(),
            ));
        }
        Ok(())
    }

    /// Human-readable status block posted back to operators.
    pub fn status_text(&self) -> String {
        let on_off = |flag: bool| if flag { "ON" } else { "OFF" };
        let title_lock = self.locked_title.as_deref().unwrap_or("OFF");
        let nick_lock = match &self.locked_nickname {
            Some(nick) => format!("ON ({})", nick),
            None => "OFF".to_string(),
        };
        format!(
            "THREAD STATUS ({}):\n\
             • Title lock: {}\n\
             • Title auto-remove: {}\n\
             • Nickname lock: {}\n\
             • Nickname auto-remove: {}\n\
             • Anti-out: {}",
            self.thread_id,
            title_lock,
            on_off(self.title_auto_clear),
            nick_lock,
            on_off(self.nickname_auto_clear),
            on_off(self.anti_out_enabled),
        )
    }
}

/// A pre-authorized operator instruction, scoped to one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    LockTitle { thread_id: ThreadId, title: String },
    ClearTitleLockEnableAutoRemove { thread_id: ThreadId },
    LockNickname { thread_id: ThreadId, nickname: String },
    UnlockNickname { thread_id: ThreadId },
    ClearAllNicknamesEnableAutoRemove { thread_id: ThreadId },
    StopNicknameAutoRemove { thread_id: ThreadId },
    SetSingleNickname {
        thread_id: ThreadId,
        user_id: UserId,
        nickname: String,
    },
    EnableAntiOut { thread_id: ThreadId },
    DisableAntiOut { thread_id: ThreadId },
    /// Forget the thread's policy entirely.
    Reset { thread_id: ThreadId },
}

impl Command {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::LockTitle { thread_id, .. }
            | Self::ClearTitleLockEnableAutoRemove { thread_id }
            | Self::LockNickname { thread_id, .. }
            | Self::UnlockNickname { thread_id }
            | Self::ClearAllNicknamesEnableAutoRemove { thread_id }
            | Self::StopNicknameAutoRemove { thread_id }
            | Self::SetSingleNickname { thread_id, .. }
            | Self::EnableAntiOut { thread_id }
            | Self::DisableAntiOut { thread_id }
            | Self::Reset { thread_id } => thread_id,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LockTitle { .. } => "lock_title",
            Self::ClearTitleLockEnableAutoRemove { .. } => "clear_title_auto_remove",
            Self::LockNickname { .. } => "lock_nickname",
            Self::UnlockNickname { .. } => "unlock_nickname",
            Self::ClearAllNicknamesEnableAutoRemove { .. } => "clear_nicknames_auto_remove",
            Self::StopNicknameAutoRemove { .. } => "stop_nickname_auto_remove",
            Self::SetSingleNickname { .. } => "set_single_nickname",
            Self::EnableAntiOut { .. } => "enable_anti_out",
            Self::DisableAntiOut { .. } => "disable_anti_out",
            Self::Reset { .. } => "reset",
        }
    }
}

/// A command that would leave the store in an invalid state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("command has no thread id")]
    EmptyThreadId,

    #[error("thread {0}: title lock needs a non-empty title")]
    EmptyTitle(ThreadId),

    #[error("thread {0}: nickname lock needs a non-empty nickname")]
    EmptyNickname(ThreadId),

    #[error("thread {0}: nickname change needs a user id")]
    EmptyUserId(ThreadId),

    #[error("thread {0}: title lock and title auto-remove are both active")]
    ConflictingTitlePolicy(ThreadId),

    #[error("thread {0}: nickname lock and nickname auto-remove are both active")]
    ConflictingNicknamePolicy(ThreadId),
}
