//! Corrective actions and the resource keys they are serialized on.

use std::fmt;

use serde::{Deserialize, Serialize};

use threadwarden_core::{ThreadId, UserId};

/// An outbound platform command restoring a governed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CorrectiveAction {
    SetTitle {
        thread_id: ThreadId,
        title: String,
    },
    SetNickname {
        thread_id: ThreadId,
        user_id: UserId,
        nickname: String,
    },
    ReAddMember {
        thread_id: ThreadId,
        user_id: UserId,
    },
    Notify {
        thread_id: ThreadId,
        text: String,
    },
}

/// The remote resource an action touches. Actions on the same key never run
/// concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ResourceKey {
    Title { thread_id: ThreadId },
    /// Nickname and membership of one member.
    Member { thread_id: ThreadId, user_id: UserId },
    /// Operator-facing messages in one thread, kept in order.
    Notice { thread_id: ThreadId },
}

impl CorrectiveAction {
    pub fn notify(thread_id: impl Into<ThreadId>, text: impl Into<String>) -> Self {
        Self::Notify {
            thread_id: thread_id.into(),
            text: text.into(),
        }
    }

    pub fn thread_id(&self) -> &str {
        match self {
            Self::SetTitle { thread_id, .. }
            | Self::SetNickname { thread_id, .. }
            | Self::ReAddMember { thread_id, .. }
            | Self::Notify { thread_id, .. } => thread_id,
        }
    }

    pub fn resource_key(&self) -> ResourceKey {
        match self {
            Self::SetTitle { thread_id, .. } => ResourceKey::Title {
                thread_id: thread_id.clone(),
            },
            Self::SetNickname {
                thread_id, user_id, ..
            }
            | Self::ReAddMember { thread_id, user_id } => ResourceKey::Member {
                thread_id: thread_id.clone(),
                user_id: user_id.clone(),
            },
            Self::Notify { thread_id, .. } => ResourceKey::Notice {
                thread_id: thread_id.clone(),
            },
        }
    }

    /// Whether issuing the action twice has the same effect as once.
    /// A notice posted twice shows up twice.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Self::Notify { .. })
    }

    pub fn is_notify(&self) -> bool {
        matches!(self, Self::Notify { .. })
    }
}

impl fmt::Display for CorrectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetTitle { thread_id, title } => {
                write!(f, "set_title({}, {:?})", thread_id, title)
            }
            Self::SetNickname {
                thread_id,
                user_id,
                nickname,
            } => write!(f, "set_nickname({}, {}, {:?})", thread_id, user_id, nickname),
            Self::ReAddMember { thread_id, user_id } => {
                write!(f, "re_add_member({}, {})", thread_id, user_id)
            }
            Self::Notify { thread_id, .. } => write!(f, "notify({})", thread_id),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title { thread_id } => write!(f, "title:{}", thread_id),
            Self::Member { thread_id, user_id } => write!(f, "member:{}:{}", thread_id, user_id),
            Self::Notice { thread_id } => write!(f, "notice:{}", thread_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_and_membership_share_a_key() {
        let nick = CorrectiveAction::SetNickname {
            thread_id: "t1".into(),
            user_id: "u1".into(),
            nickname: "Bob".into(),
        };
        let readd = CorrectiveAction::ReAddMember {
            thread_id: "t1".into(),
            user_id: "u1".into(),
        };
        assert_eq!(nick.resource_key(), readd.resource_key());

        let other_user = CorrectiveAction::ReAddMember {
            thread_id: "t1".into(),
            user_id: "u2".into(),
        };
        assert_ne!(nick.resource_key(), other_user.resource_key());
    }

    #[test]
    fn test_title_key_ignores_value() {
        let a = CorrectiveAction::SetTitle {
            thread_id: "t1".into(),
            title: "Alpha".into(),
        };
        let b = CorrectiveAction::SetTitle {
            thread_id: "t1".into(),
            title: String::new(),
        };
        assert_eq!(a.resource_key(), b.resource_key());
        assert_eq!(a.resource_key().to_string(), "title:t1");
    }

    #[test]
    fn test_only_notify_is_not_idempotent() {
        assert!(!CorrectiveAction::notify("t1", "hi").is_idempotent());
        assert!(CorrectiveAction::ReAddMember {
            thread_id: "t1".into(),
            user_id: "u1".into(),
        }
        .is_idempotent());
    }
}
