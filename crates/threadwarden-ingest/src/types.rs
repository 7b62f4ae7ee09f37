//! Drift and ingestion types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use threadwarden_core::{ThreadId, UserId};

/// An observed attribute change reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Drift {
    TitleChanged {
        thread_id: ThreadId,
        new_title: String,
    },
    NicknameChanged {
        thread_id: ThreadId,
        user_id: UserId,
        new_nickname: String,
    },
    MemberLeft {
        thread_id: ThreadId,
        user_id: UserId,
    },
    MessageUnsent {
        thread_id: ThreadId,
        message_id: String,
        actor_id: UserId,
    },
}

impl Drift {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::TitleChanged { thread_id, .. }
            | Self::NicknameChanged { thread_id, .. }
            | Self::MemberLeft { thread_id, .. }
            | Self::MessageUnsent { thread_id, .. } => thread_id,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TitleChanged { .. } => "title_changed",
            Self::NicknameChanged { .. } => "nickname_changed",
            Self::MemberLeft { .. } => "member_left",
            Self::MessageUnsent { .. } => "message_unsent",
        }
    }
}

/// Why a notification could not be turned into a drift.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEvent {
    #[error("notification is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` has an unexpected type")]
    InvalidField(&'static str),

    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    #[error("unknown log message type `{0}`")]
    UnknownLogType(String),

    #[error("unrecognized notification type `{0}`")]
    UnknownType(String),
}

/// Running ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Notifications that produced a drift.
    pub accepted: u64,
    /// Notifications that are not drift (chat messages, typing, presence).
    pub ignored: u64,
    /// Malformed or unrecognized notifications.
    pub rejected: u64,
}
