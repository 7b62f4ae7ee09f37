//! Notification normalizer.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{Drift, IngestStats, MalformedEvent};

/// Platform notification types that never describe drift.
const NON_DRIFT_TYPES: &[&str] = &[
    "message",
    "message_reply",
    "message_reaction",
    "typ",
    "read",
    "read_receipt",
    "presence",
];

/// Log event types that describe changes nobody governs.
const UNGOVERNED_LOG_TYPES: &[&str] = &[
    "log:subscribe",
    "log:thread-color",
    "log:thread-icon",
    "log:thread-image",
    "log:thread-admins",
    "log:thread-approval-mode",
    "log:thread-poll",
    "log:thread-call",
];

/// Turns raw notifications into drift, one at a time, in arrival order.
#[derive(Debug, Default)]
pub struct EventIngestor {
    stats: IngestStats,
}

impl EventIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Normalize one notification. Never fails: malformed input is counted,
    /// logged and dropped.
    pub fn ingest(&mut self, raw: &Value) -> Option<Drift> {
        match parse_notification(raw) {
            Ok(Some(drift)) => {
                self.stats.accepted += 1;
                debug!(
                    "Drift {} on thread {}",
                    drift.kind(),
                    drift.thread_id()
                );
                Some(drift)
            }
            Ok(None) => {
                self.stats.ignored += 1;
                None
            }
            Err(e) => {
                self.stats.rejected += 1;
                warn!("Discarding notification: {}", e);
                None
            }
        }
    }

    /// Normalize a batch, preserving order.
    pub fn ingest_all<'a, I>(&mut self, raws: I) -> Vec<Drift>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        raws.into_iter().filter_map(|raw| self.ingest(raw)).collect()
    }
}

/// `Ok(None)` means a well-formed notification that is not drift.
pub fn parse_notification(raw: &Value) -> Result<Option<Drift>, MalformedEvent> {
    let obj = raw.as_object().ok_or(MalformedEvent::NotAnObject)?;

    if obj.contains_key("changedAttribute") {
        return parse_normalized(raw);
    }

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(MalformedEvent::MissingField("type"))?;

    match kind {
        "event" => parse_log_event(raw),
        "message_unsend" => {
            let thread_id = id_field(raw, &["threadID", "threadId"])
                .ok_or(MalformedEvent::MissingField("threadID"))?;
            let message_id = id_field(raw, &["messageID", "messageId"])
                .ok_or(MalformedEvent::MissingField("messageID"))?;
            let actor_id = id_field(raw, &["senderID", "senderId"]).unwrap_or_default();
            Ok(Some(Drift::MessageUnsent {
                thread_id,
                message_id,
                actor_id,
            }))
        }
        k if NON_DRIFT_TYPES.contains(&k) => Ok(None),
        other => Err(MalformedEvent::UnknownType(other.to_string())),
    }
}

/// `{threadId, actorId, changedAttribute, newValue[, userId]}`.
fn parse_normalized(raw: &Value) -> Result<Option<Drift>, MalformedEvent> {
    let thread_id =
        id_field(raw, &["threadId"]).ok_or(MalformedEvent::MissingField("threadId"))?;
    let attribute = raw
        .get("changedAttribute")
        .and_then(Value::as_str)
        .ok_or(MalformedEvent::MissingField("changedAttribute"))?;
    let subject = || {
        id_field(raw, &["userId", "actorId"]).ok_or(MalformedEvent::MissingField("userId"))
    };

    let drift = match attribute {
        "title" => Drift::TitleChanged {
            thread_id,
            new_title: text_field(raw, "newValue"),
        },
        "nickname" => Drift::NicknameChanged {
            thread_id,
            user_id: subject()?,
            new_nickname: text_field(raw, "newValue"),
        },
        "membership" => match raw.get("newValue") {
            None | Some(Value::Null) => Drift::MemberLeft {
                thread_id,
                user_id: subject()?,
            },
            Some(Value::String(change)) if change == "left" || change == "removed" => {
                Drift::MemberLeft {
                    thread_id,
                    user_id: subject()?,
                }
            }
            // joins are not drift
            Some(Value::String(_)) => return Ok(None),
            Some(_) => return Err(MalformedEvent::InvalidField("newValue")),
        },
        "unsend" => Drift::MessageUnsent {
            thread_id,
            message_id: id_field(raw, &["newValue"])
                .ok_or(MalformedEvent::MissingField("newValue"))?,
            actor_id: id_field(raw, &["actorId"]).unwrap_or_default(),
        },
        other => return Err(MalformedEvent::UnknownAttribute(other.to_string())),
    };
    Ok(Some(drift))
}

/// `{type: "event", threadID, logMessageType, logMessageData}`.
fn parse_log_event(raw: &Value) -> Result<Option<Drift>, MalformedEvent> {
    let thread_id = id_field(raw, &["threadID", "threadId"])
        .ok_or(MalformedEvent::MissingField("threadID"))?;
    let log_type = raw
        .get("logMessageType")
        .and_then(Value::as_str)
        .ok_or(MalformedEvent::MissingField("logMessageType"))?;
    let data = raw.get("logMessageData").unwrap_or(&Value::Null);

    let drift = match log_type {
        "log:thread-name" => Drift::TitleChanged {
            thread_id,
            new_title: text_field(data, "name"),
        },
        "log:user-nickname" => Drift::NicknameChanged {
            thread_id,
            user_id: id_field(data, &["participant_id", "participantID"])
                .ok_or(MalformedEvent::MissingField("participant_id"))?,
            new_nickname: text_field(data, "nickname"),
        },
        "log:unsubscribe" => Drift::MemberLeft {
            thread_id,
            user_id: id_field(data, &["leftParticipantFbId", "leftParticipantId"])
                .ok_or(MalformedEvent::MissingField("leftParticipantFbId"))?,
        },
        t if UNGOVERNED_LOG_TYPES.contains(&t) => return Ok(None),
        other => return Err(MalformedEvent::UnknownLogType(other.to_string())),
    };
    Ok(Some(drift))
}

/// First present key among `keys`, as a string. Numeric ids are stringified;
/// empty strings count as absent.
fn id_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Text attribute; absent or null means "cleared".
fn text_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
