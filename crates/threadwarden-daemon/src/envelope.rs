//! Line protocol: one JSON envelope per stdin line, one JSON reply per
//! stdout line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use threadwarden_core::ThreadId;
use threadwarden_runtime::EngineStatus;
use threadwarden_store::{Command, ThreadPolicy};

/// Inbound line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Envelope {
    /// Raw platform notification, passed to the engine untouched.
    Notification { payload: Value },
    /// Pre-authorized operator command.
    Command { payload: Command },
    /// Ask for a thread's policy and engine counters.
    Status { thread_id: ThreadId },
}

/// Outbound line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Reply {
    Policy {
        policy: ThreadPolicy,
    },
    Status {
        thread_id: ThreadId,
        text: String,
        engine: EngineStatus,
    },
    Error {
        message: String,
    },
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Envelope>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_line("   \n").unwrap(), None);
    }

    #[test]
    fn test_notification_payload_is_kept_raw() {
        let line = r#"{"kind":"notification","payload":{"type":"event","threadID":42}}"#;
        let envelope = parse_line(line).unwrap().unwrap();
        assert_eq!(
            envelope,
            Envelope::Notification {
                payload: json!({"type": "event", "threadID": 42})
            }
        );
    }

    #[test]
    fn test_command() {
        let line = r#"{"kind":"command","payload":{"type":"lockTitle","threadId":"t","title":"X"}}"#;
        assert_eq!(
            parse_line(line).unwrap().unwrap(),
            Envelope::Command {
                payload: Command::LockTitle {
                    thread_id: "t".into(),
                    title: "X".into(),
                }
            }
        );
    }

    #[test]
    fn test_single_nickname_command() {
        let line = r#"{"kind":"command","payload":{"type":"setSingleNickname","threadId":"t","userId":"u1","nickname":"Bob"}}"#;
        assert!(matches!(
            parse_line(line).unwrap(),
            Some(Envelope::Command {
                payload: Command::SetSingleNickname { .. }
            })
        ));
    }

    #[test]
    fn test_status() {
        assert_eq!(
            parse_line(r#"{"kind":"status","threadId":"t1"}"#).unwrap(),
            Some(Envelope::Status {
                thread_id: "t1".into()
            })
        );
    }

    #[test]
    fn test_rejects_unknown_kind_and_command() {
        assert!(parse_line(r#"{"kind":"reboot"}"#).is_err());
        assert!(parse_line(r#"{"kind":"command","payload":{"type":"banEveryone","threadId":"t"}}"#).is_err());
        assert!(parse_line("not json").is_err());
    }

    #[test]
    fn test_reply_shape() {
        let reply = Reply::Error {
            message: "nope".into(),
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"kind": "error", "message": "nope"})
        );
    }
}
