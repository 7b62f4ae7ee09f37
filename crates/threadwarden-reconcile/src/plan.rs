//! First-time application of a freshly applied command.
//!
//! Locking a value only prevents future drift; the current value still has to
//! be brought in line once. These plans do that, and tell the operator.

use tracing::debug;

use threadwarden_core::UserId;
use threadwarden_store::{Command, ThreadPolicy};

use crate::action::CorrectiveAction;

/// Whether `plan_command` needs the thread's current member list.
pub fn needs_roster(command: &Command) -> bool {
    matches!(
        command,
        Command::LockNickname { .. } | Command::ClearAllNicknamesEnableAutoRemove { .. }
    )
}

/// Actions that apply `command` immediately. `members` is the roster for
/// commands where `needs_roster` holds.
///
/// `policy` is the thread's current policy. A lock or auto-clear command it no
/// longer reflects has been superseded by a later command and plans nothing;
/// this happens when the roster arrives after the operator changed their mind.
pub fn plan_command(
    policy: &ThreadPolicy,
    command: &Command,
    members: &[UserId],
) -> Vec<CorrectiveAction> {
    if is_superseded(policy, command) {
        debug!(
            "Command {} on {} superseded before it could be applied",
            command.name(),
            command.thread_id()
        );
        return Vec::new();
    }

    let thread_id = command.thread_id().to_string();
    let notify = |text: String| CorrectiveAction::notify(thread_id.clone(), text);

    match command {
        Command::LockTitle { title, .. } => vec![
            CorrectiveAction::SetTitle {
                thread_id: thread_id.clone(),
                title: title.clone(),
            },
            notify(format!("🔒 Title locked as \"{}\"", title)),
        ],
        Command::ClearTitleLockEnableAutoRemove { .. } => vec![
            CorrectiveAction::SetTitle {
                thread_id: thread_id.clone(),
                title: String::new(),
            },
            notify("🧹 Title removed. Auto-remove ON".to_string()),
        ],
        Command::LockNickname { nickname, .. } => {
            let mut actions = set_all_nicknames(&thread_id, members, nickname);
            actions.push(notify(format!(
                "🔐 Nickname locked as \"{}\" for {} members",
                nickname,
                members.len()
            )));
            actions
        }
        Command::ClearAllNicknamesEnableAutoRemove { .. } => {
            let mut actions = set_all_nicknames(&thread_id, members, "");
            actions.push(notify(
                "💥 All nicknames cleared. Auto-remove ON".to_string(),
            ));
            actions
        }
        Command::SetSingleNickname {
            user_id, nickname, ..
        } => vec![CorrectiveAction::SetNickname {
            thread_id: thread_id.clone(),
            user_id: user_id.clone(),
            nickname: nickname.clone(),
        }],
        Command::UnlockNickname { .. } => vec![notify("🔓 Nickname lock OFF".to_string())],
        Command::StopNicknameAutoRemove { .. } => {
            vec![notify("🛑 Nickname auto-remove OFF".to_string())]
        }
        Command::EnableAntiOut { .. } => vec![notify("🚨 Anti-out ON".to_string())],
        Command::DisableAntiOut { .. } => vec![notify("Anti-out OFF".to_string())],
        Command::Reset { .. } => {
            debug_assert!(!policy.is_governed());
            vec![notify("Policy reset, nothing is governed".to_string())]
        }
    }
}

fn is_superseded(policy: &ThreadPolicy, command: &Command) -> bool {
    match command {
        Command::LockTitle { title, .. } => policy.locked_title.as_ref() != Some(title),
        Command::ClearTitleLockEnableAutoRemove { .. } => !policy.title_auto_clear,
        Command::LockNickname { nickname, .. } => policy.locked_nickname.as_ref() != Some(nickname),
        Command::ClearAllNicknamesEnableAutoRemove { .. } => !policy.nickname_auto_clear,
        _ => false,
    }
}

fn set_all_nicknames(thread_id: &str, members: &[UserId], nickname: &str) -> Vec<CorrectiveAction> {
    members
        .iter()
        .map(|user_id| CorrectiveAction::SetNickname {
            thread_id: thread_id.to_string(),
            user_id: user_id.clone(),
            nickname: nickname.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadwarden_store::DesiredStateStore;

    /// Policy of a fresh thread after `command`.
    fn applied(command: &Command) -> ThreadPolicy {
        DesiredStateStore::new().apply(command).unwrap()
    }

    fn members() -> Vec<UserId> {
        vec!["u1".into(), "u2".into(), "u3".into()]
    }

    #[test]
    fn test_lock_title_sets_title_then_notifies() {
        let cmd = Command::LockTitle {
            thread_id: "t1".into(),
            title: "Alpha".into(),
        };
        let actions = plan_command(&applied(&cmd), &cmd, &[]);
        assert_eq!(
            actions[0],
            CorrectiveAction::SetTitle {
                thread_id: "t1".into(),
                title: "Alpha".into(),
            }
        );
        assert!(actions[1].is_notify());
        assert!(!needs_roster(&cmd));
    }

    #[test]
    fn test_lock_nickname_covers_every_member() {
        let cmd = Command::LockNickname {
            thread_id: "t1".into(),
            nickname: "Bob".into(),
        };
        assert!(needs_roster(&cmd));

        let actions = plan_command(&applied(&cmd), &cmd, &members());
        let set: Vec<_> = actions.iter().filter(|a| !a.is_notify()).collect();
        assert_eq!(set.len(), 3);
        for (action, user) in set.iter().zip(members()) {
            assert_eq!(
                **action,
                CorrectiveAction::SetNickname {
                    thread_id: "t1".into(),
                    user_id: user,
                    nickname: "Bob".into(),
                }
            );
        }
        assert!(actions.last().is_some_and(CorrectiveAction::is_notify));
    }

    #[test]
    fn test_clear_all_nicknames() {
        let cmd = Command::ClearAllNicknamesEnableAutoRemove {
            thread_id: "t1".into(),
        };
        let actions = plan_command(&applied(&cmd), &cmd, &members());
        assert_eq!(actions.len(), 4);
        assert!(actions[..3].iter().all(|a| matches!(
            a,
            CorrectiveAction::SetNickname { nickname, .. } if nickname.is_empty()
        )));
    }

    #[test]
    fn test_single_nickname_is_one_action() {
        let cmd = Command::SetSingleNickname {
            thread_id: "t1".into(),
            user_id: "u9".into(),
            nickname: "Zed".into(),
        };
        assert_eq!(
            plan_command(&applied(&cmd), &cmd, &[]),
            vec![CorrectiveAction::SetNickname {
                thread_id: "t1".into(),
                user_id: "u9".into(),
                nickname: "Zed".into(),
            }]
        );
    }

    #[test]
    fn test_flag_commands_only_notify() {
        for cmd in [
            Command::UnlockNickname {
                thread_id: "t1".into(),
            },
            Command::StopNicknameAutoRemove {
                thread_id: "t1".into(),
            },
            Command::EnableAntiOut {
                thread_id: "t1".into(),
            },
            Command::DisableAntiOut {
                thread_id: "t1".into(),
            },
            Command::Reset {
                thread_id: "t1".into(),
            },
        ] {
            let actions = plan_command(&applied(&cmd), &cmd, &[]);
            assert_eq!(actions.len(), 1, "{}", cmd.name());
            assert!(actions[0].is_notify());
        }
    }

    #[test]
    fn test_superseded_lock_plans_nothing() {
        let lock = Command::LockNickname {
            thread_id: "t1".into(),
            nickname: "Bob".into(),
        };
        let mut store = DesiredStateStore::new();
        store.apply(&lock).unwrap();
        let unlocked = store
            .apply(&Command::UnlockNickname {
                thread_id: "t1".into(),
            })
            .unwrap();
        assert!(plan_command(&unlocked, &lock, &members()).is_empty());

        let relocked = store
            .apply(&Command::LockNickname {
                thread_id: "t1".into(),
                nickname: "Carol".into(),
            })
            .unwrap();
        assert!(plan_command(&relocked, &lock, &members()).is_empty());
    }

    #[test]
    fn test_superseded_auto_clear_plans_nothing() {
        let clear = Command::ClearAllNicknamesEnableAutoRemove {
            thread_id: "t1".into(),
        };
        let mut store = DesiredStateStore::new();
        store.apply(&clear).unwrap();
        let stopped = store
            .apply(&Command::StopNicknameAutoRemove {
                thread_id: "t1".into(),
            })
            .unwrap();
        assert!(plan_command(&stopped, &clear, &members()).is_empty());

        let title = Command::ClearTitleLockEnableAutoRemove {
            thread_id: "t1".into(),
        };
        assert!(plan_command(&ThreadPolicy::new("t1"), &title, &[]).is_empty());
    }
}
