//! Drift → corrective actions.

use tracing::info;

use threadwarden_ingest::Drift;
use threadwarden_store::ThreadPolicy;

use crate::action::CorrectiveAction;

/// Decide what, if anything, restores `policy` after `drift`.
///
/// Yields at most one action. Values are compared byte for byte: `" Alpha"`
/// and `"alpha"` are both drift from `"Alpha"`.
///
/// On each axis the lock is evaluated before auto-clear. The store never holds
/// both at once; a hand-built policy that does gets the lock.
pub fn reconcile(policy: &ThreadPolicy, drift: &Drift) -> Vec<CorrectiveAction> {
    let action = match drift {
        Drift::TitleChanged {
            thread_id,
            new_title,
        } => {
            if let Some(locked) = &policy.locked_title {
                (new_title != locked).then(|| {
                    info!("Title of {} changed to {:?}, reverting", thread_id, new_title);
                    CorrectiveAction::SetTitle {
                        thread_id: thread_id.clone(),
                        title: locked.clone(),
                    }
                })
            } else if policy.title_auto_clear && !new_title.is_empty() {
                info!("Title of {} set to {:?}, auto-removing", thread_id, new_title);
                Some(CorrectiveAction::SetTitle {
                    thread_id: thread_id.clone(),
                    title: String::new(),
                })
            } else {
                None
            }
        }
        Drift::NicknameChanged {
            thread_id,
            user_id,
            new_nickname,
        } => {
            if let Some(locked) = &policy.locked_nickname {
                (new_nickname != locked).then(|| {
                    info!("Nickname of {} in {} changed, reverting", user_id, thread_id);
                    CorrectiveAction::SetNickname {
                        thread_id: thread_id.clone(),
                        user_id: user_id.clone(),
                        nickname: locked.clone(),
                    }
                })
            } else if policy.nickname_auto_clear && !new_nickname.is_empty() {
                info!("Nickname of {} in {} set, auto-removing", user_id, thread_id);
                Some(CorrectiveAction::SetNickname {
                    thread_id: thread_id.clone(),
                    user_id: user_id.clone(),
                    nickname: String::new(),
                })
            } else {
                None
            }
        }
        Drift::MemberLeft { thread_id, user_id } => policy.anti_out_enabled.then(|| {
            info!("Anti-out: {} left {}, adding back", user_id, thread_id);
            CorrectiveAction::ReAddMember {
                thread_id: thread_id.clone(),
                user_id: user_id.clone(),
            }
        }),
        Drift::MessageUnsent {
            thread_id,
            message_id,
            actor_id,
        } => {
            let who = if actor_id.is_empty() {
                "someone"
            } else {
                actor_id.as_str()
            };
            Some(CorrectiveAction::notify(
                thread_id.clone(),
                format!("Message {} was unsent by {}", message_id, who),
            ))
        }
    };

    action.into_iter().collect()
}
