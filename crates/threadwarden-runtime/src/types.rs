//! Messages and status snapshots exchanged with the control task.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use threadwarden_core::{ThreadId, UserId};
use threadwarden_executor::{ExecutionReport, ExecutorStats, RemoteError};
use threadwarden_ingest::IngestStats;
use threadwarden_store::{Command, InvariantError, ThreadPolicy};

/// Everything the control task can be asked to do.
pub(crate) enum EngineMessage {
    Notification(Value),
    Command {
        command: Command,
        reply: oneshot::Sender<Result<ThreadPolicy, InvariantError>>,
    },
    Policy {
        thread_id: ThreadId,
        reply: oneshot::Sender<ThreadPolicy>,
    },
    ActiveThread {
        reply: oneshot::Sender<Option<ThreadId>>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<ExecutionReport>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Member list fetched for a command that applies to every member.
pub(crate) struct RosterReply {
    pub command: Command,
    pub members: Result<Vec<UserId>, RemoteError>,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    /// Threads with a non-default policy.
    pub governed_threads: usize,
    pub active_thread: Option<ThreadId>,
    pub ingest: IngestStats,
    pub executor: ExecutorStats,
}
