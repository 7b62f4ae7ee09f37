//! Engine control task.
//!
//! One task owns the desired-state store, the ingestor and the executor.
//! Notifications and commands are handled strictly in the order they were
//! queued; corrective actions are handed to the executor without waiting.
//! The task never awaits the platform: member lists are fetched by a spawned
//! task and planned when they come back.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use threadwarden_core::{Error, Result, ThreadId, WardenConfig};
use threadwarden_executor::{ActionExecutor, ExecutionReport, ExecutorConfig, Platform};
use threadwarden_ingest::EventIngestor;
use threadwarden_reconcile::{needs_roster, plan_command, reconcile, CorrectiveAction};
use threadwarden_store::{Command, DesiredStateStore, InvariantError, ThreadPolicy};

use crate::types::{EngineMessage, EngineStatus, RosterReply};

/// Queue depth between handles and the control task.
const QUEUE_CAPACITY: usize = 1024;

struct Engine {
    platform: Arc<dyn Platform>,
    roster_tx: mpsc::UnboundedSender<RosterReply>,
    store: DesiredStateStore,
    ingestor: EventIngestor,
    executor: ActionExecutor,
    active_thread: Option<ThreadId>,
}

/// Cloneable handle to a running engine.
///
/// Every method fails with [`Error::EngineClosed`] once the engine has shut
/// down.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    /// Start an engine with settings from `config`.
    pub fn start(platform: Arc<dyn Platform>, config: &WardenConfig) -> Self {
        Self::with_executor_config(platform, ExecutorConfig::from_config(config))
    }

    pub fn with_executor_config(platform: Arc<dyn Platform>, config: ExecutorConfig) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let (roster_tx, roster_rx) = mpsc::unbounded_channel();
        let engine = Engine {
            roster_tx,
            executor: ActionExecutor::start(platform.clone(), config),
            platform,
            store: DesiredStateStore::new(),
            ingestor: EventIngestor::new(),
            active_thread: None,
        };
        tokio::spawn(engine.run(rx, roster_rx));
        debug!("Engine task spawned (queue capacity {})", QUEUE_CAPACITY);
        Self { tx }
    }

    /// Feed one raw platform notification.
    pub async fn notify(&self, raw: Value) -> Result<()> {
        self.send(EngineMessage::Notification(raw)).await
    }

    /// Apply an operator command. The outer error means the engine is gone;
    /// the inner one is the store refusing the command, which leaves the
    /// policy unchanged.
    pub async fn command(
        &self,
        command: Command,
    ) -> Result<std::result::Result<ThreadPolicy, InvariantError>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineMessage::Command { command, reply }).await?;
        rx.await.map_err(|_| Error::EngineClosed)
    }

    pub async fn policy(&self, thread_id: impl Into<ThreadId>) -> Result<ThreadPolicy> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineMessage::Policy {
            thread_id: thread_id.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::EngineClosed)
    }

    /// Thread most recently targeted by a successfully applied command.
    pub async fn active_thread(&self) -> Result<Option<ThreadId>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineMessage::ActiveThread { reply }).await?;
        rx.await.map_err(|_| Error::EngineClosed)
    }

    pub async fn status(&self) -> Result<EngineStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineMessage::Status { reply }).await?;
        rx.await.map_err(|_| Error::EngineClosed)
    }

    /// Receive a report for every action finished from now on.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<ExecutionReport>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineMessage::Subscribe { reply }).await?;
        rx.await.map_err(|_| Error::EngineClosed)
    }

    /// Stop the engine. Messages already queued are still handled and
    /// submitted actions run to completion before this returns.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineMessage::Shutdown { reply }).await?;
        rx.await.map_err(|_| Error::EngineClosed)
    }

    async fn send(&self, message: EngineMessage) -> Result<()> {
        self.tx.send(message).await.map_err(|_| Error::EngineClosed)
    }
}

impl Engine {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<EngineMessage>,
        mut roster_rx: mpsc::UnboundedReceiver<RosterReply>,
    ) {
        info!("Engine started");
        let mut shutdown_replies = Vec::new();

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => self.handle_message(message, &mut rx, &mut shutdown_replies),
                    None => break,
                },
                Some(reply) = roster_rx.recv() => self.handle_roster(reply),
            }
        }

        // Rosters already delivered are still applied; fetches in flight are dropped
        while let Ok(reply) = roster_rx.try_recv() {
            self.handle_roster(reply);
        }

        let Engine {
            executor, ingestor, ..
        } = self;
        let stats = executor.stats();
        executor.shutdown().await;
        info!(
            "Engine stopped: ingest={:?}, applied={}, abandoned={}, rejected={}",
            ingestor.stats(),
            stats.applied,
            stats.abandoned,
            stats.rejected
        );

        for reply in shutdown_replies {
            let _ = reply.send(());
        }
    }

    fn handle_message(
        &mut self,
        message: EngineMessage,
        rx: &mut mpsc::Receiver<EngineMessage>,
        shutdown_replies: &mut Vec<oneshot::Sender<()>>,
    ) {
        match message {
            EngineMessage::Notification(raw) => self.handle_notification(&raw),
            EngineMessage::Command { command, reply } => {
                let _ = reply.send(self.handle_command(command));
            }
            EngineMessage::Policy { thread_id, reply } => {
                let _ = reply.send(self.store.get(&thread_id));
            }
            EngineMessage::ActiveThread { reply } => {
                let _ = reply.send(self.active_thread.clone());
            }
            EngineMessage::Status { reply } => {
                let _ = reply.send(self.status());
            }
            EngineMessage::Subscribe { reply } => {
                let _ = reply.send(self.executor.subscribe());
            }
            EngineMessage::Shutdown { reply } => {
                if shutdown_replies.is_empty() {
                    info!("Engine shutting down");
                    rx.close();
                }
                shutdown_replies.push(reply);
            }
        }
    }

    fn handle_notification(&mut self, raw: &Value) {
        let Some(drift) = self.ingestor.ingest(raw) else {
            return;
        };
        let policy = self.store.get(drift.thread_id());
        for action in reconcile(&policy, &drift) {
            info!("Correcting {} on thread {}: {}", drift.kind(), drift.thread_id(), action);
            self.executor.submit(action);
        }
    }

    fn handle_command(
        &mut self,
        command: Command,
    ) -> std::result::Result<ThreadPolicy, InvariantError> {
        let policy = match self.store.apply(&command) {
            Ok(policy) => policy,
            Err(e) => {
                warn!("Command {} refused: {}", command.name(), e);
                return Err(e);
            }
        };
        info!("Command {} applied to thread {}", command.name(), command.thread_id());

        if matches!(command, Command::Reset { .. }) {
            if self.active_thread.as_deref() == Some(command.thread_id()) {
                self.active_thread = None;
            }
        } else {
            self.active_thread = Some(command.thread_id().to_string());
        }

        if needs_roster(&command) {
            self.fetch_roster(command);
        } else {
            for action in plan_command(&policy, &command, &[]) {
                self.executor.submit(action);
            }
        }
        Ok(policy)
    }

    /// Fetch the member list off the control task; the result comes back as
    /// a `RosterReply`.
    fn fetch_roster(&self, command: Command) {
        let platform = self.platform.clone();
        let roster_tx = self.roster_tx.clone();
        tokio::spawn(async move {
            let members = platform.list_members(command.thread_id()).await;
            if roster_tx.send(RosterReply { command, members }).is_err() {
                debug!("Engine stopped before the member list arrived");
            }
        });
    }

    /// First-time application of a roster command, planned against the policy
    /// as it is now.
    fn handle_roster(&mut self, reply: RosterReply) {
        let RosterReply { command, members } = reply;
        let thread_id = command.thread_id();

        let actions = match members {
            Ok(members) => plan_command(&self.store.get(thread_id), &command, &members),
            Err(e) => {
                // The policy stands; drift will bring members in line later
                error!("Member list for thread {} unavailable: {}", thread_id, e);
                vec![CorrectiveAction::notify(
                    thread_id,
                    format!("⚠️ Policy saved, but the member list could not be read: {}", e),
                )]
            }
        };
        for action in actions {
            self.executor.submit(action);
        }
    }

    fn status(&self) -> EngineStatus {
        let governed_threads = self
            .store
            .threads()
            .iter()
            .filter(|t| self.store.get(t).is_governed())
            .count();
        EngineStatus {
            governed_threads,
            active_thread: self.active_thread.clone(),
            ingest: self.ingestor.stats(),
            executor: self.executor.stats(),
        }
    }
}
