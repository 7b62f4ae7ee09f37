//! Keyed dispatcher: one queue per resource key, bounded concurrency.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use threadwarden_core::WardenConfig;
use threadwarden_reconcile::{CorrectiveAction, ResourceKey};

use crate::platform::Platform;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::types::{ExecutionReport, ExecutorStats, Outcome};

/// Capacity of the report broadcast; slow subscribers lose old reports.
const REPORT_CAPACITY: usize = 256;

/// Executor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub retry: RetryPolicy,
    /// Remote calls allowed in flight at once, across all keys.
    pub max_concurrency: usize,
}

impl ExecutorConfig {
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            retry: RetryPolicy::from_config(config),
            max_concurrency: config.max_concurrency.max(1),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_config(&WardenConfig::default())
    }
}

struct Job {
    id: Uuid,
    action: CorrectiveAction,
}

/// Sent by a worker when its job is over.
struct Done {
    key: ResourceKey,
    /// Action the dispatcher should queue next, e.g. a notice about a refusal.
    follow_up: Option<CorrectiveAction>,
}

/// Handle to the executor. Submitting never waits on the platform.
pub struct ActionExecutor {
    submit_tx: mpsc::UnboundedSender<Job>,
    reports: broadcast::Sender<ExecutionReport>,
    stats: Arc<Mutex<ExecutorStats>>,
    dispatcher: JoinHandle<()>,
}

impl ActionExecutor {
    /// Start the dispatcher task. Must be called inside a tokio runtime.
    pub fn start(platform: Arc<dyn Platform>, config: ExecutorConfig) -> Self {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));

        let dispatcher = Dispatcher {
            platform,
            config,
            gate: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            queues: HashMap::new(),
            reports: reports.clone(),
            stats: stats.clone(),
        };
        let dispatcher = tokio::spawn(dispatcher.run(submit_rx));

        info!(
            "Action executor started: attempts={}, delay={:?}, max_concurrency={}",
            config.retry.attempts, config.retry.delay, config.max_concurrency
        );

        Self {
            submit_tx,
            reports,
            stats,
            dispatcher,
        }
    }

    /// Queue an action. Returns the job id carried by its report.
    pub fn submit(&self, action: CorrectiveAction) -> Uuid {
        let id = Uuid::new_v4();
        self.stats.lock().submitted += 1;
        if self.submit_tx.send(Job { id, action }).is_err() {
            error!("Executor dispatcher is gone, dropping job {}", id);
        }
        id
    }

    /// Receive a report for every job finished from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionReport> {
        self.reports.subscribe()
    }

    pub fn stats(&self) -> ExecutorStats {
        *self.stats.lock()
    }

    /// Stop accepting work and wait until every queued job has finished.
    pub async fn shutdown(self) {
        let Self {
            submit_tx,
            dispatcher,
            ..
        } = self;
        drop(submit_tx);
        if let Err(e) = dispatcher.await {
            error!("Executor dispatcher ended abnormally: {}", e);
        }
    }
}

struct Dispatcher {
    platform: Arc<dyn Platform>,
    config: ExecutorConfig,
    gate: Arc<Semaphore>,
    /// A key is present while a job for it is running; the deque holds the
    /// jobs waiting behind it.
    queues: HashMap<ResourceKey, VecDeque<Job>>,
    reports: broadcast::Sender<ExecutionReport>,
    stats: Arc<Mutex<ExecutorStats>>,
}

impl Dispatcher {
    async fn run(mut self, mut submit_rx: mpsc::UnboundedReceiver<Job>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Done>();
        let mut accepting = true;

        loop {
            tokio::select! {
                job = submit_rx.recv(), if accepting => match job {
                    Some(job) => self.enqueue(job, &done_tx),
                    None => accepting = false,
                },
                Some(done) = done_rx.recv() => {
                    if let Some(action) = done.follow_up {
                        self.stats.lock().submitted += 1;
                        self.enqueue(Job { id: Uuid::new_v4(), action }, &done_tx);
                    }
                    self.advance(done.key, &done_tx);
                }
            }

            if !accepting && self.queues.is_empty() {
                break;
            }
        }

        info!("Action executor drained");
    }

    fn enqueue(&mut self, job: Job, done_tx: &mpsc::UnboundedSender<Done>) {
        let key = job.action.resource_key();
        match self.queues.get_mut(&key) {
            Some(waiting) => waiting.push_back(job),
            None => {
                self.queues.insert(key.clone(), VecDeque::new());
                self.spawn_job(key, job, done_tx);
            }
        }
    }

    /// The running job on `key` finished: start the next one or free the key.
    fn advance(&mut self, key: ResourceKey, done_tx: &mpsc::UnboundedSender<Done>) {
        let next = match self.queues.get_mut(&key) {
            Some(waiting) => waiting.pop_front(),
            None => return,
        };
        match next {
            Some(job) => self.spawn_job(key, job, done_tx),
            None => {
                self.queues.remove(&key);
            }
        }
    }

    fn spawn_job(&self, key: ResourceKey, job: Job, done_tx: &mpsc::UnboundedSender<Done>) {
        let platform = self.platform.clone();
        let gate = self.gate.clone();
        let policy = self.config.retry;
        let reports = self.reports.clone();
        let stats = self.stats.clone();
        let done_tx = done_tx.clone();

        let Job { id, action } = job;

        tokio::spawn(async move {
            // Run the attempts in their own task so a panicking platform
            // cannot leave the key marked busy.
            let attempted = action.clone();
            let attempt = tokio::spawn(async move {
                run_with_retry(platform.as_ref(), &attempted, &policy, &gate).await
            });
            let (attempts, outcome) = match attempt.await {
                Ok(result) => result,
                Err(e) => (
                    0,
                    Outcome::Abandoned {
                        error: format!("attempt task failed: {}", e),
                    },
                ),
            };

            let report = ExecutionReport {
                job_id: id,
                action,
                attempts,
                outcome,
                finished_at: chrono::Utc::now(),
            };
            let follow_up = finish(&report, &stats);
            let _ = reports.send(report);
            let _ = done_tx.send(Done { key, follow_up });
        });
    }
}

/// Log and count a finished job; decide whether the operator must be told.
fn finish(report: &ExecutionReport, stats: &Mutex<ExecutorStats>) -> Option<CorrectiveAction> {
    stats.lock().record(&report.outcome);

    match &report.outcome {
        Outcome::Applied => {
            info!(
                "Applied {} after {} attempt(s) [job {}]",
                report.action, report.attempts, report.job_id
            );
            None
        }
        Outcome::Abandoned { error } => {
            warn!(
                "Abandoned {} after {} attempt(s): {} [job {}]",
                report.action, report.attempts, error, report.job_id
            );
            None
        }
        Outcome::Rejected { error } => {
            error!(
                "Platform refused {}: {} [job {}]",
                report.action, error, report.job_id
            );
            // A refused notice is not announced with another notice
            (!report.action.is_notify()).then(|| {
                CorrectiveAction::notify(
                    report.action.thread_id(),
                    format!("⚠️ Could not {}: {}", report.action, error),
                )
            })
        }
    }
}
