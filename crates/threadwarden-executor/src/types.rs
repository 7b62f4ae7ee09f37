//! Execution reports and counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use threadwarden_reconcile::CorrectiveAction;

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// At least one attempt succeeded.
    Applied,
    /// Every attempt failed transiently. The next drift will re-trigger it.
    Abandoned { error: String },
    /// The platform refused permanently. Not retried.
    Rejected { error: String },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Terminal record of one submitted action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub job_id: Uuid,
    pub action: CorrectiveAction,
    /// Attempts actually issued.
    pub attempts: u32,
    pub outcome: Outcome,
    pub finished_at: DateTime<Utc>,
}

/// Running executor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorStats {
    pub submitted: u64,
    pub applied: u64,
    pub abandoned: u64,
    pub rejected: u64,
}

impl ExecutorStats {
    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.applied + self.abandoned + self.rejected)
    }

    pub(crate) fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::Abandoned { .. } => self.abandoned += 1,
            Outcome::Rejected { .. } => self.rejected += 1,
        }
    }
}
