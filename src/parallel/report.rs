//! Per-task outcomes and the aggregated batch report

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::processing::TransformOutput;

/// Lifecycle of a single transform task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl TaskStatus {
    /// No transition leaves a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Terminal result of one dispatched task, keyed by dispatch index and source
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub index: usize,
    pub source: PathBuf,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl TaskOutcome {
    pub fn completed(index: usize, result: TransformOutput) -> Self {
        Self {
            index,
            source: result.source,
            status: TaskStatus::Completed,
            error: None,
            output: Some(result.output),
            dimensions: Some(result.dimensions),
            elapsed: result.processing_time,
        }
    }

    pub fn cancelled(index: usize, source: PathBuf) -> Self {
        Self {
            index,
            source,
            status: TaskStatus::Cancelled,
            error: None,
            output: None,
            dimensions: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn failed<S: Into<String>>(index: usize, source: PathBuf, reason: S, elapsed: Duration) -> Self {
        Self {
            index,
            source,
            status: TaskStatus::Failed,
            error: Some(reason.into()),
            output: None,
            dimensions: None,
            elapsed,
        }
    }

    /// One diagnostic line: `[index] path: status`
    pub fn status_line(&self) -> String {
        match &self.error {
            Some(reason) => format!("[{}] {}: {} ({})", self.index, self.source.display(), self.status, reason),
            None => format!("[{}] {}: {}", self.index, self.source.display(), self.status),
        }
    }
}

/// Outcomes of a whole batch, one per dispatched task in dispatch order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<TaskOutcome>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl BatchReport {
    /// Build a report, ordering outcomes by dispatch index
    pub fn new(mut outcomes: Vec<TaskOutcome>, elapsed: Duration) -> Self {
        outcomes.sort_by_key(|outcome| outcome.index);
        Self { outcomes, elapsed }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn count(&self, status: TaskStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn completed(&self) -> usize {
        self.count(TaskStatus::Completed)
    }

    pub fn cancelled(&self) -> usize {
        self.count(TaskStatus::Cancelled)
    }

    pub fn failed(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    /// True when every task completed
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == TaskStatus::Completed)
    }

    /// Outcomes that did not complete
    pub fn unsuccessful(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.status != TaskStatus::Completed)
    }

    pub fn status_lines(&self) -> Vec<String> {
        self.outcomes.iter().map(TaskOutcome::status_line).collect()
    }

    /// Emit the aggregate, then every task's status so each failure is
    /// visible on its own.
    pub fn log_statuses(&self) {
        if self.is_success() {
            info!("All {} tasks completed in {:.2}s", self.len(), self.elapsed.as_secs_f64());
            return;
        }

        warn!(
            "{} of {} tasks did not complete ({} failed, {} cancelled)",
            self.len() - self.completed(),
            self.len(),
            self.failed(),
            self.cancelled()
        );
        for outcome in &self.outcomes {
            match outcome.status {
                TaskStatus::Failed => warn!("{}", outcome.status_line()),
                _ => info!("{}", outcome.status_line()),
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
