//! Progress tracking for batch operations

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

use super::report::TaskStatus;

/// Thread-safe progress tracker shared by every task of a batch
pub struct ProgressTracker {
    sender: broadcast::Sender<ProgressUpdate>,

    // Atomic counters, bumped once per terminal task
    total: AtomicUsize,
    completed: AtomicUsize,
    cancelled: AtomicUsize,
    failed: AtomicUsize,
}

/// Snapshot of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub total: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
}

/// Progress update event
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    Started {
        total: usize,
    },
    TaskStarted {
        index: usize,
        source: PathBuf,
    },
    TaskFinished {
        index: usize,
        source: PathBuf,
        status: TaskStatus,
    },
    BatchFinished {
        state: ProgressState,
        elapsed: Duration,
    },
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);

        Self {
            sender,
            total: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Reset counters for a batch of `total` tasks
    pub fn start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.cancelled.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);

        let _ = self.sender.send(ProgressUpdate::Started { total });
    }

    /// Record a task leaving `Pending`
    pub fn task_started(&self, index: usize, source: PathBuf) {
        let _ = self.sender.send(ProgressUpdate::TaskStarted { index, source });
    }

    /// Record one task reaching a terminal status
    pub fn task_finished(&self, index: usize, source: PathBuf, status: TaskStatus) {
        let counter = match status {
            TaskStatus::Completed => &self.completed,
            TaskStatus::Cancelled => &self.cancelled,
            TaskStatus::Failed => &self.failed,
            TaskStatus::Pending | TaskStatus::Running => {
                debug!("Ignoring non-terminal status {} for task {}", status, index);
                return;
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let _ = self.sender.send(ProgressUpdate::TaskFinished { index, source, status });
    }

    /// Mark the batch as finished
    pub fn finish(&self, elapsed: Duration) {
        let state = self.state();
        debug!("Batch finished: {:?}", state);
        let _ = self.sender.send(ProgressUpdate::BatchFinished { state, elapsed });
    }

    pub fn state(&self) -> ProgressState {
        ProgressState {
            total: self.total.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Tasks that reached a terminal status
    pub fn finished(&self) -> usize {
        self.completed + self.cancelled + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let tracker = ProgressTracker::new();
        tracker.start(4);
        tracker.task_finished(0, "a.png".into(), TaskStatus::Completed);
        tracker.task_finished(1, "b.png".into(), TaskStatus::Failed);
        tracker.task_finished(2, "c.png".into(), TaskStatus::Cancelled);
        tracker.task_finished(3, "d.png".into(), TaskStatus::Running);

        let state = tracker.state();
        assert_eq!(state.total, 4);
        assert_eq!(state.finished(), 3);
        assert_eq!((state.completed, state.failed, state.cancelled), (1, 1, 1));
    }

    #[test]
    fn test_start_resets() {
        let tracker = ProgressTracker::new();
        tracker.start(1);
        tracker.task_finished(0, "a.png".into(), TaskStatus::Completed);
        tracker.start(2);
        assert_eq!(tracker.state(), ProgressState { total: 2, ..Default::default() });
    }

    #[tokio::test]
    async fn test_progress_updates() {
        let tracker = ProgressTracker::new();
        let mut receiver = tracker.subscribe();

        tracker.start(1);
        tracker.task_started(0, "a.png".into());
        tracker.task_finished(0, "a.png".into(), TaskStatus::Completed);
        tracker.finish(Duration::from_millis(10));

        assert!(matches!(receiver.recv().await.unwrap(), ProgressUpdate::Started { total: 1 }));
        assert!(matches!(receiver.recv().await.unwrap(), ProgressUpdate::TaskStarted { index: 0, .. }));
        match receiver.recv().await.unwrap() {
            ProgressUpdate::TaskFinished { index, status, .. } => {
                assert_eq!(index, 0);
                assert_eq!(status, TaskStatus::Completed);
            }
            other => panic!("unexpected update: {:?}", other),
        }
        match receiver.recv().await.unwrap() {
            ProgressUpdate::BatchFinished { state, .. } => assert_eq!(state.completed, 1),
            other => panic!("unexpected update: {:?}", other),
        }
    }
}
