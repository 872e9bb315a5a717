//! Batch orchestration: sequential and concurrent resize runs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::ResizeConfig;
use crate::error::{Result, ResizeError};
use crate::processing::{
    ensure_directory, transform_file, Finder, ImageCodec, ImageCrateCodec, ScaleFactor,
    TransformOutput,
};

pub mod cancel;
pub mod progress;
pub mod report;

pub use cancel::*;
pub use progress::*;
pub use report::*;

/// One unit of work, moved whole into the task that runs it
#[derive(Debug, Clone)]
pub struct TransformTask {
    pub index: usize,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub scale: ScaleFactor,
}

/// Resizes every image under a source tree into a destination directory
#[derive(Clone)]
pub struct BatchResizer {
    codec: Arc<dyn ImageCodec>,
    config: ResizeConfig,
    progress: Arc<ProgressTracker>,
}

impl BatchResizer {
    /// Create a resizer using the `image` crate codec
    pub fn new(config: ResizeConfig) -> Self {
        Self {
            codec: Arc::new(ImageCrateCodec::new()),
            config,
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    /// Swap in a different codec
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &ResizeConfig {
        &self.config
    }

    /// Tracker fed by every run of this resizer
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    /// Number of transforms allowed to run at once
    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Run according to the configured mode and scale.
    ///
    /// Sequential runs return the first error; their report only exists
    /// when every file succeeded.
    pub async fn run(
        &self,
        source: &Path,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let scale = self.config.scale_factor()?;
        if self.config.concurrent {
            return self.resize_all_concurrently(source, dest, scale, cancel).await;
        }

        let start_time = Instant::now();
        let resizer = self.clone();
        let (source, dest) = (source.to_path_buf(), dest.to_path_buf());
        let outputs = tokio::task::spawn_blocking(move || resizer.resize_all(&source, &dest, scale))
            .await
            .map_err(|e| ResizeError::task_join(e.to_string()))??;

        let outcomes = outputs
            .into_iter()
            .enumerate()
            .map(|(index, output)| TaskOutcome::completed(index, output))
            .collect();
        Ok(BatchReport::new(outcomes, start_time.elapsed()))
    }

    /// Resize every image one after another, stopping at the first error
    pub fn resize_all(
        &self,
        source: &Path,
        dest: &Path,
        scale: ScaleFactor,
    ) -> Result<Vec<TransformOutput>> {
        let start_time = Instant::now();
        ensure_directory(dest)?;

        let files = Finder::find(source)?;
        info!("Resizing {} images sequentially (scale {})", files.len(), scale.value());
        warn_on_name_collisions(&files);
        self.progress.start(files.len());

        let mut outputs = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            self.progress.task_started(index, file.clone());
            match transform_file(self.codec.as_ref(), file, dest, scale) {
                Ok(output) => {
                    self.progress.task_finished(index, file.clone(), TaskStatus::Completed);
                    outputs.push(output);
                }
                Err(e) => {
                    self.progress.task_finished(index, file.clone(), TaskStatus::Failed);
                    warn!("Aborting batch at {:?}: {}", file, e);
                    return Err(e);
                }
            }
        }

        self.progress.finish(start_time.elapsed());
        info!("Sequential batch completed in {:.2}s", start_time.elapsed().as_secs_f64());
        Ok(outputs)
    }

    /// Fan one task per image out over the blocking pool and wait for all.
    ///
    /// Per-file failures and cancellations end up in the report; only a
    /// missing source or an unusable destination fails the call itself.
    pub async fn resize_all_concurrently(
        &self,
        source: &Path,
        dest: &Path,
        scale: ScaleFactor,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let start_time = Instant::now();
        ensure_directory(dest)?;

        let files = Finder::find(source)?;
        let max_concurrent = self.max_concurrent();
        info!("Dispatching {} transform tasks ({} at a time, scale {})",
              files.len(), max_concurrent, scale.value());
        warn_on_name_collisions(&files);
        self.progress.start(files.len());

        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut handles = Vec::with_capacity(files.len());

        for (index, file) in files.iter().enumerate() {
            let task = TransformTask {
                index,
                source: file.clone(),
                destination: dest.to_path_buf(),
                scale,
            };
            let codec = Arc::clone(&self.codec);
            let semaphore = Arc::clone(&semaphore);
            let progress = Arc::clone(&self.progress);
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let outcome = execute_task(task, codec, semaphore, Arc::clone(&progress), cancel).await;
                progress.task_finished(outcome.index, outcome.source.clone(), outcome.status);
                outcome
            }));
        }

        let joined = futures::future::join_all(handles).await;

        let outcomes = joined
            .into_iter()
            .zip(files)
            .enumerate()
            .map(|(index, (result, file))| {
                result.unwrap_or_else(|e| {
                    self.progress.task_finished(index, file.clone(), TaskStatus::Failed);
                    TaskOutcome::failed(index, file, format!("task join error: {}", e), Duration::ZERO)
                })
            })
            .collect();

        let report = BatchReport::new(outcomes, start_time.elapsed());
        self.progress.finish(report.elapsed);
        report.log_statuses();

        Ok(report)
    }
}

/// Body of one concurrent task. Every exit path yields exactly one outcome.
async fn execute_task(
    task: TransformTask,
    codec: Arc<dyn ImageCodec>,
    semaphore: Arc<Semaphore>,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
) -> TaskOutcome {
    let TransformTask { index, source, destination, scale } = task;

    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return TaskOutcome::failed(index, source, format!("worker pool closed: {}", e), Duration::ZERO);
        }
    };

    let start_time = Instant::now();
    let path = source.clone();
    let joined = tokio::task::spawn_blocking(move || {
        // Only checked here; a transform that has started runs to the end
        if cancel.is_cancelled() {
            return Err(ResizeError::Cancelled { path });
        }
        progress.task_started(index, path.clone());
        transform_file(codec.as_ref(), &path, &destination, scale)
    })
    .await;

    match joined {
        Ok(Ok(output)) => {
            debug!("[{}] {:?} -> {:?}", index, output.source, output.output);
            TaskOutcome::completed(index, output)
        }
        Ok(Err(e)) if e.is_cancelled() => {
            debug!("[{}] {:?} cancelled before start", index, source);
            TaskOutcome::cancelled(index, source)
        }
        Ok(Err(e)) => {
            debug!("[{}] Failed to process {:?}: {}", index, source, e);
            TaskOutcome::failed(index, source, e.to_string(), start_time.elapsed())
        }
        Err(e) => TaskOutcome::failed(
            index,
            source,
            format!("transform panicked: {}", e),
            start_time.elapsed(),
        ),
    }
}

/// Sources sharing a file stem map onto the same output file
fn warn_on_name_collisions(files: &[PathBuf]) {
    let mut seen = HashSet::new();
    for file in files {
        if let Some(stem) = file.file_stem() {
            if !seen.insert(stem) {
                warn!("{:?} shares its output name with an earlier source; the later write wins", file);
            }
        }
    }
}
