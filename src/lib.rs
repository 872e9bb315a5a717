//! batchresize - Batch JPEG Downsizer
//!
//! Walks a directory tree for PNG and JPEG images, scales each one by a
//! uniform factor and writes the results into a single destination
//! directory as quality-100 JPEGs.
//!
//! # Modes
//!
//! - **Sequential**: one file at a time; the first error aborts the batch.
//! - **Concurrent**: one task per file, joined at the end. Failures and
//!   cancellations are recorded per task in a [`BatchReport`] and never stop
//!   sibling tasks.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use batchresize::{BatchResizer, CancellationToken, ResizeConfig, ScaleFactor};
//! use std::path::Path;
//!
//! # async fn demo() -> batchresize::Result<()> {
//! let resizer = BatchResizer::new(ResizeConfig::new());
//! let report = resizer.resize_all_concurrently(
//!     Path::new("photos"),
//!     Path::new("thumbs"),
//!     ScaleFactor::new(0.25)?,
//!     &CancellationToken::new(),
//! ).await?;
//!
//! println!("{} of {} images resized", report.completed(), report.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, LoggingConfig, ResizeConfig};
pub use error::{Result, ResizeError};
pub use parallel::{BatchReport, BatchResizer, CancellationToken, TaskOutcome, TaskStatus};
pub use processing::{Cleaner, Finder, ImageCodec, ImageCrateCodec, ScaleFactor};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    };

    if installed {
        info!("batchresize v{} initialized", VERSION);
    }
}
