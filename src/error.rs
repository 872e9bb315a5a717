//! Error types and handling for batchresize

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for batchresize operations
pub type Result<T> = std::result::Result<T, ResizeError>;

/// Main error type for batchresize operations
#[derive(Debug, Error)]
pub enum ResizeError {
    /// Source directory does not exist
    #[error("Source directory not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Filesystem errors tied to a specific path
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source file is not a decodable image
    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Encoder rejected the resized image
    #[error("Failed to encode {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Scaled dimensions collapse to zero pixels
    #[error("Scaled size of {path:?} is {width}x{height}, nothing to encode")]
    EmptyOutput {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    /// Task observed the cancellation signal before starting
    #[error("Cancelled before processing {path:?}")]
    Cancelled { path: PathBuf },

    /// Scale factor is not a positive finite number
    #[error("Invalid scale factor: {value} (must be a positive number)")]
    InvalidScale { value: f64 },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serde(String),

    /// A worker task could not be joined
    #[error("Task join error: {message}")]
    TaskJoin { message: String },
}

impl ResizeError {
    /// Create a new not found error
    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        Self::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convert a directory walk error, falling back to the walk root for the path
    pub fn walk<P: AsRef<Path>>(root: P, err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map_or_else(|| root.as_ref().to_path_buf(), Path::to_path_buf);
        Self::Io {
            path,
            source: err.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new task join error
    pub fn task_join<S: Into<String>>(message: S) -> Self {
        Self::TaskJoin {
            message: message.into(),
        }
    }

    /// Errors confined to a single file; a concurrent batch records these
    /// against the task and carries on.
    pub fn is_task_local(&self) -> bool {
        match self {
            Self::Io { .. }
            | Self::Decode { .. }
            | Self::Encode { .. }
            | Self::EmptyOutput { .. }
            | Self::Cancelled { .. } => true,

            Self::NotFound { .. }
            | Self::InvalidScale { .. }
            | Self::Config { .. }
            | Self::Serde(_)
            | Self::TaskJoin { .. } => false,
        }
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Get the associated file path if available
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Decode { path, .. }
            | Self::Encode { path, .. }
            | Self::EmptyOutput { path, .. }
            | Self::Cancelled { path } => Some(path),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ResizeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serde(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ResizeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde(format!("YAML parsing error: {}", err))
    }
}

/// Attach a path to bare I/O results
pub trait IoContext<T> {
    fn with_path<P: AsRef<Path>>(self, path: P) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn with_path<P: AsRef<Path>>(self, path: P) -> Result<T> {
        self.map_err(|e| ResizeError::io(path, e))
    }
}
