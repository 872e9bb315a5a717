//! Source image discovery

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, ResizeError};
use super::formats::has_supported_extension;

/// Recursively enumerates PNG/JPEG files under a source directory
pub struct Finder;

impl Finder {
    /// Collect every supported image under `root`, in traversal order.
    ///
    /// The whole list is materialized before returning so callers know the
    /// batch size up front.
    pub fn find<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ResizeError::not_found(root));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| ResizeError::walk(root, e))?;

            if entry.file_type().is_file() && has_supported_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!("Found {} images under {:?}", files.len(), root);
        Ok(files)
    }
}
