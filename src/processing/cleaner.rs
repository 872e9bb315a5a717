//! Destination directory preparation

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{IoContext, Result, ResizeError};

/// Empties a destination tree of files, leaving its directories in place
pub struct Cleaner;

impl Cleaner {
    /// Remove every file under `root`. A missing root is created empty.
    ///
    /// Stops at the first file that cannot be removed; whatever was deleted
    /// before that stays deleted. Returns the number of files removed.
    pub fn clean<P: AsRef<Path>>(root: P) -> Result<usize> {
        let root = root.as_ref();
        if !root.exists() {
            ensure_directory(root)?;
            info!("Created empty destination {:?}", root);
            return Ok(0);
        }
        if !root.is_dir() {
            return Err(ResizeError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::Other, "destination is not a directory"),
            ));
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| ResizeError::walk(root, e))?;
            if !entry.file_type().is_dir() {
                files.push(entry.into_path());
            }
        }

        for file in &files {
            debug!("Removing {:?}", file);
            std::fs::remove_file(file).with_path(file)?;
        }

        info!("Removed {} files from {:?}", files.len(), root);
        Ok(files.len())
    }
}

/// Create `dir` (and parents) if it is not already there
pub fn ensure_directory<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).with_path(dir)
}
