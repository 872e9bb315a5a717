//! Accepted input formats and the fixed output format

use std::path::{Path, PathBuf};
use crate::error::{Result, ResizeError};

/// Extensions picked up from the source tree
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Every output is a JPEG with this extension
pub const OUTPUT_EXTENSION: &str = "jpg";

/// JPEG quality used for every output
pub const JPEG_QUALITY: u8 = 100;

/// Check if a file extension is accepted as input
pub fn is_supported_input_format(extension: &str) -> bool {
    SUPPORTED_INPUT_EXTENSIONS
        .iter()
        .any(|&fmt| fmt.eq_ignore_ascii_case(extension))
}

/// Check a path's extension against the accepted inputs
pub fn has_supported_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_supported_input_format)
}

/// `dest_root/<basename-without-extension>.jpg`
pub fn output_path_for<P: AsRef<Path>, Q: AsRef<Path>>(source: P, dest_root: Q) -> Result<PathBuf> {
    let source = source.as_ref();
    let stem = source.file_stem().ok_or_else(|| {
        ResizeError::io(
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source path has no file name"),
        )
    })?;

    let mut name = stem.to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    Ok(dest_root.as_ref().join(name))
}
