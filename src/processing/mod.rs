//! Core image processing functionality

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{IoContext, Result, ResizeError};

pub mod cleaner;
pub mod finder;
pub mod formats;

pub use cleaner::*;
pub use finder::*;
pub use formats::*;

/// Positive multiplier applied to both image dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// Validate and wrap a scale factor
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ResizeError::InvalidScale { value })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Scale one dimension, truncating toward zero
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(self, dimension: u32) -> u32 {
        (f64::from(dimension) * self.0) as u32
    }
}

/// Target dimensions for a source image of `width` x `height`
pub fn calculate_dimensions(width: u32, height: u32, scale: ScaleFactor) -> (u32, u32) {
    (scale.apply(width), scale.apply(height))
}

/// Decode, resample and encode capability used by every transform
pub trait ImageCodec: Send + Sync {
    /// Decode a file into a pixel buffer
    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    /// Resample to exactly `width` x `height`
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Encode as an in-memory JPEG at `quality`
    fn encode_jpeg(&self, image: &DynamicImage, quality: u8, path: &Path) -> Result<Vec<u8>>;
}

/// `ImageCodec` backed by the `image` crate with Lanczos3 resampling
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCrateCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        let data = std::fs::read(path).with_path(path)?;
        image::load_from_memory(&data).map_err(|source| ResizeError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, FilterType::Lanczos3)
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: u8, path: &Path) -> Result<Vec<u8>> {
        // JPEG has no alpha channel
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
            .map_err(|source| ResizeError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(buffer)
    }
}

/// Result of transforming one source image
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub source: PathBuf,
    pub output: PathBuf,
    pub original_dimensions: (u32, u32),
    pub dimensions: (u32, u32),
    pub bytes_written: u64,
    pub processing_time: Duration,
}

/// Decode `source`, scale it and write `dest_root/<stem>.jpg`.
///
/// The encoded buffer goes to a temporary file in `dest_root` that is then
/// renamed over the output, so readers only ever see a complete JPEG and a
/// failed decode or encode leaves nothing behind.
pub fn transform_file(
    codec: &dyn ImageCodec,
    source: &Path,
    dest_root: &Path,
    scale: ScaleFactor,
) -> Result<TransformOutput> {
    let start_time = Instant::now();
    let output = output_path_for(source, dest_root)?;

    let image = codec.decode(source)?;
    let original_dimensions = (image.width(), image.height());
    let (width, height) = calculate_dimensions(image.width(), image.height(), scale);
    if width == 0 || height == 0 {
        return Err(ResizeError::EmptyOutput {
            path: source.to_path_buf(),
            width,
            height,
        });
    }

    debug!("Resizing {:?}: {}x{} -> {}x{}",
           source, original_dimensions.0, original_dimensions.1, width, height);

    let resized = codec.resize(&image, width, height);
    drop(image);

    let encoded = codec.encode_jpeg(&resized, JPEG_QUALITY, source)?;
    write_atomically(&output, dest_root, &encoded)?;

    Ok(TransformOutput {
        source: source.to_path_buf(),
        output,
        original_dimensions,
        dimensions: (resized.width(), resized.height()),
        bytes_written: encoded.len() as u64,
        processing_time: start_time.elapsed(),
    })
}

fn write_atomically(output: &Path, dest_root: &Path, data: &[u8]) -> Result<()> {
    let mut staged = NamedTempFile::new_in(dest_root).with_path(dest_root)?;
    staged.write_all(data).with_path(staged.path())?;
    staged
        .persist(output)
        .map_err(|e| ResizeError::io(output, e.error))?;
    Ok(())
}
