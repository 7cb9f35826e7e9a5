//! Client-side image downscaling before upload.
//!
//! Stretches the source to an exact raster (aspect ratio is not preserved)
//! and re-encodes it as JPEG, bounding the upload to a few kilobytes.

use crate::config::PreprocessConfig;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ExtendedColorType;
use medai_shared::{EncodedImage, ScreeningError};
use tracing::debug;

pub const DEFAULT_WIDTH: u32 = 100;
pub const DEFAULT_HEIGHT: u32 = 75;
pub const DEFAULT_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreprocessor {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl From<&PreprocessConfig> for ImagePreprocessor {
    fn from(config: &PreprocessConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            quality: config.quality,
        }
    }
}

impl ImagePreprocessor {
    /// Downscale with this preprocessor's target size
    pub fn process(&self, source: &[u8]) -> Result<EncodedImage, ScreeningError> {
        resize_with_quality(source, self.width, self.height, self.quality)
    }

    /// Same as `process`, on the blocking pool
    pub async fn process_blocking(&self, source: Vec<u8>) -> Result<EncodedImage, ScreeningError> {
        let this = *self;
        tokio::task::spawn_blocking(move || this.process(&source))
            .await
            .map_err(|e| ScreeningError::Encode(format!("preprocess task failed: {}", e)))?
    }
}

/// Scale `source` to exactly `width` x `height` and encode as JPEG at the
/// default quality.
pub fn resize(source: &[u8], width: u32, height: u32) -> Result<EncodedImage, ScreeningError> {
    resize_with_quality(source, width, height, DEFAULT_QUALITY)
}

pub fn resize_with_quality(
    source: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<EncodedImage, ScreeningError> {
    if width == 0 || height == 0 {
        return Err(ScreeningError::Encode(format!(
            "target size must be non-zero, got {}x{}",
            width, height
        )));
    }

    let decoded = image::load_from_memory(source)
        .map_err(|e| ScreeningError::Encode(format!("decode failed: {}", e)))?;

    let rgb = decoded
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ScreeningError::Encode(format!("jpeg encoding failed: {}", e)))?;

    if bytes.is_empty() {
        return Err(ScreeningError::Encode("encoder produced no output".to_string()));
    }

    debug!(
        source_bytes = source.len(),
        encoded_bytes = bytes.len(),
        width,
        height,
        "image downscaled"
    );

    Ok(EncodedImage {
        bytes,
        width,
        height,
        mime: "image/jpeg",
    })
}
