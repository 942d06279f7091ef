//! Decode, aspect-ratio preserving resize, and JPEG re-encode.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

use crate::config::TransformConfig;
use crate::error::{ConfigError, ItemError, ItemResult};

/// Resize policy applied identically to every item in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPolicy {
    /// Keep the decoded image at full size
    NoScale,
    /// Scale so the smaller side equals this many pixels
    MinDimension(u32),
}

/// Turns fetched bytes into the JPEG that lands on disk.
#[derive(Debug, Clone)]
pub struct ImageTransform {
    policy: TransformPolicy,
    jpeg_quality: u8,
}

impl ImageTransform {
    pub fn new(policy: TransformPolicy, jpeg_quality: u8) -> Self {
        Self {
            policy,
            jpeg_quality,
        }
    }

    pub fn from_config(config: &TransformConfig) -> Result<Self, ConfigError> {
        let policy = config.policy().ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "transform.min_dimension must be -1 or a positive pixel count (got {})",
                config.min_dimension
            ))
        })?;
        Ok(Self::new(policy, config.jpeg_quality))
    }

    pub fn policy(&self) -> TransformPolicy {
        self.policy
    }

    /// Decode `raw`, apply the resize policy, and encode as JPEG.
    ///
    /// `url` only labels errors.
    pub fn transform(&self, raw: &[u8], url: &str) -> ItemResult<Vec<u8>> {
        let image = decode(raw, url)?;
        let image = self.scale(image);
        encode_jpeg(&image, self.jpeg_quality, url)
    }

    /// Apply the resize policy to an already decoded image.
    pub fn scale(&self, image: DynamicImage) -> DynamicImage {
        let TransformPolicy::MinDimension(target) = self.policy else {
            return image;
        };
        let (width, height) = image.dimensions();
        match scaled_dimensions(width, height, target) {
            Some((w, h)) => {
                tracing::trace!("Resizing {}x{} -> {}x{}", width, height, w, h);
                image.resize_exact(w, h, FilterType::Lanczos3)
            }
            None => image,
        }
    }
}

/// Output size for a `MinDimension(target)` scale, or `None` when the image is
/// already the right size.
///
/// Each side is `floor(side * target / min(width, height))`, clamped to at
/// least one pixel.
pub fn scaled_dimensions(width: u32, height: u32, target: u32) -> Option<(u32, u32)> {
    let min_side = width.min(height);
    if min_side == 0 {
        return None;
    }
    let ratio = f64::from(target) / f64::from(min_side);
    if ratio == 1.0 {
        return None;
    }
    let w = (f64::from(width) * ratio) as u32;
    let h = (f64::from(height) * ratio) as u32;
    Some((w.max(1), h.max(1)))
}

fn decode(raw: &[u8], url: &str) -> ItemResult<DynamicImage> {
    let reader = image::ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| ItemError::Decode {
            url: url.to_string(),
            message: format!("Cannot detect image format: {e}"),
        })?;
    reader.decode().map_err(|e| ItemError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn encode_jpeg(image: &DynamicImage, quality: u8, url: &str) -> ItemResult<Vec<u8>> {
    // JPEG carries neither alpha nor 16-bit channels
    let converted;
    let image = match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        other => {
            converted = DynamicImage::ImageRgb8(other.to_rgb8());
            &converted
        }
    };

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| ItemError::Encode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    Ok(buffer)
}
