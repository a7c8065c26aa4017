//! Image buffer wrapper and resize normalization for screenshot data
//!
//! Browsers can produce full-page screenshots far larger than downstream
//! consumers accept. [`normalize_png`] caps both axes at a maximum dimension,
//! preserving aspect ratio, and leaves smaller images byte-for-byte untouched.
//!
//! # Examples
//!
//! ```
//! use webshot_core::capture::image_buffer::{normalize_png, ImageBuffer};
//!
//! let png = ImageBuffer::from_test_pattern(400, 200).to_png().unwrap();
//!
//! let normalized = normalize_png(&png, 100).unwrap();
//! assert_eq!(normalized.dimensions(), (100, 50));
//! assert!(normalized.resized);
//! ```

use std::io::Cursor;

use image::{
    GenericImageView, ImageEncoder, ImageFormat, ImageReader,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::error::{CaptureError, CaptureResult};

/// Wrapper around `image::DynamicImage` with the operations the capture
/// pipeline needs
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    inner: image::DynamicImage,
}

impl ImageBuffer {
    /// Creates a new ImageBuffer from a DynamicImage
    pub fn new(image: image::DynamicImage) -> Self {
        Self { inner: image }
    }

    /// Decodes PNG bytes
    pub fn from_png(bytes: &[u8]) -> CaptureResult<Self> {
        image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map(Self::new)
            .map_err(|e| CaptureError::ImageMetadataError {
                reason: e.to_string(),
            })
    }

    /// Returns the dimensions of the image as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// Resizes to exactly `width` x `height` using Lanczos3 filtering
    pub fn resize_exact(&self, width: u32, height: u32) -> Self {
        Self::new(self.inner.resize_exact(
            width.max(1),
            height.max(1),
            image::imageops::FilterType::Lanczos3,
        ))
    }

    /// Encodes the image as PNG
    pub fn to_png(&self) -> CaptureResult<Vec<u8>> {
        let mut output = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            Cursor::new(&mut output),
            CompressionType::Default,
            FilterType::Adaptive,
        );

        let rgba = self.inner.to_rgba8();
        let (width, height) = rgba.dimensions();

        encoder
            .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .map_err(|e| CaptureError::ImageResizeError {
                width,
                height,
                reason: e.to_string(),
            })?;

        Ok(output)
    }

    /// Creates a vertical blue-to-cyan gradient, used by the mock engine and
    /// tests in place of a real screenshot
    pub fn from_test_pattern(width: u32, height: u32) -> Self {
        use image::{ImageBuffer as ImgBuf, Rgba};

        let start_color = Rgba([0u8, 0u8, 255u8, 255u8]);
        let end_color = Rgba([0u8, 255u8, 255u8, 255u8]);

        let img = ImgBuf::from_fn(width, height, |_x, y| {
            let ratio = y as f32 / height.max(1) as f32;
            Rgba([
                (start_color[0] as f32 * (1.0 - ratio) + end_color[0] as f32 * ratio) as u8,
                (start_color[1] as f32 * (1.0 - ratio) + end_color[1] as f32 * ratio) as u8,
                (start_color[2] as f32 * (1.0 - ratio) + end_color[2] as f32 * ratio) as u8,
                255,
            ])
        });

        Self::new(image::DynamicImage::ImageRgba8(img))
    }

    /// Consumes self and returns the inner DynamicImage
    pub fn into_inner(self) -> image::DynamicImage {
        self.inner
    }
}

/// Output of [`normalize_png`]
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// PNG bytes, the input itself when no resize was needed
    pub data: Vec<u8>,
    /// Final width in pixels
    pub width: u32,
    /// Final height in pixels
    pub height: u32,
    /// Whether the image was downscaled
    pub resized: bool,
}

impl NormalizedImage {
    /// Final dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Reads PNG dimensions from the header without decoding pixel data
pub fn png_dimensions(bytes: &[u8]) -> CaptureResult<(u32, u32)> {
    ImageReader::with_format(Cursor::new(bytes), ImageFormat::Png)
        .into_dimensions()
        .map_err(|e| CaptureError::ImageMetadataError {
            reason: e.to_string(),
        })
}

/// Target dimensions when `width` x `height` exceeds `max_dimension`.
///
/// Returns `None` when both axes already fit. Otherwise the scale is
/// `min(max/w, max/h)` and each axis is floored, never below 1.
///
/// ```
/// use webshot_core::capture::image_buffer::scaled_dimensions;
///
/// assert_eq!(scaled_dimensions(16000, 8000, 8000), Some((8000, 4000)));
/// assert_eq!(scaled_dimensions(8000, 8000, 8000), None);
/// ```
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }

    let max = f64::from(max_dimension);
    let scale = (max / f64::from(width)).min(max / f64::from(height));
    let new_width = (f64::from(width) * scale).floor() as u32;
    let new_height = (f64::from(height) * scale).floor() as u32;

    Some((new_width.clamp(1, max_dimension), new_height.clamp(1, max_dimension)))
}

/// Caps a PNG screenshot at `max_dimension` pixels on either axis.
///
/// - Unreadable input fails with `ImageMetadataError`.
/// - Images that already fit are returned unchanged.
/// - Oversized images are downscaled and re-encoded; a decode or encode
///   failure at that point is an `ImageResizeError`.
pub fn normalize_png(bytes: &[u8], max_dimension: u32) -> CaptureResult<NormalizedImage> {
    let (width, height) = png_dimensions(bytes)?;

    let Some((new_width, new_height)) = scaled_dimensions(width, height, max_dimension) else {
        return Ok(NormalizedImage {
            data: bytes.to_vec(),
            width,
            height,
            resized: false,
        });
    };

    tracing::debug!(
        from_width = width,
        from_height = height,
        to_width = new_width,
        to_height = new_height,
        "Downscaling oversized screenshot"
    );

    let decoded = ImageBuffer::from_png(bytes).map_err(|e| CaptureError::ImageResizeError {
        width,
        height,
        reason: e.to_string(),
    })?;
    let data = decoded
        .resize_exact(new_width, new_height)
        .to_png()
        .map_err(|e| CaptureError::ImageResizeError {
            width,
            height,
            reason: e.to_string(),
        })?;

    Ok(NormalizedImage {
        data,
        width: new_width,
        height: new_height,
        resized: true,
    })
}
