//! Pixel transforms backing the built-in operations

use super::codec;
use super::error::{MediaError, MediaResult};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use shared::models::{CompressionSettings, FlipDirection, Operation, OutputFormat};

const MIN_JPEG_QUALITY: u8 = 10;
const QUALITY_STEP: u8 = 5;
const MAX_QUALITY_ATTEMPTS: usize = 10;

/// Clockwise rotation by a right angle
pub fn rotate(image: DynamicImage, degrees: u16) -> MediaResult<DynamicImage> {
    match degrees {
        90 => Ok(image.rotate90()),
        180 => Ok(image.rotate180()),
        270 => Ok(image.rotate270()),
        other => Err(MediaError::InvalidArgument(format!(
            "rotation must be 90, 180 or 270 degrees, got {other}"
        ))),
    }
}

pub fn flip(image: DynamicImage, direction: FlipDirection) -> DynamicImage {
    match direction {
        FlipDirection::Horizontal => image.fliph(),
        FlipDirection::Vertical => image.flipv(),
    }
}

/// Exact resize (aspect ratio not preserved)
pub fn resize(image: DynamicImage, width: u32, height: u32) -> MediaResult<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidArgument(
            "width and height must be greater than 0".into(),
        ));
    }
    Ok(image.resize_exact(width, height, FilterType::Lanczos3))
}

pub fn crop(image: DynamicImage, x: u32, y: u32, width: u32, height: u32) -> MediaResult<DynamicImage> {
    let fits = width > 0
        && height > 0
        && x.checked_add(width).is_some_and(|r| r <= image.width())
        && y.checked_add(height).is_some_and(|b| b <= image.height());
    if !fits {
        return Err(MediaError::InvalidArgument(format!(
            "crop {width}x{height}+{x}+{y} exceeds image bounds {}x{}",
            image.width(),
            image.height()
        )));
    }
    Ok(image.crop_imm(x, y, width, height))
}

/// Downscale to fit inside the box, keeping aspect ratio. Never upscales.
pub fn fit_within(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if image.width() <= max_width && image.height() <= max_height {
        return image;
    }
    image.resize(max_width, max_height, FilterType::Lanczos3)
}

/// Apply a geometric operation. Other operations are produced elsewhere.
pub fn apply(image: DynamicImage, operation: &Operation) -> MediaResult<DynamicImage> {
    match operation {
        Operation::Rotate { degrees } => rotate(image, *degrees),
        Operation::Flip { direction } => Ok(flip(image, *direction)),
        Operation::Resize { width, height } => resize(image, *width, *height),
        Operation::Crop {
            x,
            y,
            width,
            height,
        } => crop(image, *x, *y, *width, *height),
        other => Err(MediaError::InvalidArgument(format!(
            "{} is not a pixel transform",
            other.operation_type()
        ))),
    }
}

/// Compressed encoding plus the quality it ended at
#[derive(Debug)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub quality: u8,
}

/// Fit into the settings' bounds and encode, lowering JPEG quality in steps
/// until the output is under the target size (or the floor is reached).
///
/// Lossless outputs (PNG, WebP) are encoded once.
pub fn compress(image: DynamicImage, settings: &CompressionSettings) -> MediaResult<Compressed> {
    let format = match settings.format {
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Webp => ImageFormat::WebP,
    };
    let fitted = fit_within(image, settings.max_width, settings.max_height);

    let mut quality = settings.quality;
    let mut bytes = codec::encode(&fitted, format, quality)?;

    if let (Some(target_kb), ImageFormat::Jpeg) = (settings.target_size_kb, format) {
        let target = u64::from(target_kb) * 1024;
        let mut attempts = 0;
        while bytes.len() as u64 > target
            && quality > MIN_JPEG_QUALITY
            && attempts < MAX_QUALITY_ATTEMPTS
        {
            quality = quality.saturating_sub(QUALITY_STEP).max(MIN_JPEG_QUALITY);
            bytes = codec::encode(&fitted, format, quality)?;
            attempts += 1;
        }
    }

    Ok(Compressed { bytes, quality })
}
