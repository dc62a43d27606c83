//! Thumbnail generation
//!
//! The output format follows the destination extension. JPEG outputs have
//! alpha flattened onto white.

use super::codec;
use super::error::MediaResult;
use super::transform::fit_within;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct ThumbnailGenerator {
    pub max_dimension: u32,
    pub quality: u8,
}

impl ThumbnailGenerator {
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            quality,
        }
    }

    /// Write a downsampled preview of `source` to `dest`.
    ///
    /// Never upscales. Re-encoding is not byte-stable, so callers must
    /// regenerate after every state change instead of comparing files.
    pub fn regenerate(&self, source: &Path, dest: &Path) -> MediaResult<()> {
        let format = codec::format_for_path(dest)?;
        let decoded = codec::open(source)?;
        let preview = fit_within(decoded.image, self.max_dimension, self.max_dimension);
        codec::save(&preview, dest, format, self.quality)?;
        Ok(())
    }
}
