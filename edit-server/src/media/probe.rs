//! Read dimensions and format straight from an artifact file

use super::codec::format_tag;
use super::error::{MediaError, MediaResult};
use image::ImageReader;
use shared::models::CurrentState;
use std::path::Path;

/// What an artifact actually is on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probed {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size: u64,
}

impl Probed {
    /// Current-state register for `path`; `size` overrides the probed size
    pub fn into_state(self, path: &Path, size: Option<i64>) -> CurrentState {
        CurrentState {
            path: path.to_string_lossy().into_owned(),
            size: size.unwrap_or(self.size as i64),
            width: i64::from(self.width),
            height: i64::from(self.height),
            format: self.format,
        }
    }
}

/// Probe header only; no full decode
pub fn probe(path: &Path) -> MediaResult<Probed> {
    let size = std::fs::metadata(path)?.len();
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| MediaError::UnsupportedFormat(path.display().to_string()))?;
    let (width, height) = reader.into_dimensions()?;
    Ok(Probed {
        width,
        height,
        format: format_tag(format),
        size,
    })
}
