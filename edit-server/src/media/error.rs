use shared::error::ErrorCode;
use thiserror::Error;

/// Errors from decoding, encoding and file handling of artifacts
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Parameters that do not fit the image being transformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl MediaError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            MediaError::Io(e) if e.kind() == std::io::ErrorKind::StorageFull => {
                ErrorCode::StorageFull
            }
            MediaError::Io(_) => ErrorCode::StorageError,
            MediaError::Image(image::ImageError::Encoding(_)) => ErrorCode::ImageEncodeFailed,
            MediaError::Image(image::ImageError::IoError(_)) => ErrorCode::StorageError,
            MediaError::Image(image::ImageError::Parameter(_))
            | MediaError::InvalidArgument(_) => ErrorCode::InvalidOperation,
            MediaError::Image(_) | MediaError::UnsupportedFormat(_) => {
                ErrorCode::ImageDecodeFailed
            }
        }
    }
}

pub type MediaResult<T> = Result<T, MediaError>;
