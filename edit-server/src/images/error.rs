//! Image service errors

use crate::db::repository::RepoError;
use crate::history::HistoryError;
use crate::media::MediaError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageServiceError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for ImageServiceError {
    fn from(err: sqlx::Error) -> Self {
        ImageServiceError::Repo(err.into())
    }
}

impl From<ImageServiceError> for AppError {
    fn from(err: ImageServiceError) -> Self {
        match err {
            ImageServiceError::UnsupportedFileType(ext) => {
                AppError::with_message(ErrorCode::UnsupportedFileType, format!("Unsupported file type: {ext}"))
                    .with_detail("extension", ext)
            }
            ImageServiceError::FileTooLarge { size, limit } => AppError::new(ErrorCode::FileTooLarge)
                .with_detail("size", size)
                .with_detail("limit", limit),
            ImageServiceError::EmptyFile => AppError::new(ErrorCode::EmptyFile),
            ImageServiceError::History(e) => e.into(),
            ImageServiceError::Media(e) => {
                let code = e.error_code();
                if code.http_status().is_server_error() {
                    tracing::error!(error = %e, "Image processing failed");
                }
                AppError::with_message(code, e.to_string())
            }
            ImageServiceError::Repo(e) => {
                tracing::error!(error = %e, "Image repository error");
                AppError::database(e.to_string())
            }
            ImageServiceError::Io(e) => {
                tracing::error!(error = %e, "Image storage error");
                AppError::storage(e.to_string())
            }
        }
    }
}

pub type ImageServiceResult<T> = Result<T, ImageServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_errors_map_to_codes() {
        let app: AppError = ImageServiceError::FileTooLarge { size: 30, limit: 20 }.into();
        assert_eq!(app.code, ErrorCode::FileTooLarge);
        assert_eq!(app.details.unwrap().get("limit").unwrap(), 20);

        let app: AppError = ImageServiceError::UnsupportedFileType(".exe".into()).into();
        assert_eq!(app.code, ErrorCode::UnsupportedFileType);

        let app: AppError =
            ImageServiceError::History(HistoryError::ImageNotFound("x".into())).into();
        assert_eq!(app.code, ErrorCode::ImageNotFound);
    }
}
