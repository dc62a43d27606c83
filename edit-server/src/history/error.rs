//! History engine errors

use crate::db::repository::RepoError;
use crate::media::MediaError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Sequence {sequence} not found for image {image_id}")]
    SequenceNotFound { image_id: String, sequence: i64 },

    #[error("No operations to undo for image {0}")]
    NoOperationsToUndo(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Previous state of sequence {sequence} not found for image {image_id}")]
    PreviousStateNotFound { image_id: String, sequence: i64 },

    #[error("History file missing: {0}")]
    HistoryFileMissing(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for HistoryError {
    fn from(err: sqlx::Error) -> Self {
        HistoryError::Repo(err.into())
    }
}

/// How a caller should treat a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Image id or sequence absent
    NotFound,
    /// Request rejected before anything was mutated
    PreconditionFailed,
    /// Log and filesystem disagree
    Inconsistency,
    /// Storage, database or codec failure
    Io,
}

impl HistoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HistoryError::ImageNotFound(_) | HistoryError::SequenceNotFound { .. } => {
                ErrorKind::NotFound
            }
            HistoryError::NoOperationsToUndo(_) | HistoryError::InvalidOperation(_) => {
                ErrorKind::PreconditionFailed
            }
            HistoryError::Media(MediaError::InvalidArgument(_)) => ErrorKind::PreconditionFailed,
            HistoryError::PreviousStateNotFound { .. } | HistoryError::HistoryFileMissing(_) => {
                ErrorKind::Inconsistency
            }
            HistoryError::Repo(RepoError::Decode(_)) => ErrorKind::Inconsistency,
            HistoryError::Media(_)
            | HistoryError::Io(_)
            | HistoryError::Repo(_)
            | HistoryError::Internal(_) => ErrorKind::Io,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            HistoryError::ImageNotFound(_) => ErrorCode::ImageNotFound,
            HistoryError::SequenceNotFound { .. } => ErrorCode::SequenceNotFound,
            HistoryError::NoOperationsToUndo(_) => ErrorCode::NoOperationsToUndo,
            HistoryError::InvalidOperation(_) => ErrorCode::InvalidOperation,
            HistoryError::PreviousStateNotFound { .. } => ErrorCode::PreviousStateNotFound,
            HistoryError::HistoryFileMissing(_) => ErrorCode::HistoryFileMissing,
            HistoryError::Media(e) => e.error_code(),
            HistoryError::Io(e) if e.kind() == std::io::ErrorKind::StorageFull => {
                ErrorCode::StorageFull
            }
            HistoryError::Io(_) => ErrorCode::StorageError,
            HistoryError::Repo(RepoError::NotFound(_)) => ErrorCode::NotFound,
            HistoryError::Repo(RepoError::Duplicate(_)) => ErrorCode::AlreadyExists,
            HistoryError::Repo(_) => ErrorCode::DatabaseError,
            HistoryError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        match err.kind() {
            ErrorKind::Inconsistency => {
                tracing::error!(error = %err, "History log and storage are inconsistent");
            }
            ErrorKind::Io => tracing::error!(error = %err, "History operation failed"),
            ErrorKind::NotFound | ErrorKind::PreconditionFailed => {}
        }

        let code = err.error_code();
        let app = AppError::with_message(code, err.to_string());
        match err {
            HistoryError::ImageNotFound(image_id) | HistoryError::NoOperationsToUndo(image_id) => {
                app.with_detail("image_id", image_id)
            }
            HistoryError::SequenceNotFound { image_id, sequence }
            | HistoryError::PreviousStateNotFound { image_id, sequence } => app
                .with_detail("image_id", image_id)
                .with_detail("sequence", sequence),
            HistoryError::HistoryFileMissing(path) => app.with_detail("path", path),
            _ => app,
        }
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;
