//! Unified error codes for the image editing backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Image errors
//! - 2xxx: History errors
//! - 3xxx: Upload / file errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Image ====================
    /// Image not found
    ImageNotFound = 1001,
    /// Image file could not be decoded
    ImageDecodeFailed = 1002,
    /// Image file could not be encoded
    ImageEncodeFailed = 1003,
    /// Operation parameters are invalid for this image
    InvalidOperation = 1004,

    // ==================== 2xxx: History ====================
    /// History sequence not found
    SequenceNotFound = 2001,
    /// Nothing to undo
    NoOperationsToUndo = 2002,
    /// Previous state missing from the history log
    PreviousStateNotFound = 2003,
    /// History artifact missing on disk
    HistoryFileMissing = 2004,

    // ==================== 3xxx: Upload / File ====================
    /// File extension not allowed
    UnsupportedFileType = 3001,
    /// File exceeds the upload limit
    FileTooLarge = 3002,
    /// Uploaded file is empty
    EmptyFile = 3003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Filesystem error
    StorageError = 9101,
    /// Storage full (disk space insufficient)
    StorageFull = 9102,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Image
            ErrorCode::ImageNotFound => "Image not found",
            ErrorCode::ImageDecodeFailed => "Image file could not be decoded",
            ErrorCode::ImageEncodeFailed => "Image file could not be encoded",
            ErrorCode::InvalidOperation => "Invalid operation parameters",

            // History
            ErrorCode::SequenceNotFound => "History sequence not found",
            ErrorCode::NoOperationsToUndo => "No operations to undo",
            ErrorCode::PreviousStateNotFound => "Previous state not found",
            ErrorCode::HistoryFileMissing => "History file missing",

            // Upload / File
            ErrorCode::UnsupportedFileType => "File type not allowed",
            ErrorCode::FileTooLarge => "File too large",
            ErrorCode::EmptyFile => "File is empty",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::StorageError => "Storage error",
            ErrorCode::StorageFull => "Storage full (disk space insufficient)",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Image
            1001 => Ok(ErrorCode::ImageNotFound),
            1002 => Ok(ErrorCode::ImageDecodeFailed),
            1003 => Ok(ErrorCode::ImageEncodeFailed),
            1004 => Ok(ErrorCode::InvalidOperation),

            // History
            2001 => Ok(ErrorCode::SequenceNotFound),
            2002 => Ok(ErrorCode::NoOperationsToUndo),
            2003 => Ok(ErrorCode::PreviousStateNotFound),
            2004 => Ok(ErrorCode::HistoryFileMissing),

            // Upload / File
            3001 => Ok(ErrorCode::UnsupportedFileType),
            3002 => Ok(ErrorCode::FileTooLarge),
            3003 => Ok(ErrorCode::EmptyFile),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),
            9101 => Ok(ErrorCode::StorageError),
            9102 => Ok(ErrorCode::StorageFull),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::Success,
        ErrorCode::Unknown,
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::InvalidRequest,
        ErrorCode::ImageNotFound,
        ErrorCode::ImageDecodeFailed,
        ErrorCode::ImageEncodeFailed,
        ErrorCode::InvalidOperation,
        ErrorCode::SequenceNotFound,
        ErrorCode::NoOperationsToUndo,
        ErrorCode::PreviousStateNotFound,
        ErrorCode::HistoryFileMissing,
        ErrorCode::UnsupportedFileType,
        ErrorCode::FileTooLarge,
        ErrorCode::EmptyFile,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
        ErrorCode::ConfigError,
        ErrorCode::StorageError,
        ErrorCode::StorageFull,
    ];

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ImageNotFound.code(), 1001);
        assert_eq!(ErrorCode::SequenceNotFound.code(), 2001);
        assert_eq!(ErrorCode::NoOperationsToUndo.code(), 2002);
        assert_eq!(ErrorCode::UnsupportedFileType.code(), 3001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
        assert_eq!(ErrorCode::StorageFull.code(), 9102);
    }

    #[test]
    fn test_every_code_converts_back() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(2999), Err(InvalidErrorCode(2999)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::NoOperationsToUndo).unwrap();
        assert_eq!(json, "2002");

        let code: ErrorCode = serde_json::from_str("2004").unwrap();
        assert_eq!(code, ErrorCode::HistoryFileMissing);

        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_messages_are_not_empty() {
        for code in ALL {
            assert!(!code.message().is_empty(), "{code:?} has no message");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::SequenceNotFound.to_string(), "2001");
        assert_eq!(InvalidErrorCode(42).to_string(), "invalid error code: 42");
    }
}
