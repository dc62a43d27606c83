//! Unified error system for the image editing backend
//!
//! This module provides the error types handed to protocol layers:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Image errors
//! - 2xxx: History errors
//! - 3xxx: Upload / file errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::NoOperationsToUndo)
//!     .with_detail("image_id", "img1");
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(2002));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
