//! Image Module
//!
//! Upload, built-in transforms, deletion and session purge.

pub mod error;
pub mod service;

pub use error::{ImageServiceError, ImageServiceResult};
pub use service::{ImageService, UploadRequest};
