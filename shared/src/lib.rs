//! Shared types for the image editing backend
//!
//! Error types, response structures and data models used by the server
//! and by whatever protocol layer is mounted on top of it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
