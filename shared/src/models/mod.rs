//! Data models
//!
//! Shared between edit-server and its protocol layers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod compression;
pub mod history;
pub mod image;

// Re-exports
pub use compression::*;
pub use history::*;
pub use image::*;
