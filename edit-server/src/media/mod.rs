//! Media Module
//!
//! File-level helpers around the `image` crate: decode/encode, probing,
//! EXIF metadata, thumbnails, the built-in pixel transforms and the
//! artifact directory layout. Nothing here touches the database.

pub mod codec;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod storage;
pub mod thumbnail;
pub mod transform;

pub use error::{MediaError, MediaResult};
pub use probe::{Probed, probe};
pub use storage::ArtifactStore;
pub use thumbnail::ThumbnailGenerator;
