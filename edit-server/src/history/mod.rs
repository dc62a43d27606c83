//! History Module
//!
//! Version log, current-state adoption, undo/restore, retention and the
//! startup recovery sweep.

pub mod engine;
pub mod error;
pub mod lock;
pub mod recovery;
pub mod retention;

pub use engine::{
    HistoryEngine, HistoryState, ProducedArtifact, Restored, Reverted, SourceArtifact,
};
pub use error::{ErrorKind, HistoryError, HistoryResult};
pub use lock::{ImageGuard, ImageLocks};
pub use recovery::{Recovery, RecoveryReport};
pub use retention::{Retention, TrimReport};
