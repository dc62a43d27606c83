//! Operation / version history engine
//!
//! Keeps three things consistent for every image:
//!
//! - the `history` log (append-only, contiguous sequences from 1),
//! - the current-state register on the `images` row,
//! - the artifact files on disk, including the thumbnail.
//!
//! Every mutating call runs under the image's lock. Log mutation and
//! `adopt` commit in one transaction; file deletion and thumbnail refresh
//! happen after the commit.

use super::error::{HistoryError, HistoryResult};
use super::lock::ImageLocks;
use crate::db::repository::{history, image};
use crate::media::storage::{extension_of, path_string};
use crate::media::{ArtifactStore, ThumbnailGenerator, probe};
use serde::Serialize;
use shared::models::{CurrentState, ImageRecord, Operation, VersionCreate, VersionRecord};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Input handed to an artifact producer
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    pub image_id: String,
    /// Artifact that is current right now
    pub path: PathBuf,
    pub format: String,
    pub width: i64,
    pub height: i64,
    label: &'static str,
    store: ArtifactStore,
}

impl SourceArtifact {
    /// Fresh output path for this operation with the given extension
    pub fn output_path(&self, ext: &str) -> PathBuf {
        self.store.artifact_path(&self.image_id, self.label, ext)
    }

    /// Output path keeping the source's extension
    pub fn output_path_same_ext(&self) -> PathBuf {
        self.output_path(&extension_of(&self.path))
    }
}

/// What a producer wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedArtifact {
    pub path: PathBuf,
    pub size: i64,
    pub width: i64,
    pub height: i64,
    pub format: String,
}

impl ProducedArtifact {
    /// Describe a written file by reading it back
    pub fn probe(path: PathBuf) -> HistoryResult<Self> {
        let probed = probe(&path)?;
        Ok(Self {
            size: probed.size as i64,
            width: i64::from(probed.width),
            height: i64::from(probed.height),
            format: probed.format,
            path,
        })
    }

    fn into_state(self) -> CurrentState {
        CurrentState {
            path: path_string(&self.path),
            size: self.size,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

/// Result of an undo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reverted {
    pub path: String,
    /// Sequence the image is now at (0 = original upload)
    pub sequence: i64,
}

/// Result of a restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Restored {
    pub path: String,
    pub size: i64,
}

/// Where an image stands relative to its log
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryState<'a> {
    NoHistory,
    /// Current artifact is the tail's output; undo is available
    AtTail(&'a VersionRecord),
    /// Current artifact is not the tail's output (after a restore)
    Diverged { tail: &'a VersionRecord },
}

impl<'a> HistoryState<'a> {
    /// `records` must be ascending by sequence
    pub fn classify(image: &ImageRecord, records: &'a [VersionRecord]) -> Self {
        match records.last() {
            None => HistoryState::NoHistory,
            Some(tail) if tail.output_path == image.current_path => HistoryState::AtTail(tail),
            Some(tail) => HistoryState::Diverged { tail },
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self, HistoryState::AtTail(_))
    }
}

/// Whether `path` is still needed by the image once `records` remain
pub(crate) fn is_referenced<'r>(
    path: &str,
    records: impl IntoIterator<Item = &'r VersionRecord>,
    image: &ImageRecord,
    current_path: &str,
) -> bool {
    path == current_path
        || path == image.original_path
        || image.thumbnail_path.as_deref() == Some(path)
        || records
            .into_iter()
            .any(|r| r.input_path == path || r.output_path == path)
}

#[derive(Clone)]
pub struct HistoryEngine {
    pool: SqlitePool,
    store: ArtifactStore,
    thumbnails: ThumbnailGenerator,
    locks: ImageLocks,
}

impl HistoryEngine {
    pub fn new(
        pool: SqlitePool,
        store: ArtifactStore,
        thumbnails: ThumbnailGenerator,
        locks: ImageLocks,
    ) -> Self {
        Self {
            pool,
            store,
            thumbnails,
            locks,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn locks(&self) -> &ImageLocks {
        &self.locks
    }

    pub async fn get_image(&self, image_id: &str) -> HistoryResult<ImageRecord> {
        image::find_by_id(&self.pool, image_id)
            .await?
            .ok_or_else(|| HistoryError::ImageNotFound(image_id.to_string()))
    }

    /// Log for an image, ascending by sequence
    pub async fn get_history(&self, image_id: &str) -> HistoryResult<Vec<VersionRecord>> {
        self.get_image(image_id).await?;
        Ok(history::list(&self.pool, image_id).await?)
    }

    /// True iff the log is non-empty and the current artifact is the tail's output
    pub async fn can_undo(&self, image_id: &str) -> HistoryResult<bool> {
        let image = self.get_image(image_id).await?;
        let records = history::list(&self.pool, image_id).await?;
        Ok(HistoryState::classify(&image, &records).can_undo())
    }

    /// Run a forward operation.
    ///
    /// `produce` receives the current artifact and writes a new one. Only
    /// after it succeeds is the record appended and the artifact adopted,
    /// in a single transaction. If that transaction fails the new file is
    /// deleted again.
    pub async fn apply_operation<F, Fut>(
        &self,
        image_id: &str,
        operation: Operation,
        produce: F,
    ) -> HistoryResult<VersionRecord>
    where
        F: FnOnce(SourceArtifact) -> Fut,
        Fut: Future<Output = HistoryResult<ProducedArtifact>>,
    {
        operation
            .validate()
            .map_err(HistoryError::InvalidOperation)?;

        let _guard = self.locks.acquire(image_id).await;
        let image = self.get_image(image_id).await?;

        let source = SourceArtifact {
            image_id: image.id.clone(),
            path: PathBuf::from(&image.current_path),
            format: image.format.clone(),
            width: image.width,
            height: image.height,
            label: operation.artifact_label(),
            store: self.store.clone(),
        };
        let produced = produce(source).await?;

        if !self.store.exists(&produced.path).await {
            return Err(HistoryError::Internal(format!(
                "producer reported {} but the file does not exist",
                produced.path.display()
            )));
        }

        let state = produced.into_state();
        let entry = VersionCreate {
            image_id: image_id.to_string(),
            operation,
            input_path: image.current_path.clone(),
            output_path: state.path.clone(),
            file_size: state.size,
        };

        let record = match self.commit_forward(image_id, &entry, &state).await {
            Ok(record) => record,
            Err(e) => {
                if state.path != image.current_path {
                    self.store.discard(&state.path).await;
                }
                return Err(e);
            }
        };

        self.refresh_thumbnail(&image, &state.path).await;

        tracing::info!(
            image_id = %image_id,
            operation = record.operation.operation_type(),
            sequence = record.sequence,
            width = state.width,
            height = state.height,
            "Operation applied"
        );
        Ok(record)
    }

    async fn commit_forward(
        &self,
        image_id: &str,
        entry: &VersionCreate,
        state: &CurrentState,
    ) -> HistoryResult<VersionRecord> {
        let mut tx = self.pool.begin().await?;
        let record = history::append(&mut *tx, entry).await?;
        image::adopt(&mut *tx, image_id, state).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Revert to the state before the tail record and drop that record.
    pub async fn undo(&self, image_id: &str) -> HistoryResult<Reverted> {
        let _guard = self.locks.acquire(image_id).await;
        let image = self.get_image(image_id).await?;
        let records = history::list(&self.pool, image_id).await?;

        let tail = match HistoryState::classify(&image, &records) {
            HistoryState::AtTail(tail) => tail.clone(),
            _ => return Err(HistoryError::NoOperationsToUndo(image_id.to_string())),
        };

        let (target_path, target_size) = undo_target(&image, &records, &tail)?;
        let target = self.read_state(&target_path, target_size).await?;

        let mut tx = self.pool.begin().await?;
        image::adopt(&mut *tx, image_id, &target).await?;
        history::delete(&mut *tx, &tail).await?;
        tx.commit().await?;

        let remaining = records.iter().filter(|r| r.id != tail.id);
        if !is_referenced(&tail.output_path, remaining, &image, &target.path) {
            self.store.discard(&tail.output_path).await;
        } else {
            tracing::debug!(
                image_id = %image_id,
                path = %tail.output_path,
                "Undone artifact still referenced, keeping file"
            );
        }

        self.refresh_thumbnail(&image, &target.path).await;

        let sequence = tail.sequence - 1;
        tracing::info!(image_id = %image_id, sequence, "Undo applied");
        Ok(Reverted {
            path: target.path,
            sequence,
        })
    }

    /// Jump to the output of any record without touching the log.
    pub async fn restore_to_sequence(
        &self,
        image_id: &str,
        sequence: i64,
    ) -> HistoryResult<Restored> {
        let _guard = self.locks.acquire(image_id).await;
        let image = self.get_image(image_id).await?;

        let record = history::find_by_sequence(&self.pool, image_id, sequence)
            .await?
            .ok_or_else(|| HistoryError::SequenceNotFound {
                image_id: image_id.to_string(),
                sequence,
            })?;

        let target = self
            .read_state(&record.output_path, Some(record.file_size))
            .await?;
        image::adopt(&self.pool, image_id, &target).await?;

        self.refresh_thumbnail(&image, &target.path).await;

        tracing::info!(image_id = %image_id, sequence, "Restored to sequence");
        Ok(Restored {
            path: target.path,
            size: target.size,
        })
    }

    /// Current-state register for an artifact, read from the file itself
    async fn read_state(&self, path: &str, size: Option<i64>) -> HistoryResult<CurrentState> {
        if !self.store.exists(path).await {
            return Err(HistoryError::HistoryFileMissing(path.to_string()));
        }
        let owned = PathBuf::from(path);
        let state = tokio::task::spawn_blocking(move || {
            probe(&owned).map(|probed| probed.into_state(&owned, size))
        })
        .await
        .map_err(|e| HistoryError::Internal(format!("probe task failed: {e}")))??;
        Ok(state)
    }

    /// Replace the thumbnail with one rendered from `source`.
    ///
    /// Failures are logged and leave `thumbnail_path` NULL; they never fail
    /// the state change that triggered them.
    pub(crate) async fn refresh_thumbnail(&self, image: &ImageRecord, source: &str) -> Option<String> {
        if let Some(old) = &image.thumbnail_path {
            self.store.discard(old).await;
        }

        let dest = self
            .store
            .thumbnail_path(&image.id, &thumbnail_extension(image));
        let generator = self.thumbnails;
        let src = PathBuf::from(source);
        let target = dest.clone();
        let rendered = tokio::task::spawn_blocking(move || generator.regenerate(&src, &target))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));

        let thumbnail = match rendered {
            Ok(()) => Some(path_string(&dest)),
            Err(e) => {
                tracing::warn!(image_id = %image.id, source = %source, error = %e, "Thumbnail regeneration failed");
                self.store.discard(&dest).await;
                None
            }
        };

        if let Err(e) = image::set_thumbnail(&self.pool, &image.id, thumbnail.as_deref()).await {
            tracing::warn!(image_id = %image.id, error = %e, "Failed to record thumbnail path");
        }
        thumbnail
    }
}

/// Thumbnails keep the extension of the original upload
pub(crate) fn thumbnail_extension(image: &ImageRecord) -> String {
    match extension_of(Path::new(&image.original_path)) {
        ext if ext.is_empty() => ".jpg".to_string(),
        ext => ext,
    }
}

/// Path and (if known) size of the state before `tail`
fn undo_target(
    image: &ImageRecord,
    records: &[VersionRecord],
    tail: &VersionRecord,
) -> HistoryResult<(String, Option<i64>)> {
    if tail.sequence == 1 {
        // A log emptied by retention and undo restarts at 1 on top of a
        // later artifact, whose size has to come from disk.
        let size = (tail.input_path == image.original_path).then_some(image.original_size);
        return Ok((tail.input_path.clone(), size));
    }
    if let Some(previous) = records.iter().find(|r| r.sequence == tail.sequence - 1) {
        return Ok((previous.output_path.clone(), Some(previous.file_size)));
    }
    // Retention trimmed everything before the tail: its input is the
    // previous state, and the trimmer keeps that file because it is
    // referenced.
    if records.first().is_some_and(|oldest| oldest.id == tail.id) {
        return Ok((tail.input_path.clone(), None));
    }
    Err(HistoryError::PreviousStateNotFound {
        image_id: image.id.clone(),
        sequence: tail.sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_at(current: &str) -> ImageRecord {
        ImageRecord {
            id: "img".into(),
            session_id: None,
            original_filename: "o.png".into(),
            original_size: 100,
            original_path: "orig".into(),
            current_path: current.into(),
            current_size: 1,
            width: 1,
            height: 1,
            format: "PNG".into(),
            thumbnail_path: Some("thumb".into()),
            exif: None,
            gps_latitude: None,
            gps_longitude: None,
            gps_altitude: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn record(sequence: i64, input: &str, output: &str) -> VersionRecord {
        VersionRecord {
            id: sequence * 10,
            image_id: "img".into(),
            operation: Operation::Rotate { degrees: 90 },
            input_path: input.into(),
            output_path: output.into(),
            file_size: sequence,
            created_at: 0,
            sequence,
        }
    }

    #[test]
    fn test_classify() {
        let records = vec![record(1, "orig", "v1"), record(2, "v1", "v2")];
        assert_eq!(
            HistoryState::classify(&image_at("orig"), &[]),
            HistoryState::NoHistory
        );
        assert!(HistoryState::classify(&image_at("v2"), &records).can_undo());

        let diverged = HistoryState::classify(&image_at("v1"), &records);
        assert!(matches!(diverged, HistoryState::Diverged { tail } if tail.sequence == 2));
        assert!(!diverged.can_undo());
    }

    #[test]
    fn test_undo_target_first_record_is_original() {
        let records = vec![record(1, "orig", "v1")];
        let target = undo_target(&image_at("v1"), &records, &records[0]).unwrap();
        assert_eq!(target, ("orig".to_string(), Some(100)));
    }

    #[test]
    fn test_undo_target_restarted_log_reads_size_from_disk() {
        let records = vec![record(1, "v1", "v9")];
        let target = undo_target(&image_at("v9"), &records, &records[0]).unwrap();
        assert_eq!(target, ("v1".to_string(), None));
    }

    #[test]
    fn test_undo_target_previous_output() {
        let records = vec![record(1, "orig", "v1"), record(2, "v1", "v2")];
        let target = undo_target(&image_at("v2"), &records, &records[1]).unwrap();
        assert_eq!(target, ("v1".to_string(), Some(1)));
    }

    #[test]
    fn test_undo_target_after_trim_uses_tail_input() {
        let records = vec![record(5, "v4", "v5")];
        let target = undo_target(&image_at("v5"), &records, &records[0]).unwrap();
        assert_eq!(target, ("v4".to_string(), None));
    }

    #[test]
    fn test_undo_target_gap_is_inconsistency() {
        let records = vec![record(1, "orig", "v1"), record(3, "v2", "v3")];
        let err = undo_target(&image_at("v3"), &records, &records[1]).unwrap_err();
        assert!(matches!(
            err,
            HistoryError::PreviousStateNotFound { sequence: 3, .. }
        ));
    }

    #[test]
    fn test_is_referenced() {
        let image = image_at("v1");
        let remaining = vec![record(1, "orig", "v1")];
        assert!(is_referenced("v1", &remaining, &image, "v1"));
        assert!(is_referenced("orig", &[], &image, "v1"));
        assert!(is_referenced("thumb", &[], &image, "v1"));
        assert!(!is_referenced("v2", &remaining, &image, "v1"));
    }
}
