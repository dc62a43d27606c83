//! Startup consistency sweep
//!
//! Run before the engine takes requests. Per image (under its lock):
//!
//! - a missing current artifact is reported as an inconsistency (not healed),
//! - a missing thumbnail is regenerated,
//! - artifact files named after the image but referenced by neither the
//!   image row nor its log are deleted (left behind by a crash between
//!   writing an artifact and committing it).
//!
//! Files named after an image id with no row at all are deleted as well, and
//! the scratch directory is emptied.

use super::engine::HistoryEngine;
use super::error::HistoryResult;
use crate::db::repository::{history, image};
use crate::media::storage::owner_of;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub images_checked: usize,
    /// Images whose current artifact is gone
    pub missing_current: Vec<String>,
    pub thumbnails_regenerated: usize,
    pub orphans_removed: usize,
    /// Staged uploads abandoned mid-write
    pub temp_files_removed: usize,
}

pub struct Recovery {
    engine: HistoryEngine,
}

impl Recovery {
    pub fn new(engine: HistoryEngine) -> Self {
        Self { engine }
    }

    pub async fn run(&self) -> HistoryResult<RecoveryReport> {
        let mut report = RecoveryReport {
            temp_files_removed: self.engine.store().clear_temp().await?,
            ..Default::default()
        };

        // Group artifact files by owning image id.
        let mut files_by_owner: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in self.engine.store().list_files().await? {
            if let Some(owner) = owner_of(&path) {
                files_by_owner.entry(owner).or_default().push(path);
            }
        }

        let images = image::list_all(self.engine.pool()).await?;
        let mut seen = HashSet::new();
        for record in images {
            seen.insert(record.id.clone());
            let files = files_by_owner.remove(&record.id).unwrap_or_default();
            self.check_image(&record.id, files, &mut report).await?;
            report.images_checked += 1;
        }

        // Owners with no image row
        for (owner, files) in files_by_owner {
            if seen.contains(&owner) {
                continue;
            }
            let _guard = self.engine.locks().acquire(&owner).await;
            if image::find_by_id(self.engine.pool(), &owner).await?.is_some() {
                continue;
            }
            for path in files {
                if self.engine.store().remove(&path).await? {
                    tracing::info!(image_id = %owner, path = %path.display(), "Removed artifact of deleted image");
                    report.orphans_removed += 1;
                }
            }
        }

        if report.missing_current.is_empty() {
            tracing::info!(
                images = report.images_checked,
                thumbnails = report.thumbnails_regenerated,
                orphans = report.orphans_removed,
                temp_files = report.temp_files_removed,
                "Recovery sweep complete"
            );
        } else {
            tracing::error!(
                images = report.images_checked,
                missing = report.missing_current.len(),
                "Recovery sweep found images without a current artifact"
            );
        }
        Ok(report)
    }

    async fn check_image(
        &self,
        image_id: &str,
        files: Vec<PathBuf>,
        report: &mut RecoveryReport,
    ) -> HistoryResult<()> {
        let _guard = self.engine.locks().acquire(image_id).await;
        let pool = self.engine.pool();
        let store = self.engine.store();

        // Re-read under the lock
        let Some(record) = image::find_by_id(pool, image_id).await? else {
            return Ok(());
        };
        let records = history::list(pool, image_id).await?;

        let mut referenced: HashSet<PathBuf> = HashSet::new();
        referenced.insert(PathBuf::from(&record.original_path));
        referenced.insert(PathBuf::from(&record.current_path));
        if let Some(thumb) = &record.thumbnail_path {
            referenced.insert(PathBuf::from(thumb));
        }
        for r in &records {
            referenced.insert(PathBuf::from(&r.input_path));
            referenced.insert(PathBuf::from(&r.output_path));
        }

        let thumbnail_target = store.thumbnail_path(
            image_id,
            &super::engine::thumbnail_extension(&record),
        );
        for path in files {
            if referenced.contains(&path) || path == thumbnail_target {
                continue;
            }
            if store.remove(&path).await? {
                tracing::info!(image_id = %image_id, path = %path.display(), "Removed orphaned artifact");
                report.orphans_removed += 1;
            }
        }

        if !store.exists(&record.current_path).await {
            tracing::error!(
                image_id = %image_id,
                path = %record.current_path,
                "Current artifact missing on disk"
            );
            report.missing_current.push(image_id.to_string());
            return Ok(());
        }

        let thumbnail_ok = match &record.thumbnail_path {
            Some(path) => store.exists(path).await,
            None => false,
        };
        if !thumbnail_ok
            && self
                .engine
                .refresh_thumbnail(&record, &record.current_path)
                .await
                .is_some()
        {
            report.thumbnails_regenerated += 1;
        }

        Ok(())
    }
}
