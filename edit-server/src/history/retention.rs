//! Bounded history retention
//!
//! Keeps the newest `max_entries` records per image by dropping the oldest
//! ones. Trimming stops at the record whose output is the current artifact,
//! and an artifact file is only deleted once nothing the image still
//! references points at it.

use super::engine::{HistoryEngine, is_referenced};
use super::error::HistoryResult;
use crate::db::repository::{history, image};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimReport {
    pub images: usize,
    pub records_removed: usize,
    pub files_removed: usize,
}

impl std::ops::AddAssign for TrimReport {
    fn add_assign(&mut self, other: Self) {
        self.images += other.images;
        self.records_removed += other.records_removed;
        self.files_removed += other.files_removed;
    }
}

#[derive(Clone)]
pub struct Retention {
    engine: HistoryEngine,
    max_entries: usize,
}

impl Retention {
    pub fn new(engine: HistoryEngine, max_entries: usize) -> Self {
        if max_entries == 0 {
            tracing::warn!("UNDO_STACK_LIMIT is 0, keeping one record per image");
        }
        Self {
            engine,
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Trim one image's log
    pub async fn trim_image(&self, image_id: &str) -> HistoryResult<TrimReport> {
        let _guard = self.engine.locks().acquire(image_id).await;
        let pool = self.engine.pool();

        let Some(image) = image::find_by_id(pool, image_id).await? else {
            return Ok(TrimReport::default());
        };
        let records = history::list(pool, image_id).await?;
        if records.len() <= self.max_entries {
            return Ok(TrimReport::default());
        }

        // Only a prefix of the log is trimmed, and it ends before the record
        // whose output is current, so the retained sequences stay contiguous.
        let excess = records.len() - self.max_entries;
        let doomed: Vec<_> = records[..excess]
            .iter()
            .take_while(|r| r.output_path != image.current_path)
            .collect();
        if doomed.is_empty() {
            return Ok(TrimReport::default());
        }

        let mut tx = pool.begin().await?;
        for record in &doomed {
            history::delete(&mut *tx, record).await?;
        }
        tx.commit().await?;

        let doomed_ids: HashSet<i64> = doomed.iter().map(|r| r.id).collect();
        let remaining: Vec<_> = records
            .iter()
            .filter(|r| !doomed_ids.contains(&r.id))
            .collect();

        let mut files_removed = 0;
        for record in &doomed {
            let path = &record.output_path;
            if is_referenced(path, remaining.iter().copied(), &image, &image.current_path) {
                continue;
            }
            match self.engine.store().remove(path).await {
                Ok(true) => files_removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(image_id = %image_id, path = %path, error = %e, "Failed to delete trimmed artifact"),
            }
        }

        tracing::debug!(
            image_id = %image_id,
            records_removed = doomed.len(),
            files_removed,
            "History trimmed"
        );
        Ok(TrimReport {
            images: 1,
            records_removed: doomed.len(),
            files_removed,
        })
    }

    /// Trim every image whose log is over the cap
    pub async fn trim_all(&self) -> HistoryResult<TrimReport> {
        let ids = history::image_ids_exceeding(self.engine.pool(), self.max_entries).await?;
        let mut report = TrimReport::default();
        for image_id in ids {
            match self.trim_image(&image_id).await {
                Ok(r) => report += r,
                Err(e) => {
                    tracing::warn!(image_id = %image_id, error = %e, "History trim failed")
                }
            }
        }
        Ok(report)
    }

    /// Periodic trimmer; returns when `shutdown` is cancelled
    pub async fn run_periodic(self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.trim_all().await {
                        Ok(report) if report.records_removed > 0 => tracing::info!(
                            images = report.images,
                            records_removed = report.records_removed,
                            files_removed = report.files_removed,
                            "Retention pass complete"
                        ),
                        Ok(_) => tracing::debug!("Retention pass: nothing to trim"),
                        Err(e) => tracing::error!(error = %e, "Retention pass failed"),
                    }
                }
            }
        }
        tracing::debug!("Retention trimmer stopped");
    }
}
