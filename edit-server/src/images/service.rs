//! Image Service
//!
//! Upload, built-in transforms and deletion. Every transform funnels through
//! [`HistoryEngine::apply_operation`]; pixel work runs on the blocking pool.

use super::error::{ImageServiceError, ImageServiceResult};
use crate::core::Config;
use crate::db::repository::{history, image};
use crate::history::{
    HistoryEngine, HistoryError, HistoryResult, ProducedArtifact, SourceArtifact,
};
use crate::media::storage::{extension_of, path_string};
use crate::media::{ArtifactStore, MediaError, ThumbnailGenerator, codec, metadata, transform};
use ::image::ImageFormat;
use shared::models::{
    CompressionPreset, CompressionSettings, CurrentState, ExifSummary, FlipDirection, GpsPoint,
    ImageCreate, ImageRecord, Operation, VersionRecord,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Quality used when re-encoding lossy artifacts
const ARTIFACT_QUALITY: u8 = 95;

/// Source tag recorded for images saved from the editor
const EDITOR_SOURCE: &str = "advanced_editor";

/// An incoming upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub session_id: Option<String>,
    pub gps: Option<GpsPoint>,
}

#[derive(Clone)]
pub struct ImageService {
    engine: HistoryEngine,
    thumbnails: ThumbnailGenerator,
    allowed_extensions: Vec<String>,
    max_upload_bytes: u64,
}

impl ImageService {
    pub fn new(engine: HistoryEngine, config: &Config) -> Self {
        Self {
            engine,
            thumbnails: ThumbnailGenerator::new(config.thumbnail_size, config.thumbnail_quality),
            allowed_extensions: config.allowed_extensions.clone(),
            max_upload_bytes: config.max_upload_bytes(),
        }
    }

    pub fn engine(&self) -> &HistoryEngine {
        &self.engine
    }

    fn store(&self) -> &ArtifactStore {
        self.engine.store()
    }

    fn check_upload(&self, request: &UploadRequest) -> ImageServiceResult<()> {
        let ext = extension_of(&request.filename);
        let bare = ext.trim_start_matches('.');
        if bare.is_empty() || !self.allowed_extensions.iter().any(|e| e == bare) {
            return Err(ImageServiceError::UnsupportedFileType(ext));
        }
        if request.bytes.is_empty() {
            return Err(ImageServiceError::EmptyFile);
        }
        let size = request.bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(ImageServiceError::FileTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Ingest an upload: orientation-corrected original, thumbnail, record.
    pub async fn upload(&self, request: UploadRequest) -> ImageServiceResult<ImageRecord> {
        self.check_upload(&request)?;

        let image_id = shared::util::new_id();
        let _guard = self.engine.locks().acquire(&image_id).await;
        let store = self.store().clone();
        store.ensure_dirs().await?;

        let UploadRequest {
            filename,
            bytes,
            session_id,
            gps,
        } = request;

        let id = image_id.clone();
        let ingest_store = store.clone();
        let ingested = tokio::task::spawn_blocking(move || ingest(&ingest_store, &id, &bytes))
            .await
            .map_err(|e| HistoryError::Internal(format!("ingest task failed: {e}")))??;

        let thumbnail = self.write_thumbnail(&image_id, &ingested.path).await;

        let create = ImageCreate {
            id: image_id.clone(),
            session_id,
            original_filename: filename,
            original_size: ingested.size,
            original_path: path_string(&ingested.path),
            state: ingested.state(),
            thumbnail_path: thumbnail.as_deref().map(path_string),
            // Caller-supplied GPS wins over the camera's.
            gps: gps.or_else(|| ingested.metadata.as_ref().and_then(|m| m.gps)),
            exif: ingested.exif,
        };

        if let Err(e) = image::insert(self.engine.pool(), &create).await {
            store.discard(&ingested.path).await;
            if let Some(thumb) = &thumbnail {
                store.discard(thumb).await;
            }
            return Err(e.into());
        }

        tracing::info!(
            image_id = %image_id,
            filename = %create.original_filename,
            size = create.original_size,
            width = create.state.width,
            height = create.state.height,
            format = %create.state.format,
            "Image uploaded"
        );
        Ok(self.engine.get_image(&image_id).await?)
    }

    async fn write_thumbnail(&self, image_id: &str, source: &Path) -> Option<PathBuf> {
        let ext = match extension_of(source) {
            ext if ext.is_empty() => ".jpg".to_string(),
            ext => ext,
        };
        let dest = self.store().thumbnail_path(image_id, &ext);
        let generator = self.thumbnails;
        let src = source.to_path_buf();
        let target = dest.clone();
        let rendered = tokio::task::spawn_blocking(move || generator.regenerate(&src, &target))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));
        match rendered {
            Ok(()) => Some(dest),
            Err(e) => {
                tracing::warn!(image_id = %image_id, error = %e, "Thumbnail generation failed");
                self.store().discard(&dest).await;
                None
            }
        }
    }

    pub async fn get_image(&self, image_id: &str) -> ImageServiceResult<ImageRecord> {
        Ok(self.engine.get_image(image_id).await?)
    }

    /// Camera tags and GPS parsed from the EXIF block stored at upload
    pub async fn exif_summary(&self, image_id: &str) -> ImageServiceResult<Option<ExifSummary>> {
        let record = self.engine.get_image(image_id).await?;
        Ok(record
            .exif
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .and_then(metadata::parse))
    }

    pub async fn list_session_images(&self, session_id: &str) -> ImageServiceResult<Vec<ImageRecord>> {
        Ok(image::list_by_session(self.engine.pool(), session_id).await?)
    }

    pub async fn rotate(&self, image_id: &str, degrees: u16) -> ImageServiceResult<VersionRecord> {
        self.transform(image_id, Operation::Rotate { degrees }).await
    }

    pub async fn flip(
        &self,
        image_id: &str,
        direction: FlipDirection,
    ) -> ImageServiceResult<VersionRecord> {
        self.transform(image_id, Operation::Flip { direction }).await
    }

    pub async fn resize(
        &self,
        image_id: &str,
        width: u32,
        height: u32,
    ) -> ImageServiceResult<VersionRecord> {
        self.transform(image_id, Operation::Resize { width, height })
            .await
    }

    pub async fn crop(
        &self,
        image_id: &str,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> ImageServiceResult<VersionRecord> {
        self.transform(
            image_id,
            Operation::Crop {
                x,
                y,
                width,
                height,
            },
        )
        .await
    }

    /// Geometric transform re-encoded in the source's own format
    async fn transform(
        &self,
        image_id: &str,
        operation: Operation,
    ) -> ImageServiceResult<VersionRecord> {
        let op = operation.clone();
        let record = self
            .engine
            .apply_operation(image_id, operation, move |source| {
                run_blocking(move || render_transform(&source, &op))
            })
            .await?;
        Ok(record)
    }

    /// Compress with a preset, or with `custom` settings for `Custom`
    pub async fn compress(
        &self,
        image_id: &str,
        preset: CompressionPreset,
        custom: Option<CompressionSettings>,
    ) -> ImageServiceResult<VersionRecord> {
        let settings = match (preset, custom) {
            (CompressionPreset::Custom, Some(settings)) => settings,
            (CompressionPreset::Custom, None) => {
                return Err(HistoryError::InvalidOperation(
                    "Custom compression requires settings".into(),
                )
                .into());
            }
            (preset, _) => preset.settings().ok_or_else(|| {
                HistoryError::InvalidOperation(format!("Unknown preset {}", preset.as_str()))
            })?,
        };

        let record = self
            .engine
            .apply_operation(
                image_id,
                Operation::Compress { preset, settings },
                move |source| run_blocking(move || render_compressed(&source, &settings)),
            )
            .await?;
        Ok(record)
    }

    /// Adopt an image edited outside the engine as a new version
    pub async fn save_edited(
        &self,
        image_id: &str,
        bytes: Vec<u8>,
    ) -> ImageServiceResult<VersionRecord> {
        if bytes.is_empty() {
            return Err(ImageServiceError::EmptyFile);
        }
        let record = self
            .engine
            .apply_operation(
                image_id,
                Operation::Edit {
                    source: EDITOR_SOURCE.to_string(),
                },
                move |source| run_blocking(move || write_edited(&source, &bytes)),
            )
            .await?;
        Ok(record)
    }

    /// Delete an image with its log and every artifact it owns.
    ///
    /// Returns the number of files removed.
    pub async fn delete_image(&self, image_id: &str) -> ImageServiceResult<usize> {
        let removed = {
            let _guard = self.engine.locks().acquire(image_id).await;
            let pool = self.engine.pool();
            let record = self.engine.get_image(image_id).await?;
            let records = history::list(pool, image_id).await?;

            // History rows cascade.
            image::delete(pool, image_id).await?;

            let mut paths = BTreeSet::new();
            paths.insert(record.original_path.clone());
            paths.insert(record.current_path.clone());
            if let Some(thumb) = &record.thumbnail_path {
                paths.insert(thumb.clone());
            }
            for r in &records {
                paths.insert(r.input_path.clone());
                paths.insert(r.output_path.clone());
            }

            let mut removed = 0;
            for path in &paths {
                match self.store().remove(path).await {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(image_id = %image_id, path = %path, error = %e, "Failed to delete artifact")
                    }
                }
            }
            removed
        };
        self.engine.locks().forget(image_id);

        tracing::info!(image_id = %image_id, files_removed = removed, "Image deleted");
        Ok(removed)
    }

    /// Delete every image of a session. Returns how many images were deleted.
    pub async fn delete_session_images(&self, session_id: &str) -> ImageServiceResult<usize> {
        let images = image::list_by_session(self.engine.pool(), session_id).await?;
        let mut deleted = 0;
        for record in images {
            match self.delete_image(&record.id).await {
                Ok(_) => deleted += 1,
                // Deleted concurrently
                Err(ImageServiceError::History(HistoryError::ImageNotFound(_))) => {}
                Err(e) => return Err(e),
            }
        }
        tracing::info!(session_id = %session_id, images = deleted, "Session images deleted");
        Ok(deleted)
    }
}

/// Original artifact written at ingest
struct Ingested {
    path: PathBuf,
    size: i64,
    width: i64,
    height: i64,
    format: ImageFormat,
    exif: Option<Vec<u8>>,
    metadata: Option<ExifSummary>,
}

impl Ingested {
    fn state(&self) -> CurrentState {
        CurrentState {
            path: path_string(&self.path),
            size: self.size,
            width: self.width,
            height: self.height,
            format: codec::format_tag(self.format),
        }
    }
}

fn ingest(store: &ArtifactStore, image_id: &str, bytes: &[u8]) -> Result<Ingested, MediaError> {
    let decoded = codec::decode_bytes(bytes)?;
    let ext = codec::extension_for(decoded.format);
    let path = store.original_path(image_id, &ext);
    let staged = store.temp_path(&ext);
    let written = codec::save(&decoded.image, &staged, decoded.format, ARTIFACT_QUALITY)
        .and_then(|size| {
            store.promote(&staged, &path)?;
            Ok(size)
        });
    let size = match written {
        Ok(size) => size,
        Err(e) => {
            let _ = std::fs::remove_file(&staged);
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
    };
    let metadata = decoded.exif.as_deref().and_then(metadata::parse);
    Ok(Ingested {
        metadata,
        size: size as i64,
        width: i64::from(decoded.image.width()),
        height: i64::from(decoded.image.height()),
        format: decoded.format,
        exif: decoded.exif,
        path,
    })
}

async fn run_blocking<F>(work: F) -> HistoryResult<ProducedArtifact>
where
    F: FnOnce() -> HistoryResult<ProducedArtifact> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| HistoryError::Internal(format!("render task failed: {e}")))?
}

/// Write `encode`'s output to `path`; a partial file is removed on failure
fn write_artifact(
    path: PathBuf,
    encode: impl FnOnce(&Path) -> Result<(), MediaError>,
) -> HistoryResult<ProducedArtifact> {
    if let Err(e) = encode(&path) {
        let _ = std::fs::remove_file(&path);
        return Err(e.into());
    }
    ProducedArtifact::probe(path)
}

fn render_transform(source: &SourceArtifact, operation: &Operation) -> HistoryResult<ProducedArtifact> {
    let format = codec::format_for_path(&source.path)?;
    let decoded = codec::open(&source.path)?;
    let output = transform::apply(decoded.image, operation)?;
    write_artifact(source.output_path_same_ext(), |path| {
        codec::save(&output, path, format, ARTIFACT_QUALITY).map(|_| ())
    })
}

fn render_compressed(
    source: &SourceArtifact,
    settings: &CompressionSettings,
) -> HistoryResult<ProducedArtifact> {
    let decoded = codec::open(&source.path)?;
    let compressed = transform::compress(decoded.image, settings)?;
    tracing::debug!(
        image_id = %source.image_id,
        quality = compressed.quality,
        bytes = compressed.bytes.len(),
        "Compressed"
    );
    write_artifact(source.output_path(settings.format.extension()), |path| {
        std::fs::write(path, &compressed.bytes).map_err(MediaError::from)
    })
}

fn write_edited(source: &SourceArtifact, bytes: &[u8]) -> HistoryResult<ProducedArtifact> {
    // Reject anything that does not decode before it becomes a version.
    let decoded = codec::decode_bytes(bytes)?;
    write_artifact(source.output_path(&codec::extension_for(decoded.format)), |path| {
        std::fs::write(path, bytes).map_err(MediaError::from)
    })
}
