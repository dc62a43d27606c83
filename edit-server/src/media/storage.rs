//! Artifact storage layout
//!
//! All artifacts live in one directory:
//!
//! ```text
//! {image_id}_original{ext}        upload, orientation corrected
//! {image_id}_{label}_{uuid}{ext}  output of one operation
//! {image_id}_thumb{ext}           preview of the current artifact
//! ```
//!
//! Originals are staged in the scratch directory and moved into place once
//! fully written.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    temp: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, temp: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            temp: temp.into(),
        }
    }

    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::create_dir_all(&self.temp).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn original_path(&self, image_id: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{image_id}_original{ext}"))
    }

    /// Fresh, never-reused artifact name
    pub fn artifact_path(&self, image_id: &str, label: &str, ext: &str) -> PathBuf {
        self.root
            .join(format!("{image_id}_{label}_{}{ext}", uuid::Uuid::new_v4()))
    }

    pub fn thumbnail_path(&self, image_id: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{image_id}_thumb{ext}"))
    }

    pub fn temp_path(&self, ext: &str) -> PathBuf {
        self.temp.join(format!("temp_{}{ext}", uuid::Uuid::new_v4()))
    }

    /// Move a staged file to `dest`. Falls back to copy when the scratch
    /// directory is on another filesystem. Blocking.
    pub fn promote(&self, staged: &Path, dest: &Path) -> io::Result<()> {
        if std::fs::rename(staged, dest).is_ok() {
            return Ok(());
        }
        let copied = std::fs::copy(staged, dest).map(|_| ());
        let _ = std::fs::remove_file(staged);
        copied
    }

    /// Delete everything left in the scratch directory. Returns the count.
    pub async fn clear_temp(&self) -> io::Result<usize> {
        let mut removed = 0;
        for path in list_dir_files(&self.temp).await? {
            if self.remove(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete a file. Returns `false` if it was already gone.
    pub async fn remove(&self, path: impl AsRef<Path>) -> io::Result<bool> {
        match tokio::fs::remove_file(path.as_ref()).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Best-effort delete that only logs failures
    pub async fn discard(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if let Err(e) = self.remove(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete artifact");
        }
    }

    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        tokio::fs::try_exists(path.as_ref()).await.unwrap_or(false)
    }

    /// Regular files directly under the storage root
    pub async fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        list_dir_files(&self.root).await
    }
}

async fn list_dir_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Image id an artifact file name belongs to, if it follows the naming scheme
pub fn owner_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (prefix, rest) = name.split_once('_')?;
    if rest.is_empty() {
        return None;
    }
    uuid::Uuid::parse_str(prefix).ok().map(|_| prefix.to_string())
}

/// Lowercased extension with the leading dot, or `""`
pub fn extension_of(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_scheme() {
        let store = ArtifactStore::new("/data", "/data/temp");
        let id = "0b7f5c7e-3a0a-4d8e-9d0c-1f7a3f3f2b11";

        assert_eq!(
            store.original_path(id, ".jpg"),
            PathBuf::from(format!("/data/{id}_original.jpg"))
        );
        assert_eq!(
            store.thumbnail_path(id, ".png"),
            PathBuf::from(format!("/data/{id}_thumb.png"))
        );

        let a = store.artifact_path(id, "rotated", ".jpg");
        let b = store.artifact_path(id, "rotated", ".jpg");
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(&format!("{id}_rotated_")));
        assert!(name.ends_with(".jpg"));
        assert_eq!(owner_of(&a).as_deref(), Some(id));
    }

    #[test]
    fn test_owner_of_foreign_files() {
        assert_eq!(owner_of(Path::new("/data/imagetools.db")), None);
        assert_eq!(owner_of(Path::new("/data/imagetools.db-wal")), None);
        assert_eq!(owner_of(Path::new("/data/not-a-uuid_thumb.jpg")), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG"), ".jpg");
        assert_eq!(extension_of("/x/y.tar.gz"), ".gz");
        assert_eq!(extension_of("noext"), "");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), dir.path().join("temp"));
        store.ensure_dirs().await.unwrap();

        let file = dir.path().join("x.bin");
        tokio::fs::write(&file, b"1").await.unwrap();
        assert!(store.remove(&file).await.unwrap());
        assert!(!store.remove(&file).await.unwrap());
        assert!(!store.exists(&file).await);
    }

    #[tokio::test]
    async fn test_list_files_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), dir.path().join("temp"));
        store.ensure_dirs().await.unwrap();
        tokio::fs::write(dir.path().join("a.png"), b"1").await.unwrap();

        let files = store.list_files().await.unwrap();
        assert_eq!(files, vec![dir.path().join("a.png")]);
    }

    #[tokio::test]
    async fn test_promote_and_clear_temp() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), dir.path().join("temp"));
        store.ensure_dirs().await.unwrap();

        let staged = store.temp_path(".png");
        assert!(staged.starts_with(dir.path().join("temp")));
        std::fs::write(&staged, b"data").unwrap();
        let dest = dir.path().join("final.png");
        store.promote(&staged, &dest).unwrap();
        assert!(!staged.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");

        std::fs::write(store.temp_path(".jpg"), b"1").unwrap();
        std::fs::write(store.temp_path(".jpg"), b"2").unwrap();
        assert_eq!(store.clear_temp().await.unwrap(), 2);
        assert_eq!(store.clear_temp().await.unwrap(), 0);
        assert!(dest.exists());
    }
}
