// backuptool/src/storage/local.rs
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::LocalStorageConfig;
use crate::errors::{AppError, Result};

use super::{BackupMetadata, METADATA_FILENAME, StorageBackend, StorageKind};

/// Filesystem backend. Artifacts live under `<base_path>/<level>/<filename>`;
/// one JSON sidecar holds the metadata array for this backend and is
/// rewritten wholesale on every save/delete. There is no partial-write
/// protection on the sidecar; backup cadence is low enough that a crash
/// between read and write is an accepted risk.
pub struct LocalStorageBackend {
    base_path: PathBuf,
}

impl LocalStorageBackend {
    pub fn new(config: &LocalStorageConfig) -> Result<Self> {
        for level in ["daily", "weekly", "monthly"] {
            fs::create_dir_all(config.base_path.join(level))?;
        }
        Ok(Self {
            base_path: config.base_path.clone(),
        })
    }

    fn metadata_path(&self) -> PathBuf {
        self.base_path.join(METADATA_FILENAME)
    }

    fn artifact_path(&self, metadata: &BackupMetadata) -> PathBuf {
        self.base_path
            .join(metadata.level.as_str())
            .join(&metadata.filename)
    }

    fn load_metadata(&self) -> Result<Vec<BackupMetadata>> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn store_metadata(&self, entries: &[BackupMetadata]) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(self.metadata_path(), content)?;
        Ok(())
    }

    fn find(&self, id: Uuid) -> Result<Option<BackupMetadata>> {
        Ok(self.load_metadata()?.into_iter().find(|m| m.id == id))
    }
}

#[async_trait]
impl StorageBackend for LocalStorageBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn save(&self, artifact_path: &Path, metadata: &BackupMetadata) -> Result<String> {
        let dest = self.artifact_path(metadata);
        fs::copy(artifact_path, &dest)?;

        let mut entries = self.load_metadata()?;
        entries.push(metadata.clone());
        self.store_metadata(&entries)?;

        Ok(dest.display().to_string())
    }

    async fn retrieve(&self, id: Uuid) -> Result<PathBuf> {
        let metadata = self.find(id)?.ok_or_else(|| {
            AppError::NotFound(format!("Backup {} not found in local storage", id))
        })?;
        let source = self.artifact_path(&metadata);
        if !source.exists() {
            return Err(AppError::NotFound(format!(
                "Artifact file missing for backup {}: {}",
                id,
                source.display()
            )));
        }

        // Scratch copy, so the caller may modify or delete it freely.
        let temp = tempfile::Builder::new()
            .prefix("backuptool-")
            .suffix(&format!("-{}", metadata.filename))
            .tempfile()?;
        let (_, temp_path) = temp.keep().map_err(|e| AppError::Io(e.error))?;
        fs::copy(&source, &temp_path)?;
        Ok(temp_path)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut entries = self.load_metadata()?;
        let Some(position) = entries.iter().position(|m| m.id == id) else {
            return Ok(false);
        };
        let metadata = entries.remove(position);

        let artifact = self.artifact_path(&metadata);
        if artifact.exists() {
            fs::remove_file(&artifact)?;
        }
        self.store_metadata(&entries)?;
        Ok(true)
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self
            .find(id)?
            .map(|m| self.artifact_path(&m).exists())
            .unwrap_or(false))
    }

    async fn list(&self) -> Result<Vec<BackupMetadata>> {
        self.load_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::sha256_file;
    use crate::storage::test_support::sample_metadata;

    fn backend(dir: &Path) -> LocalStorageBackend {
        LocalStorageBackend::new(&LocalStorageConfig {
            enabled: true,
            base_path: dir.to_path_buf(),
        })
        .expect("backend should initialize")
    }

    fn write_artifact(dir: &Path, contents: &[u8]) -> PathBuf {
        let path = dir.join("artifact.sql.gz");
        fs::write(&path, contents).expect("artifact write");
        path
    }

    #[tokio::test]
    async fn test_new_creates_level_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("store");
        backend(&base);
        for level in ["daily", "weekly", "monthly"] {
            assert!(base.join(level).is_dir());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_save_list_exists_retrieve() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = backend(dir.path());
        let scratch = tempfile::tempdir()?;
        let artifact = write_artifact(scratch.path(), b"-- dump bytes --");
        let metadata = sample_metadata(StorageKind::Local);

        let location = backend.save(&artifact, &metadata).await?;
        assert!(location.contains("daily"));

        let listed = backend.list().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, metadata.id);
        assert!(backend.exists(metadata.id).await?);

        // Checksum stability: retrieve() returns byte-identical content.
        let original_digest = sha256_file(&artifact)?;
        let retrieved = backend.retrieve(metadata.id).await?;
        assert_eq!(sha256_file(&retrieved)?, original_digest);
        fs::remove_file(retrieved)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_removes_artifact_and_entry() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = backend(dir.path());
        let scratch = tempfile::tempdir()?;
        let artifact = write_artifact(scratch.path(), b"payload");
        let metadata = sample_metadata(StorageKind::Local);
        backend.save(&artifact, &metadata).await?;

        assert!(backend.delete(metadata.id).await?);
        assert!(backend.list().await?.is_empty());
        assert!(!backend.exists(metadata.id).await?);
        assert!(!dir.path().join("daily").join(&metadata.filename).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_id_returns_false() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = backend(dir.path());
        assert!(!backend.delete(Uuid::new_v4()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_retrieve_unknown_id_is_not_found() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = backend(dir.path());
        let result = backend.retrieve(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_exists_false_when_artifact_missing_on_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let backend = backend(dir.path());
        let scratch = tempfile::tempdir()?;
        let artifact = write_artifact(scratch.path(), b"payload");
        let metadata = sample_metadata(StorageKind::Local);
        backend.save(&artifact, &metadata).await?;

        fs::remove_file(dir.path().join("daily").join(&metadata.filename))?;
        assert!(!backend.exists(metadata.id).await?);
        Ok(())
    }
}
