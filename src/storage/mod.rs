// backuptool/src/storage/mod.rs
pub mod local;
pub mod s3;
pub mod sigv4;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::Result;

pub use local::LocalStorageBackend;
pub use s3::S3StorageBackend;

/// Well-known name of the per-backend metadata collection. The local
/// backend keeps it as a sidecar file, the S3 backend as an object key.
pub const METADATA_FILENAME: &str = "backup-metadata.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Full,
    /// Reserved; never produced by the current pipeline.
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupLevel {
    Daily,
    Weekly,
    Monthly,
}

impl BackupLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    S3,
}

impl StorageKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Self::Local),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
        }
    }
}

/// Durable record describing one stored artifact. Append-only: a record is
/// created on save and removed on delete, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub id: Uuid,
    pub filename: String,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub level: BackupLevel,
    pub storage: StorageKind,
    pub size: u64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub database_name: String,
    pub compressed: bool,
    pub encrypted: bool,
}

/// Capability contract implemented by every storage target.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Copies/uploads the artifact and appends `metadata` to this backend's
    /// metadata collection. Returns a human-readable location.
    async fn save(&self, artifact_path: &Path, metadata: &BackupMetadata) -> Result<String>;

    /// Materializes the artifact as a local temp file the caller owns.
    async fn retrieve(&self, id: Uuid) -> Result<PathBuf>;

    /// Removes artifact and metadata entry. Returns false for an unknown id.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// True iff metadata is known AND the artifact is physically present.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Full metadata collection for this backend, unordered.
    async fn list(&self) -> Result<Vec<BackupMetadata>>;
}


#[cfg(test)]
mod tests {
    use super::test_support::sample_metadata;
    use super::*;

    #[test]
    fn test_metadata_serializes_camel_case_iso8601() {
        let metadata = sample_metadata(StorageKind::Local);
        let value = serde_json::to_value(&metadata).expect("metadata should serialize");

        assert_eq!(value["type"], "full");
        assert_eq!(value["level"], "daily");
        assert_eq!(value["storage"], "local");
        assert_eq!(value["databaseName"], "ledger");
        assert_eq!(value["encrypted"], false);
        let created_at = value["createdAt"].as_str().expect("createdAt is a string");
        // RFC 3339 / ISO-8601 shape, e.g. 2026-01-15T03:00:00.123456Z
        assert!(created_at.contains('T'));
        assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());

        let round_tripped: BackupMetadata =
            serde_json::from_value(value).expect("metadata should deserialize");
        assert_eq!(round_tripped, metadata);
    }

    #[test]
    fn test_level_and_storage_parse() {
        assert_eq!(BackupLevel::parse("weekly"), Some(BackupLevel::Weekly));
        assert_eq!(BackupLevel::parse("hourly"), None);
        assert_eq!(StorageKind::parse("s3"), Some(StorageKind::S3));
        assert_eq!(StorageKind::parse("tape"), None);
    }
}
