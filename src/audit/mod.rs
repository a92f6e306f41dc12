// backuptool/src/audit/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    BackupCreated,
    BackupFailed,
    BackupRestored,
    BackupRestoreFailed,
    BackupDeleted,
    RetentionApplied,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    pub detail: serde_json::Value,
}

impl AuditEvent {
    pub fn new(action: AuditAction, detail: serde_json::Value) -> Self {
        Self {
            action,
            timestamp: Utc::now(),
            detail,
        }
    }
}

/// Audit collaborator. A sink failure must never abort the backup or
/// restore operation it describes; callers swallow errors from `log`.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(&self, event: &AuditEvent) -> Result<()>;
}

/// Appends one JSON line per event to a local file.
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn log(&self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
