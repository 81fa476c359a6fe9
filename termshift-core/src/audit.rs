use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::error::Result;
use crate::types::FieldChange;

const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// One committed record update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub record_id: String,
    pub record_type_id: String,
    pub changes: Vec<FieldChange>,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
}

impl AuditEntry {
    pub fn new(
        record_id: &str,
        record_type_id: &str,
        changes: Vec<FieldChange>,
        user_id: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id: record_id.to_string(),
            record_type_id: record_type_id.to_string(),
            changes,
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _entry: &AuditEntry) -> Result<()> {
        Ok(())
    }
}

/// Append-only JSONL audit trail with size-based rotation.
pub struct JsonlAuditLog {
    log_dir: PathBuf,
    current_log_file: Mutex<Option<PathBuf>>,
    max_file_size: u64,
}

impl JsonlAuditLog {
    pub fn new(log_dir: impl Into<PathBuf>) -> Result<Self> {
        let log_dir = log_dir.into();
        std::fs::create_dir_all(&log_dir)?;

        Ok(Self {
            log_dir,
            current_log_file: Mutex::new(None),
            max_file_size: MAX_LOG_FILE_SIZE,
        })
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        Ok(Self::new(config.resolved_log_dir())?.with_max_file_size(config.max_file_size))
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// List all JSONL files in the log directory, oldest first
    pub fn list_log_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !self.log_dir.exists() {
            return Ok(files);
        }

        for entry in std::fs::read_dir(&self.log_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    async fn current_file(&self, current: &mut Option<PathBuf>) -> Result<PathBuf> {
        let needs_rotation = match current.as_ref() {
            Some(path) => match tokio::fs::metadata(path).await {
                Ok(metadata) => metadata.len() >= self.max_file_size,
                Err(_) => true,
            },
            None => true,
        };

        if needs_rotation {
            // Nanoseconds keep names unique when rotating quickly
            let now = Utc::now();
            let filename = format!(
                "{}_{:09}.jsonl",
                now.format("%Y%m%d_%H%M%S"),
                now.timestamp_subsec_nanos()
            );
            *current = Some(self.log_dir.join(filename));
        }

        Ok(current.clone().unwrap_or_else(|| self.log_dir.join("audit.jsonl")))
    }
}

#[async_trait]
impl AuditSink for JsonlAuditLog {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        let mut current = self.current_log_file.lock().await;
        let path = self.current_file(&mut current).await?;

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!("Audit entry {} written to {}", entry.id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(record_id: &str) -> AuditEntry {
        AuditEntry::new(
            record_id,
            "blog_post",
            vec![FieldChange {
                field: "title".to_string(),
                before: json!("OldBrand launches a product that is long enough to fill the file"),
                after: json!("NewBrand launches a product that is long enough to fill the file"),
                change_count: 1,
            }],
            "user-1",
        )
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(entry("blt1")).unwrap();
        assert_eq!(json["recordId"], "blt1");
        assert_eq!(json["recordTypeId"], "blog_post");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["changes"][0]["changeCount"], 1);
    }

    #[tokio::test]
    async fn test_record_appends_line() {
        let temp = TempDir::new().unwrap();
        let log = JsonlAuditLog::new(temp.path().join("audit")).unwrap();

        log.record(&entry("blt1")).await.unwrap();
        log.record(&entry("blt2")).await.unwrap();

        let files = log.list_log_files().unwrap();
        assert_eq!(files.len(), 1);

        let content = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<AuditEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].record_id, "blt1");
        assert_eq!(lines[1].record_id, "blt2");
    }

    #[tokio::test]
    async fn test_file_rotation() {
        let temp = TempDir::new().unwrap();
        let log = JsonlAuditLog::new(temp.path()).unwrap().with_max_file_size(100);

        for i in 0..4 {
            log.record(&entry(&format!("blt{}", i))).await.unwrap();
        }

        let files = log.list_log_files().unwrap();
        assert_eq!(files.len(), 4, "each entry exceeds the limit, got {:?}", files);
    }

    #[tokio::test]
    async fn test_noop_sink() {
        assert!(NoopAuditSink.record(&entry("blt1")).await.is_ok());
    }
}
