//! Record storage collaborators.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SweepError};
use crate::record::Record;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;

/// One page of records.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    /// Addressable records. Entries without a `uid` are dropped here.
    pub items: Vec<Record>,
    /// Raw entries the backend returned, dropped ones included.
    pub fetched: usize,
    /// True when the backend returned a full page, so another may follow.
    pub more: bool,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_record_types(&self) -> Result<Vec<String>>;

    async fn list_records(
        &self,
        record_type: &str,
        locale: &str,
        skip: usize,
        limit: usize,
    ) -> Result<RecordPage>;

    /// Overwrite a record with `data`. Returns the backend's response body.
    async fn update_record(
        &self,
        record_type: &str,
        record_id: &str,
        data: &Map<String, Value>,
        locale: &str,
    ) -> Result<Value>;
}

/// Convert raw entries into records, dropping any the scanner could not address.
pub(crate) fn records_from_entries(record_type: &str, entries: Vec<Value>) -> Vec<Record> {
    entries
        .into_iter()
        .filter_map(|entry| match Record::from_entry(record_type, entry) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping entry in '{}': {}", record_type, e);
                None
            }
        })
        .collect()
}

/// Bound a collaborator call so a stalled backend surfaces as `Timeout`.
pub async fn with_timeout<T>(
    limit: Duration,
    operation: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| SweepError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stalled_call_times_out() {
        let err = with_timeout(Duration::from_millis(50), "list record types", async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, SweepError::Timeout { ref operation, .. } if operation == "list record types"));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_prompt_call_passes_through() {
        let value = with_timeout(Duration::from_secs(1), "noop", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_entries_without_uid_are_dropped() {
        let records = records_from_entries(
            "page",
            vec![
                serde_json::json!({"title": "no uid"}),
                serde_json::json!({"uid": "p1", "title": "kept"}),
            ],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uid, "p1");
    }
}
