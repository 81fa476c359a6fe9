use std::time::Duration;

use crate::audit::{AuditEntry, AuditSink};
use crate::config::Config;
use crate::storage::{with_timeout, RecordStore};
use crate::types::{ApplyResponse, ApplyResult, SelectedChange};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const ANONYMOUS_ACTOR: &str = "unknown";

/// Commits selected scan results one record at a time.
///
/// Each update stands alone: a failure is recorded against its change and
/// the batch moves on. Updates that already went through are never rolled
/// back, including when the caller drops the apply future midway.
pub struct ChangeApplier<'a> {
    store: &'a dyn RecordStore,
    audit: Option<&'a dyn AuditSink>,
    locale: String,
    actor: String,
    timeout: Duration,
}

impl<'a> ChangeApplier<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            audit: None,
            locale: crate::scanner::DEFAULT_LOCALE.to_string(),
            actor: ANONYMOUS_ACTOR.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(store: &'a dyn RecordStore, config: &Config) -> Self {
        Self::new(store)
            .with_locale(&config.storage.locale)
            .with_timeout(Duration::from_secs(config.storage.timeout_secs))
    }

    pub fn with_audit(mut self, sink: &'a dyn AuditSink) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Fallback for changes that don't carry the locale they were scanned in.
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    /// User id written to audit entries.
    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn apply(&self, changes: &[SelectedChange]) -> ApplyResponse {
        let mut results = Vec::with_capacity(changes.len());

        for change in changes {
            let outcome = with_timeout(
                self.timeout,
                &format!("update record '{}'", change.entry_uid),
                self.store.update_record(
                    &change.content_type_uid,
                    &change.entry_uid,
                    &change.updated_data,
                    change.locale.as_deref().unwrap_or(&self.locale),
                ),
            )
            .await;

            match outcome {
                Ok(response) => {
                    tracing::info!(
                        "Updated '{}' in '{}'",
                        change.entry_uid,
                        change.content_type_uid
                    );
                    self.record_audit(change).await;
                    results.push(ApplyResult::applied(&change.entry_uid, response));
                }
                Err(e) => {
                    tracing::warn!("Failed to update '{}': {}", change.entry_uid, e);
                    results.push(ApplyResult::failed(&change.entry_uid, &e));
                }
            }
        }

        let response = ApplyResponse::from_results(results);
        if let Some(failure) = response.partial_failure() {
            tracing::warn!("{}", failure);
        }
        response
    }

    async fn record_audit(&self, change: &SelectedChange) {
        let Some(sink) = self.audit else {
            return;
        };

        let entry = AuditEntry::new(
            &change.entry_uid,
            &change.content_type_uid,
            change.changes.clone(),
            &self.actor,
        );

        match with_timeout(self.timeout, "write audit entry", sink.record(&entry)).await {
            Ok(()) => {}
            Err(e) => tracing::warn!("Audit entry for '{}' not written: {}", change.entry_uid, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::error::{Result, SweepError};
    use crate::session::Session;
    use crate::storage::{HttpRecordStore, MemoryRecordStore, RecordPage};
    use crate::types::FieldChange;
    use async_trait::async_trait;
    use mockito::Matcher;
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    /// Rejects updates to one record id.
    struct FlakyStore {
        inner: MemoryRecordStore,
        reject: &'static str,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn list_record_types(&self) -> Result<Vec<String>> {
            self.inner.list_record_types().await
        }

        async fn list_records(
            &self,
            record_type: &str,
            locale: &str,
            skip: usize,
            limit: usize,
        ) -> Result<RecordPage> {
            self.inner.list_records(record_type, locale, skip, limit).await
        }

        async fn update_record(
            &self,
            record_type: &str,
            record_id: &str,
            data: &Map<String, Value>,
            locale: &str,
        ) -> Result<Value> {
            if record_id == self.reject {
                return Err(SweepError::StorageUnavailable("422 entry is locked".to_string()));
            }
            self.inner.update_record(record_type, record_id, data, locale).await
        }
    }

    /// Never answers updates to one record id.
    struct StallingStore {
        inner: MemoryRecordStore,
        stall: &'static str,
    }

    #[async_trait]
    impl RecordStore for StallingStore {
        async fn list_record_types(&self) -> Result<Vec<String>> {
            self.inner.list_record_types().await
        }

        async fn list_records(
            &self,
            record_type: &str,
            locale: &str,
            skip: usize,
            limit: usize,
        ) -> Result<RecordPage> {
            self.inner.list_records(record_type, locale, skip, limit).await
        }

        async fn update_record(
            &self,
            record_type: &str,
            record_id: &str,
            data: &Map<String, Value>,
            locale: &str,
        ) -> Result<Value> {
            if record_id == self.stall {
                std::future::pending::<()>().await;
            }
            self.inner.update_record(record_type, record_id, data, locale).await
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        entries: Mutex<Vec<AuditEntry>>,
    }

    #[async_trait]
    impl AuditSink for CollectingSink {
        async fn record(&self, entry: &AuditEntry) -> Result<()> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl AuditSink for BrokenSink {
        async fn record(&self, _entry: &AuditEntry) -> Result<()> {
            Err(SweepError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            )))
        }
    }

    struct StalledSink;

    #[async_trait]
    impl AuditSink for StalledSink {
        async fn record(&self, _entry: &AuditEntry) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn seeded() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        for uid in ["e1", "e2", "e3"] {
            store
                .insert("page", json!({"uid": uid, "title": "OldBrand", "_version": 1}))
                .unwrap();
        }
        store
    }

    fn selected(uid: &str) -> SelectedChange {
        SelectedChange {
            entry_uid: uid.to_string(),
            content_type_uid: "page".to_string(),
            updated_data: json!({"uid": uid, "title": "NewBrand", "_version": 1})
                .as_object()
                .cloned()
                .unwrap(),
            changes: vec![FieldChange {
                field: "title".to_string(),
                before: json!("OldBrand"),
                after: json!("NewBrand"),
                change_count: 1,
            }],
            locale: None,
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let store = FlakyStore {
            inner: seeded(),
            reject: "e2",
        };
        let changes = vec![selected("e1"), selected("e2"), selected("e3")];

        let response = ChangeApplier::new(&store).apply(&changes).await;

        assert!(response.success);
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.applied_count, 2);
        assert_eq!(response.failed_count, 1);

        let uids: Vec<&str> = response.results.iter().map(|r| r.entry_uid.as_str()).collect();
        assert_eq!(uids, vec!["e1", "e2", "e3"]);
        assert!(response.results[0].success);
        assert!(!response.results[1].success);
        assert!(response.results[1].error.as_deref().unwrap().contains("locked"));
        assert!(response.results[2].success);

        assert_eq!(store.inner.get("page", "e3").unwrap()["title"], "NewBrand");
        assert_eq!(store.inner.get("page", "e2").unwrap()["title"], "OldBrand");
    }

    #[tokio::test]
    async fn test_audit_written_for_successes_only() {
        let store = FlakyStore {
            inner: seeded(),
            reject: "e1",
        };
        let sink = CollectingSink::default();

        ChangeApplier::new(&store)
            .with_audit(&sink)
            .with_actor("editor-7")
            .apply(&[selected("e1"), selected("e2")])
            .await;

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record_id, "e2");
        assert_eq!(entries[0].user_id, "editor-7");
        assert_eq!(entries[0].changes.len(), 1);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_apply() {
        let store = seeded();

        let response = ChangeApplier::new(&store)
            .with_audit(&BrokenSink)
            .apply(&[selected("e1")])
            .await;

        assert_eq!(response.applied_count, 1);
        assert_eq!(response.failed_count, 0);
    }

    #[tokio::test]
    async fn test_all_failures_still_succeed_at_batch_level() {
        let store = MemoryRecordStore::new();

        let response = ChangeApplier::new(&store).apply(&[selected("missing")]).await;

        assert!(response.success);
        assert_eq!(response.failed_count, 1);
        assert!(response.partial_failure().is_some());
    }

    #[tokio::test]
    async fn test_stalled_update_fails_only_that_change() {
        let store = StallingStore {
            inner: seeded(),
            stall: "e2",
        };

        let response = ChangeApplier::new(&store)
            .with_timeout(Duration::from_millis(50))
            .apply(&[selected("e1"), selected("e2"), selected("e3")])
            .await;

        assert_eq!(response.applied_count, 2);
        assert_eq!(response.failed_count, 1);
        assert!(!response.results[1].success);
        assert!(response.results[1].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(store.inner.get("page", "e3").unwrap()["title"], "NewBrand");
    }

    #[tokio::test]
    async fn test_stalled_audit_does_not_fail_apply() {
        let store = seeded();

        let response = ChangeApplier::new(&store)
            .with_audit(&StalledSink)
            .with_timeout(Duration::from_millis(50))
            .apply(&[selected("e1"), selected("e2")])
            .await;

        assert_eq!(response.applied_count, 2);
        assert_eq!(response.failed_count, 0);
    }

    #[tokio::test]
    async fn test_update_goes_to_the_scanned_locale() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/v3/content_types/page/entries/e1")
            .match_query(Matcher::UrlEncoded("locale".into(), "fr-fr".into()))
            .with_status(200)
            .with_body(r#"{"notice": "Entry updated successfully."}"#)
            .create_async()
            .await;

        let config = StorageConfig {
            api_base: Some(format!("{}/v3", server.url())),
            timeout_secs: 5,
            ..StorageConfig::default()
        };
        let store = HttpRecordStore::new(&config, Session::with_auth_token("k", "t")).unwrap();
        let mut change = selected("e1");
        change.locale = Some("fr-fr".to_string());

        let response = ChangeApplier::new(&store)
            .with_locale("en-us")
            .apply(&[change])
            .await;

        mock.assert_async().await;
        assert_eq!(response.applied_count, 1);
    }
}
