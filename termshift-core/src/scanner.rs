use serde_json::Map;
use std::time::Duration;

use crate::brand_guard::{check_replacement, BrandGuard, BrandValidation};
use crate::config::Config;
use crate::engine::{EntityExtractor, TreeWalker};
use crate::error::Result;
use crate::record::Record;
use crate::storage::{with_timeout, RecordStore};
use crate::types::{EntryScanResult, FieldChange, ScanReport, ScanRequest};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_LOCALE: &str = "en-us";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pages through every requested record type and collects proposed rewrites.
///
/// Record types are scanned one after another and pages strictly in order;
/// the report lists changed records in fetch order. Nothing is written.
pub struct RecordScanner<'a> {
    store: &'a dyn RecordStore,
    brand_guard: Option<&'a dyn BrandGuard>,
    extractor: EntityExtractor,
    page_size: usize,
    locale: String,
    timeout: Duration,
}

impl<'a> RecordScanner<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            brand_guard: None,
            extractor: EntityExtractor::default(),
            page_size: DEFAULT_PAGE_SIZE,
            locale: DEFAULT_LOCALE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Page size, locale and timeout from the `[storage]` section.
    pub fn from_config(store: &'a dyn RecordStore, config: &Config) -> Self {
        Self::new(store)
            .with_page_size(config.storage.page_size)
            .with_locale(&config.storage.locale)
            .with_timeout(Duration::from_secs(config.storage.timeout_secs))
    }

    pub fn with_brand_guard(mut self, guard: &'a dyn BrandGuard) -> Self {
        self.brand_guard = Some(guard);
        self
    }

    pub fn with_extractor(mut self, extractor: EntityExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanReport> {
        // Term validation happens here, before the store is touched
        let walker = TreeWalker::new(
            &request.find_term,
            &request.replace_term,
            &request.options,
            &self.extractor,
        )?;

        let brand_validation = self.check_brand(request).await?;
        let locale = request.locale.as_deref().unwrap_or(&self.locale);

        let record_types = if request.content_types.is_empty() {
            with_timeout(self.timeout, "list record types", self.store.list_record_types()).await?
        } else {
            request.content_types.clone()
        };

        tracing::info!(
            "Scanning {} record type(s) for '{}' -> '{}'",
            record_types.len(),
            request.find_term,
            request.replace_term
        );

        let mut report = ScanReport {
            brand_validation,
            ..ScanReport::default()
        };

        for record_type in &record_types {
            let mut skip = 0;
            loop {
                let page = with_timeout(
                    self.timeout,
                    &format!("list records of '{}'", record_type),
                    self.store
                        .list_records(record_type, locale, skip, self.page_size),
                )
                .await?;

                tracing::debug!(
                    "'{}' page at {}: {} of {} entry(ies) addressable",
                    record_type,
                    skip,
                    page.items.len(),
                    page.fetched
                );

                if page.fetched == 0 {
                    break;
                }

                report.total_entries += page.fetched;
                report.results.extend(
                    page.items
                        .iter()
                        .filter_map(|r| process_record(&walker, r))
                        .map(|result| result.with_locale(locale)),
                );

                if !page.more {
                    break;
                }
                // Dropped entries still occupy their slot in the backend's order
                skip += page.fetched;
            }
        }

        report.entries_with_changes = report.results.len();
        tracing::info!(
            "Scan finished: {} of {} record(s) have changes ({} occurrence(s))",
            report.entries_with_changes,
            report.total_entries,
            report.total_occurrences()
        );

        Ok(report)
    }

    async fn check_brand(&self, request: &ScanRequest) -> Result<Option<BrandValidation>> {
        if !request.options.use_brandkit {
            return Ok(None);
        }

        let (guard, kit) = match (self.brand_guard, request.brand_kit_id.as_deref()) {
            (Some(guard), Some(kit)) => (guard, kit),
            (None, _) => {
                tracing::warn!("Brand kit check requested but no brand guard is configured");
                return Ok(None);
            }
            (_, None) => {
                tracing::warn!("Brand kit check requested without a brand kit id");
                return Ok(None);
            }
        };

        // A stalled guard is treated like an unreachable one
        match tokio::time::timeout(self.timeout, check_replacement(guard, kit, &request.replace_term)).await {
            Ok(result) => result.map(Some),
            Err(_) => {
                tracing::warn!("Brand kit check timed out, treating term as approved");
                Ok(Some(BrandValidation::fail_open()))
            }
        }
    }
}

/// Walk every content field of a record. Returns `None` when nothing changed.
pub fn process_record(walker: &TreeWalker<'_>, record: &Record) -> Option<EntryScanResult> {
    let mut changes = Vec::new();
    let mut updated_data: Option<Map<String, serde_json::Value>> = None;

    for (key, value) in record.content_fields() {
        let walked = walker.walk_value(key, value);
        if !walked.has_changes {
            continue;
        }

        changes.push(FieldChange {
            field: key.clone(),
            before: value.clone(),
            after: walked.value.clone(),
            change_count: walked.change_count,
        });
        updated_data
            .get_or_insert_with(|| record.data.clone())
            .insert(key.clone(), walked.value);
    }

    let updated_data = updated_data?;
    tracing::debug!("Record '{}' has {} changed field(s)", record.uid, changes.len());

    Some(EntryScanResult {
        entry_uid: record.uid.clone(),
        content_type_uid: record.content_type_uid.clone(),
        title: record.title().to_string(),
        changes,
        updated_data,
        locale: None,
    })
}
