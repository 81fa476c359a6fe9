use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::brand_guard::BrandValidation;
use crate::error::SweepError;

/// Switches that change how a scan rewrites text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanOptions {
    /// Pick a substitution strategy from the shape of the find term.
    pub context_aware: bool,
    /// Rewrite link targets as well as link text.
    pub update_links: bool,
    /// Keep emails and URLs that embed the find term consistent.
    pub named_entities: bool,
    /// Check the replacement term against a brand kit before scanning.
    pub use_brandkit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub find_term: String,
    pub replace_term: String,
    /// Record types to scan; empty means every type the store knows.
    #[serde(default, alias = "recordTypes")]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub options: ScanOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_kit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl ScanRequest {
    pub fn new(find_term: impl Into<String>, replace_term: impl Into<String>) -> Self {
        Self {
            find_term: find_term.into(),
            replace_term: replace_term.into(),
            content_types: Vec::new(),
            options: ScanOptions::default(),
            brand_kit_id: None,
            locale: None,
        }
    }

    pub fn with_content_types(mut self, content_types: Vec<String>) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }
}

/// One changed field of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub before: Value,
    pub after: Value,
    pub change_count: usize,
}

/// Proposed changes for a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryScanResult {
    pub entry_uid: String,
    pub content_type_uid: String,
    pub title: String,
    pub changes: Vec<FieldChange>,
    /// The full record with every changed field overridden.
    pub updated_data: Map<String, Value>,
    /// Locale the record was read in; writes go back to the same locale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl EntryScanResult {
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    pub fn total_occurrences(&self) -> usize {
        self.changes.iter().map(|c| c.change_count).sum()
    }

    pub fn to_selected_change(&self) -> SelectedChange {
        SelectedChange {
            entry_uid: self.entry_uid.clone(),
            content_type_uid: self.content_type_uid.clone(),
            updated_data: self.updated_data.clone(),
            changes: self.changes.clone(),
            locale: self.locale.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Every record fetched, changed or not.
    pub total_entries: usize,
    pub entries_with_changes: usize,
    pub results: Vec<EntryScanResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_validation: Option<BrandValidation>,
}

impl ScanReport {
    pub fn preview(&self, limit: usize) -> &[EntryScanResult] {
        &self.results[..self.results.len().min(limit)]
    }

    pub fn total_occurrences(&self) -> usize {
        self.results.iter().map(EntryScanResult::total_occurrences).sum()
    }
}

/// Wire shape of a scan outcome: the report plus a bounded preview, or a failure message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub total_entries: usize,
    #[serde(default)]
    pub entries_with_changes: usize,
    #[serde(default)]
    pub results: Vec<EntryScanResult>,
    #[serde(default)]
    pub preview: Vec<EntryScanResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_validation: Option<BrandValidation>,
}

impl ScanResponse {
    pub fn from_report(report: ScanReport, preview_limit: usize) -> Self {
        let preview = report.preview(preview_limit).to_vec();
        Self {
            success: true,
            error: None,
            total_entries: report.total_entries,
            entries_with_changes: report.entries_with_changes,
            results: report.results,
            preview,
            brand_validation: report.brand_validation,
        }
    }

    pub fn failed(error: &SweepError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            total_entries: 0,
            entries_with_changes: 0,
            results: Vec::new(),
            preview: Vec::new(),
            brand_validation: None,
        }
    }

    pub fn from_result(result: crate::error::Result<ScanReport>, preview_limit: usize) -> Self {
        match result {
            Ok(report) => Self::from_report(report, preview_limit),
            Err(e) => Self::failed(&e),
        }
    }
}

/// A scan result the caller chose to commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedChange {
    #[serde(alias = "recordId")]
    pub entry_uid: String,
    #[serde(alias = "recordTypeId")]
    pub content_type_uid: String,
    #[serde(alias = "updatedFieldData")]
    pub updated_data: Map<String, Value>,
    /// The field changes the selection was built from, kept for auditing.
    #[serde(default, alias = "originalChangeList")]
    pub changes: Vec<FieldChange>,
    /// Overrides the applier's locale for this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub selected_changes: Vec<SelectedChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub entry_uid: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyResult {
    pub fn applied(entry_uid: &str, response: Value) -> Self {
        Self {
            entry_uid: entry_uid.to_string(),
            success: true,
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(entry_uid: &str, error: &SweepError) -> Self {
        Self {
            entry_uid: entry_uid.to_string(),
            success: false,
            response: None,
            error: Some(error.to_string()),
        }
    }
}

/// Batch outcome of an apply. `success` is true even when every item failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub success: bool,
    pub results: Vec<ApplyResult>,
    pub applied_count: usize,
    pub failed_count: usize,
}

impl ApplyResponse {
    pub fn from_results(results: Vec<ApplyResult>) -> Self {
        let applied_count = results.iter().filter(|r| r.success).count();
        let failed_count = results.iter().filter(|r| !r.success).count();
        Self {
            success: true,
            results,
            applied_count,
            failed_count,
        }
    }

    /// A `PartialApplyFailure` describing the failed items, if any.
    pub fn partial_failure(&self) -> Option<SweepError> {
        (self.failed_count > 0).then(|| SweepError::PartialApplyFailure {
            failed: self.failed_count,
            total: self.results.len(),
        })
    }
}
