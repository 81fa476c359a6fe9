use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use super::{records_from_entries, RecordPage, RecordStore};
use crate::error::{Result, SweepError};

/// Ordered in-memory record store.
///
/// Backs offline runs against a JSON snapshot of the form
/// `{ "<record type>": [entry, ...], ... }`.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    types: Mutex<Vec<(String, Vec<Map<String, Value>>)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to a record type, creating the type if needed.
    pub fn insert(&self, record_type: &str, entry: Value) -> Result<()> {
        let entry = match entry {
            Value::Object(map) => map,
            other => {
                return Err(SweepError::MalformedField {
                    field: record_type.to_string(),
                    reason: format!("entry is not an object: {}", other),
                })
            }
        };

        let mut types = self.lock()?;
        match types.iter_mut().find(|(name, _)| name == record_type) {
            Some((_, entries)) => entries.push(entry),
            None => types.push((record_type.to_string(), vec![entry])),
        }
        Ok(())
    }

    pub fn from_snapshot_value(snapshot: Value) -> Result<Self> {
        let types = match snapshot {
            Value::Object(types) => types,
            _ => {
                return Err(SweepError::Config(
                    "snapshot must be an object of record type -> entries".to_string(),
                ))
            }
        };

        let store = Self::new();
        for (record_type, entries) in types {
            let entries = match entries {
                Value::Array(entries) => entries,
                _ => {
                    return Err(SweepError::Config(format!(
                        "snapshot entries for '{}' must be an array",
                        record_type
                    )))
                }
            };
            store.lock()?.push((record_type.clone(), Vec::new()));
            for entry in entries {
                store.insert(&record_type, entry)?;
            }
        }
        Ok(store)
    }

    pub fn from_snapshot(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_snapshot_value(serde_json::from_str(&contents)?)
    }

    pub fn snapshot(&self) -> Result<Value> {
        let types = self.lock()?;
        Ok(Value::Object(
            types
                .iter()
                .map(|(name, entries)| {
                    (
                        name.clone(),
                        Value::Array(entries.iter().cloned().map(Value::Object).collect()),
                    )
                })
                .collect(),
        ))
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot()?)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Current data of one record.
    pub fn get(&self, record_type: &str, record_id: &str) -> Option<Map<String, Value>> {
        let types = self.types.lock().ok()?;
        types
            .iter()
            .find(|(name, _)| name == record_type)?
            .1
            .iter()
            .find(|entry| entry.get("uid").and_then(Value::as_str) == Some(record_id))
            .cloned()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<(String, Vec<Map<String, Value>>)>>> {
        self.types
            .lock()
            .map_err(|_| SweepError::StorageUnavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_record_types(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_records(
        &self,
        record_type: &str,
        _locale: &str,
        skip: usize,
        limit: usize,
    ) -> Result<RecordPage> {
        let page: Vec<Value> = {
            let types = self.lock()?;
            let entries = types
                .iter()
                .find(|(name, _)| name == record_type)
                .map(|(_, entries)| entries.as_slice())
                .ok_or_else(|| {
                    SweepError::StorageUnavailable(format!("unknown record type '{}'", record_type))
                })?;

            entries
                .iter()
                .skip(skip)
                .take(limit)
                .cloned()
                .map(Value::Object)
                .collect()
        };

        let fetched = page.len();
        Ok(RecordPage {
            items: records_from_entries(record_type, page),
            fetched,
            more: fetched == limit,
        })
    }

    async fn update_record(
        &self,
        record_type: &str,
        record_id: &str,
        data: &Map<String, Value>,
        _locale: &str,
    ) -> Result<Value> {
        let mut types = self.lock()?;
        let entry = types
            .iter_mut()
            .find(|(name, _)| name == record_type)
            .and_then(|(_, entries)| {
                entries
                    .iter_mut()
                    .find(|entry| entry.get("uid").and_then(Value::as_str) == Some(record_id))
            })
            .ok_or_else(|| {
                SweepError::StorageUnavailable(format!(
                    "entry '{}' not found in '{}'",
                    record_id, record_type
                ))
            })?;

        let version = entry.get("_version").and_then(Value::as_u64);
        *entry = data.clone();
        if let Some(version) = version {
            entry.insert("_version".to_string(), json!(version + 1));
        }

        Ok(json!({
            "notice": "Entry updated successfully.",
            "entry": Value::Object(entry.clone()),
        }))
    }
}
