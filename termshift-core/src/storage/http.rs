use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use super::{records_from_entries, RecordPage, RecordStore};
use crate::config::StorageConfig;
use crate::error::{Result, SweepError};
use crate::session::{Credential, Session};

/// Management API client for a single stack, bound to one session.
pub struct HttpRecordStore {
    client: Client,
    base: Url,
    session: Session,
    timeout_secs: u64,
}

impl HttpRecordStore {
    pub fn new(config: &StorageConfig, session: Session) -> Result<Self> {
        let base = Url::parse(&config.api_base())
            .map_err(|e| SweepError::Config(format!("invalid storage api_base: {}", e)))?;

        let client = Client::builder()
            .user_agent(concat!("termshift/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base,
            session,
            timeout_secs: config.timeout_secs,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .map_err(|e| SweepError::Config(format!("invalid request path '{}': {}", path, e)))?;

        let builder = self
            .client
            .request(method, url)
            .header("api_key", &self.session.api_key);

        Ok(match &self.session.credential {
            Credential::AuthToken(token) => builder.header("authtoken", token),
            Credential::ManagementToken(token) => builder.header("authorization", token),
        })
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> Result<Value> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SweepError::Timeout {
                    operation: operation.to_string(),
                    seconds: self.timeout_secs,
                }
            } else {
                SweepError::StorageUnavailable(format!("{}: {}", operation, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SweepError::StorageUnavailable(format!(
                "{} failed with {}: {}",
                operation, status, body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SweepError::StorageUnavailable(format!("{}: invalid response body: {}", operation, e)))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list_record_types(&self) -> Result<Vec<String>> {
        let body = self
            .send(self.request(Method::GET, "content_types")?, "list content types")
            .await?;

        let types = body
            .get("content_types")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SweepError::StorageUnavailable("content type listing has no 'content_types' array".to_string())
            })?;

        Ok(types
            .iter()
            .filter_map(|t| t.get("uid").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn list_records(
        &self,
        record_type: &str,
        locale: &str,
        skip: usize,
        limit: usize,
    ) -> Result<RecordPage> {
        let builder = self
            .request(Method::GET, &format!("content_types/{}/entries", record_type))?
            .query(&[
                ("locale", locale.to_string()),
                ("skip", skip.to_string()),
                ("limit", limit.to_string()),
                ("include_metadata", "true".to_string()),
            ]);

        let body = self.send(builder, &format!("list entries of '{}'", record_type)).await?;
        let entries = match body.get("entries") {
            Some(Value::Array(entries)) => entries.clone(),
            _ => {
                return Err(SweepError::StorageUnavailable(format!(
                    "entry listing for '{}' has no 'entries' array",
                    record_type
                )))
            }
        };

        let fetched = entries.len();
        tracing::debug!(
            "Fetched {} entries of '{}' (skip={}, limit={})",
            entries.len(),
            record_type,
            skip,
            limit
        );

        Ok(RecordPage {
            items: records_from_entries(record_type, entries),
            fetched,
            more: fetched >= limit,
        })
    }

    async fn update_record(
        &self,
        record_type: &str,
        record_id: &str,
        data: &Map<String, Value>,
        locale: &str,
    ) -> Result<Value> {
        let builder = self
            .request(
                Method::PUT,
                &format!("content_types/{}/entries/{}", record_type, record_id),
            )?
            .query(&[("locale", locale)])
            .json(&json!({ "entry": data }));

        self.send(builder, &format!("update entry '{}'", record_id)).await
    }
}
