//! Brand guideline checks for replacement terms.
//!
//! The guard is advisory infrastructure: when the service cannot be reached
//! every check fails open, so an outage never blocks a scan.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::BrandGuardConfig;
use crate::error::{Result, SweepError};
use crate::session::Session;

pub const UNAVAILABLE_REASON: &str = "Service unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandValidation {
    pub approved: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BrandValidation {
    pub fn approved() -> Self {
        Self {
            approved: true,
            suggestions: Vec::new(),
            reason: None,
        }
    }

    pub fn fail_open() -> Self {
        Self {
            approved: true,
            suggestions: Vec::new(),
            reason: Some(UNAVAILABLE_REASON.to_string()),
        }
    }
}

#[async_trait]
pub trait BrandGuard: Send + Sync {
    async fn validate_term(&self, brand_kit_id: &str, term: &str) -> BrandValidation;
    async fn suggestions(&self, brand_kit_id: &str, term: &str) -> Vec<String>;
    async fn is_banned(&self, brand_kit_id: &str, term: &str) -> bool;
}

/// Approves everything. Used when no brand kit service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllBrandGuard;

#[async_trait]
impl BrandGuard for AllowAllBrandGuard {
    async fn validate_term(&self, _brand_kit_id: &str, _term: &str) -> BrandValidation {
        BrandValidation::approved()
    }

    async fn suggestions(&self, _brand_kit_id: &str, _term: &str) -> Vec<String> {
        Vec::new()
    }

    async fn is_banned(&self, _brand_kit_id: &str, _term: &str) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    approved: bool,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsResponse {
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BannedResponse {
    #[serde(default)]
    is_banned: bool,
}

/// Brand kit service client.
pub struct HttpBrandGuard {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBrandGuard {
    pub fn new(config: &BrandGuardConfig, session: &Session) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("termshift/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            token: session.credential.token().to_string(),
        })
    }

    fn kit_url(&self, brand_kit_id: &str, action: &str) -> String {
        format!("{}/{}/{}", self.base_url, brand_kit_id, action)
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SweepError::StorageUnavailable(format!(
                "brand kit service returned {}: {}",
                status, body
            )));
        }
        Ok(response.json::<T>().await?)
    }

    async fn try_validate(&self, brand_kit_id: &str, term: &str) -> Result<BrandValidation> {
        let request = self
            .client
            .post(self.kit_url(brand_kit_id, "validate"))
            .json(&serde_json::json!({ "term": term }));
        let body: ValidateResponse = self.send(request).await?;

        Ok(BrandValidation {
            approved: body.approved,
            suggestions: body.suggestions,
            reason: body.reason,
        })
    }
}

#[async_trait]
impl BrandGuard for HttpBrandGuard {
    async fn validate_term(&self, brand_kit_id: &str, term: &str) -> BrandValidation {
        match self.try_validate(brand_kit_id, term).await {
            Ok(validation) => validation,
            Err(e) => {
                tracing::warn!("Brand kit validation failed, treating '{}' as approved: {}", term, e);
                BrandValidation::fail_open()
            }
        }
    }

    async fn suggestions(&self, brand_kit_id: &str, term: &str) -> Vec<String> {
        let request = self
            .client
            .get(self.kit_url(brand_kit_id, "suggestions"))
            .query(&[("term", term)]);
        match self.send::<SuggestionsResponse>(request).await {
            Ok(body) => body.suggestions,
            Err(e) => {
                tracing::warn!("Error getting brand kit suggestions: {}", e);
                Vec::new()
            }
        }
    }

    async fn is_banned(&self, brand_kit_id: &str, term: &str) -> bool {
        let request = self
            .client
            .get(self.kit_url(brand_kit_id, "banned-terms"))
            .query(&[("term", term)]);
        match self.send::<BannedResponse>(request).await {
            Ok(body) => body.is_banned,
            Err(e) => {
                tracing::warn!("Error checking banned terms: {}", e);
                false
            }
        }
    }
}

/// Gate a replacement term: banned or unapproved terms are rejected with
/// whatever alternatives the brand kit offers.
pub async fn check_replacement(
    guard: &dyn BrandGuard,
    brand_kit_id: &str,
    term: &str,
) -> Result<BrandValidation> {
    if guard.is_banned(brand_kit_id, term).await {
        return Err(SweepError::TermRejected {
            term: term.to_string(),
            reason: "term is banned".to_string(),
            suggestions: guard.suggestions(brand_kit_id, term).await,
        });
    }

    let validation = guard.validate_term(brand_kit_id, term).await;
    if !validation.approved {
        return Err(SweepError::TermRejected {
            term: term.to_string(),
            reason: validation
                .reason
                .unwrap_or_else(|| "not approved".to_string()),
            suggestions: validation.suggestions,
        });
    }

    Ok(validation)
}
