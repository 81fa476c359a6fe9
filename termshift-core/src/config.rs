use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for termshift
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub brand_guard: BrandGuardConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

/// Management API regions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    Na,
    Eu,
    AzureNa,
    AzureEu,
    GcpNa,
}

impl Region {
    pub fn api_base(&self) -> &'static str {
        match self {
            Region::Na => "https://api.contentstack.io/v3/",
            Region::Eu => "https://eu-api.contentstack.com/v3/",
            Region::AzureNa => "https://azure-na-api.contentstack.com/v3/",
            Region::AzureEu => "https://azure-eu-api.contentstack.com/v3/",
            Region::GcpNa => "https://gcp-na-api.contentstack.com/v3/",
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub region: Region,

    /// Overrides the region's API base (e.g. a proxy or a test server)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Locale used for reads and updates
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Records fetched per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Timeout for each storage call in seconds
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
}

/// Brand guideline service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandGuardConfig {
    #[serde(default = "default_brand_guard_base")]
    pub api_base: String,

    #[serde(default = "default_brand_guard_timeout")]
    pub timeout_secs: u64,
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Write one JSONL entry per applied change
    #[serde(default)]
    pub enabled: bool,

    /// Directory for audit files (defaults to ~/.termshift/audit)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotate to a new file once the current one reaches this size
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

/// Scan reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of results included in the preview
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

// Default value functions
fn default_locale() -> String {
    "en-us".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_storage_timeout() -> u64 {
    30
}

fn default_brand_guard_base() -> String {
    "https://api.contentstack.io/v1/brand-kit".to_string()
}

fn default_brand_guard_timeout() -> u64 {
    10
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_preview_limit() -> usize {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            api_base: None,
            locale: default_locale(),
            page_size: default_page_size(),
            timeout_secs: default_storage_timeout(),
        }
    }
}

impl StorageConfig {
    /// The API base URL in effect, always ending with a slash
    pub fn api_base(&self) -> String {
        let base = self
            .api_base
            .clone()
            .unwrap_or_else(|| self.region.api_base().to_string());
        if base.ends_with('/') {
            base
        } else {
            format!("{}/", base)
        }
    }
}

impl Default for BrandGuardConfig {
    fn default() -> Self {
        Self {
            api_base: default_brand_guard_base(),
            timeout_secs: default_brand_guard_timeout(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: None,
            max_file_size: default_max_file_size(),
        }
    }
}

impl AuditConfig {
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".termshift")
                .join("audit")
        })
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            preview_limit: default_preview_limit(),
        }
    }
}

impl Config {
    /// Load configuration with proper hierarchy
    ///
    /// **Config Priority (highest to lowest):**
    /// 1. `./termshift.toml` (project-level config)
    /// 2. `~/.config/termshift/config.toml` (global user config)
    /// 3. Hardcoded defaults
    ///
    /// A file that exists replaces everything below it; missing fields in
    /// that file fall back to defaults.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                tracing::info!("Loading global config from: {}", global_path.display());
                config = Self::load_from_file(&global_path)?;
            }
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            tracing::info!("Loading project config from: {}", project_path.display());
            config = Self::load_from_file(&project_path)?;
        }

        tracing::debug!(
            "Final config: api_base={}, locale={}, page_size={}",
            config.storage.api_base(),
            config.storage.locale,
            config.storage.page_size
        );

        Ok(config)
    }

    /// Load config from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.storage.page_size == 0 {
            anyhow::bail!("storage.page_size must be at least 1 in {}", path.display());
        }

        Ok(config)
    }

    /// Get the global config path (~/.config/termshift/config.toml)
    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("termshift").join("config.toml"))
    }

    /// Get the project config path (./termshift.toml in current directory)
    fn project_config_path() -> PathBuf {
        PathBuf::from("termshift.toml")
    }

    /// Create a default config file at the specified path
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let toml_string =
            toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        fs::write(path.as_ref(), toml_string)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}
