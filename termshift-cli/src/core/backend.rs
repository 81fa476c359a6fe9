use anyhow::{Context, Result};
use std::path::PathBuf;
use termshift_core::{
    Config, HttpBrandGuard, HttpRecordStore, JsonlAuditLog, MemoryRecordStore, RecordStore, Session,
};

use crate::commands::GlobalOptions;

enum Store {
    Snapshot(MemoryRecordStore),
    Remote(HttpRecordStore),
}

/// Collaborators for one invocation: the record store plus the optional
/// brand guard and audit log, all built from the same config and session.
pub struct Backend {
    pub config: Config,
    store: Store,
    session: Option<Session>,
    snapshot: Option<PathBuf>,
}

impl Backend {
    pub fn open(global: &GlobalOptions) -> Result<Self> {
        let config = global.load_config()?;

        match &global.snapshot {
            Some(path) => {
                let store = MemoryRecordStore::from_snapshot(path)
                    .with_context(|| format!("Failed to load snapshot: {}", path.display()))?;
                tracing::info!("Using snapshot {}", path.display());

                Ok(Self {
                    config,
                    store: Store::Snapshot(store),
                    // Only needed for the brand guard and audit attribution
                    session: global.session().ok(),
                    snapshot: Some(path.clone()),
                })
            }
            None => {
                let session = global.session()?;
                let store = HttpRecordStore::new(&config.storage, session.clone())?;
                tracing::debug!("Using management API at {}", config.storage.api_base());

                Ok(Self {
                    config,
                    store: Store::Remote(store),
                    session: Some(session),
                    snapshot: None,
                })
            }
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        match &self.store {
            Store::Snapshot(store) => store as &dyn RecordStore,
            Store::Remote(store) => store as &dyn RecordStore,
        }
    }

    pub fn brand_guard(&self) -> Result<Option<HttpBrandGuard>> {
        match &self.session {
            Some(session) => Ok(Some(HttpBrandGuard::new(&self.config.brand_guard, session)?)),
            None => {
                tracing::warn!("No credentials available for the brand kit service");
                Ok(None)
            }
        }
    }

    pub fn audit_log(&self) -> Result<Option<JsonlAuditLog>> {
        if !self.config.audit.enabled {
            return Ok(None);
        }
        let log = JsonlAuditLog::from_config(&self.config.audit)
            .context("Failed to open the audit log directory")?;
        Ok(Some(log))
    }

    /// Audit actor: explicit override, then the session's user, then "unknown".
    pub fn actor(&self, user_id: Option<String>) -> String {
        user_id.unwrap_or_else(|| {
            self.session
                .as_ref()
                .map(|s| s.actor().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        })
    }

    /// Write snapshot-backed changes back to the snapshot file.
    pub fn persist(&self) -> Result<()> {
        if let (Store::Snapshot(store), Some(path)) = (&self.store, &self.snapshot) {
            store
                .save_snapshot(path)
                .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
            tracing::info!("Snapshot {} updated", path.display());
        }
        Ok(())
    }
}
