pub mod apply;
pub mod classify;
pub mod config_init;
pub mod entities;
pub mod scan;
pub mod types;

use anyhow::{Context, Result};
use std::path::PathBuf;
use termshift_core::{Config, Session};

use crate::OutputFormat;

/// Flags shared by every subcommand.
pub struct GlobalOptions {
    pub format: OutputFormat,
    pub config: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub api_key: Option<String>,
    pub authtoken: Option<String>,
    pub management_token: Option<String>,
}

impl GlobalOptions {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from_file(path),
            None => Config::load(),
        }
    }

    /// A fresh session for this invocation.
    pub fn session(&self) -> Result<Session> {
        Session::resolve(
            self.api_key.clone(),
            self.authtoken.clone(),
            self.management_token.clone(),
        )
        .context("Could not build a storage session")
    }
}
