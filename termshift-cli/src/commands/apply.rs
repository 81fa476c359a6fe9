use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use termshift_core::{AuditSink, ChangeApplier, ScanResponse, SelectedChange};

use super::GlobalOptions;
use crate::core::backend::Backend;
use crate::core::output::OutputWriter;

pub async fn run(
    report: PathBuf,
    select: Vec<String>,
    all: bool,
    user_id: Option<String>,
    global: &GlobalOptions,
) -> Result<()> {
    let scan = load_report(&report)?;
    let selected = select_changes(&scan, &select, all)?;

    let backend = Backend::open(global)?;
    let output = OutputWriter::new(&global.format);
    let audit = backend.audit_log()?;

    let mut applier = ChangeApplier::from_config(backend.store(), &backend.config)
        .with_actor(&backend.actor(user_id));
    if let Some(audit) = audit.as_ref() {
        applier = applier.with_audit(audit as &dyn AuditSink);
    }

    let response = applier.apply(&selected).await;
    backend.persist()?;
    output.write_apply(&response)?;

    match response.partial_failure() {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

fn load_report(path: &Path) -> Result<ScanResponse> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report: {}", path.display()))?;
    let scan: ScanResponse = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse report: {}", path.display()))?;

    if !scan.success {
        anyhow::bail!(
            "report {} is from a failed scan: {}",
            path.display(),
            scan.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(scan)
}

/// Results to commit, in report order.
fn select_changes(scan: &ScanResponse, select: &[String], all: bool) -> Result<Vec<SelectedChange>> {
    if !all && select.is_empty() {
        anyhow::bail!("nothing selected: pass --select <id> or --all");
    }

    for id in select {
        if !scan.results.iter().any(|r| &r.entry_uid == id) {
            tracing::warn!("Record '{}' is not in the report, skipping", id);
        }
    }

    Ok(scan
        .results
        .iter()
        .filter(|r| all || select.contains(&r.entry_uid))
        .map(|r| r.to_selected_change())
        .collect())
}
