use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use termshift_core::engine::{CapitalizedPhraseDetector, EntityExtractor};
use termshift_core::{BrandGuard, RecordScanner, ScanRequest, ScanResponse};

use super::GlobalOptions;
use crate::core::backend::Backend;
use crate::core::output::OutputWriter;
use crate::OutputFormat;

pub async fn run(
    request: ScanRequest,
    heuristic: bool,
    save: Option<PathBuf>,
    global: &GlobalOptions,
) -> Result<()> {
    let backend = Backend::open(global)?;
    let output = OutputWriter::new(&global.format);

    let guard = if request.options.use_brandkit {
        backend.brand_guard()?
    } else {
        None
    };

    let mut scanner = RecordScanner::from_config(backend.store(), &backend.config);
    if let Some(guard) = guard.as_ref() {
        scanner = scanner.with_brand_guard(guard as &dyn BrandGuard);
    }
    if heuristic {
        scanner = scanner.with_extractor(EntityExtractor::new(Box::new(CapitalizedPhraseDetector)));
    }

    let spinner = match global.format {
        OutputFormat::Text => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            spinner.set_message(format!("Scanning for '{}'...", request.find_term));
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(spinner)
        }
        _ => None,
    };

    let start = Instant::now();
    let result = scanner.scan(&request).await;

    if let Some(spinner) = spinner {
        match &result {
            Ok(_) => spinner.finish_with_message(format!("Scan complete in {:?}", start.elapsed())),
            Err(_) => spinner.finish_with_message("Scan failed!"),
        }
    }

    if let Err(e) = &result {
        if e.is_storage_failure() {
            tracing::error!(
                "Could not reach the record store; check credentials, region and api_base ({})",
                backend.config.storage.api_base()
            );
        }
    }

    let response = ScanResponse::from_result(result, backend.config.scan.preview_limit);

    if let Some(path) = &save {
        std::fs::write(path, serde_json::to_string_pretty(&response)?)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        tracing::info!("Saved scan report to {}", path.display());
    }

    output.write_scan(&response)?;

    if let Some(error) = response.error {
        anyhow::bail!("scan failed: {}", error);
    }
    Ok(())
}
