use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write as _;
use termshift_core::engine::{Entity, TermClass, VersionParts};
use termshift_core::{ApplyResponse, EntryScanResult, ScanResponse};

use crate::OutputFormat;

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: &OutputFormat) -> Self {
        Self { format: *format }
    }

    pub fn write_scan(&self, response: &ScanResponse) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
            OutputFormat::Text => print!("{}", render_scan_text(response)),
            OutputFormat::Markdown => print!("{}", render_scan_markdown(response)),
        }
        Ok(())
    }

    pub fn write_apply(&self, response: &ApplyResponse) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(response)?);
            }
            OutputFormat::Text => {
                for result in &response.results {
                    match (&result.error, result.success) {
                        (_, true) => println!("✓ {}", result.entry_uid),
                        (Some(error), false) => println!("✗ {}: {}", result.entry_uid, error),
                        (None, false) => println!("✗ {}", result.entry_uid),
                    }
                }
                println!(
                    "\nApplied: {}  Failed: {}",
                    response.applied_count, response.failed_count
                );
            }
            OutputFormat::Markdown => {
                println!("# Apply Results\n");
                println!("| Record | Outcome |");
                println!("|--------|---------|");
                for result in &response.results {
                    let outcome = if result.success {
                        "applied".to_string()
                    } else {
                        format!("failed: {}", result.error.as_deref().unwrap_or("unknown error"))
                    };
                    println!("| `{}` | {} |", result.entry_uid, outcome);
                }
                println!(
                    "\n**Applied:** {}, **Failed:** {}",
                    response.applied_count, response.failed_count
                );
            }
        }
        Ok(())
    }

    pub fn write_types(&self, types: &[String]) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(types)?),
            OutputFormat::Text => {
                for record_type in types {
                    println!("{}", record_type);
                }
            }
            OutputFormat::Markdown => {
                println!("# Record Types\n");
                for record_type in types {
                    println!("- `{}`", record_type);
                }
            }
        }
        Ok(())
    }

    pub fn write_classification(
        &self,
        term: &str,
        class: TermClass,
        parts: Option<&VersionParts>,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                #[derive(Serialize)]
                struct Classification<'a> {
                    term: &'a str,
                    class: TermClass,
                    #[serde(skip_serializing_if = "Option::is_none")]
                    parts: Option<&'a VersionParts>,
                }
                println!(
                    "{}",
                    serde_json::to_string_pretty(&Classification { term, class, parts })?
                );
            }
            OutputFormat::Text | OutputFormat::Markdown => {
                println!("{}: {}", term, class);
                if let Some(parts) = parts {
                    println!("  name: {}", parts.name);
                    println!("  version: {}", parts.version);
                    if let Some(edition) = &parts.edition {
                        println!("  edition: {}", edition);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn write_entities(&self, entities: &[Entity]) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entities)?),
            OutputFormat::Text => {
                for entity in entities {
                    println!("{:?} {} ({:.2})", entity.kind, entity.text, entity.confidence);
                }
            }
            OutputFormat::Markdown => {
                println!("| Type | Text | Confidence |");
                println!("|------|------|------------|");
                for entity in entities {
                    println!("| {:?} | {} | {:.2} |", entity.kind, entity.text, entity.confidence);
                }
            }
        }
        Ok(())
    }
}

/// Line diff of two field values, changed lines only.
pub fn compute_diff(before: &Value, after: &Value) -> String {
    let old = display_value(before);
    let new = display_value(after);
    let diff = TextDiff::from_lines(&old, &new);

    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => continue,
        };
        out.push(sign);
        out.push_str(change.value());
        if change.missing_newline() {
            out.push('\n');
        }
    }
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn render_scan_text(response: &ScanResponse) -> String {
    let mut out = String::new();

    if let Some(error) = &response.error {
        let _ = writeln!(out, "Scan failed: {}", error);
        return out;
    }

    if let Some(validation) = &response.brand_validation {
        if let Some(reason) = &validation.reason {
            let _ = writeln!(out, "Brand kit: {}", reason);
        }
    }

    let _ = writeln!(
        out,
        "{} of {} records have changes",
        response.entries_with_changes, response.total_entries
    );

    for result in &response.preview {
        let _ = writeln!(out, "\n{}", entry_heading(result));
        for change in &result.changes {
            let _ = writeln!(out, "  {} ({} occurrence(s))", change.field, change.change_count);
            for line in compute_diff(&change.before, &change.after).lines() {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }

    let hidden = response.results.len().saturating_sub(response.preview.len());
    if hidden > 0 {
        let _ = writeln!(out, "\n... and {} more (use --save to keep the full report)", hidden);
    }
    out
}

fn render_scan_markdown(response: &ScanResponse) -> String {
    let mut out = String::new();

    if let Some(error) = &response.error {
        let _ = writeln!(out, "# Scan Failed\n\n{}", error);
        return out;
    }

    let _ = writeln!(out, "# Scan Results\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Records scanned | {} |", response.total_entries);
    let _ = writeln!(out, "| Records with changes | {} |", response.entries_with_changes);

    for result in &response.preview {
        let _ = writeln!(out, "\n## {}\n", entry_heading(result));
        for change in &result.changes {
            let _ = writeln!(out, "**{}** ({} occurrence(s))\n", change.field, change.change_count);
            let _ = writeln!(out, "```diff\n{}```", compute_diff(&change.before, &change.after));
        }
    }
    out
}

fn entry_heading(result: &EntryScanResult) -> String {
    format!(
        "{} [{}/{}]",
        result.title, result.content_type_uid, result.entry_uid
    )
}
