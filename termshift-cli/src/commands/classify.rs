use anyhow::Result;
use termshift_core::engine::{classify, version_parts};

use crate::core::output::OutputWriter;
use crate::OutputFormat;

pub fn run(term: String, format: &OutputFormat) -> Result<()> {
    let output = OutputWriter::new(format);
    let parts = version_parts(&term);
    output.write_classification(&term, classify(&term), parts.as_ref())
}
