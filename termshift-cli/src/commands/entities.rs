use anyhow::Result;
use termshift_core::engine::{CapitalizedPhraseDetector, EntityExtractor};

use crate::core::output::OutputWriter;
use crate::OutputFormat;

pub fn run(text: String, heuristic: bool, format: &OutputFormat) -> Result<()> {
    let extractor = if heuristic {
        EntityExtractor::new(Box::new(CapitalizedPhraseDetector))
    } else {
        EntityExtractor::default()
    };

    OutputWriter::new(format).write_entities(&extractor.extract(&text))
}
