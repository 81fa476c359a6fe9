use anyhow::Result;
use std::time::Duration;
use termshift_core::storage::with_timeout;

use super::GlobalOptions;
use crate::core::backend::Backend;
use crate::core::output::OutputWriter;

pub async fn run(global: &GlobalOptions) -> Result<()> {
    let backend = Backend::open(global)?;
    let output = OutputWriter::new(&global.format);

    let timeout = Duration::from_secs(backend.config.storage.timeout_secs);
    let types = with_timeout(timeout, "list record types", backend.store().list_record_types()).await?;

    output.write_types(&types)?;
    Ok(())
}
