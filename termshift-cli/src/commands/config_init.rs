use anyhow::Result;
use std::path::PathBuf;
use termshift_core::Config;

pub fn run(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::create_default_config(&path)?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(())
}
