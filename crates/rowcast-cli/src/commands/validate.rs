//! Validate configuration command

use anyhow::{Context, Result};
use rowcast_core::Config;

/// Run the validate command
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);

    let tables = config.load_tables().context("Failed to load table definitions")?;
    if tables.is_empty() {
        tracing::warn!("No tables found under {}", config.base_path.join("tables").display());
    }

    let mut failures = 0;
    for table in &tables {
        match table.compile(&config.project.defaults) {
            Ok(compiled) => {
                tracing::info!("✓ Table '{}' ({} columns)", table.name, compiled.schema().len());
                println!("{}  {}", compiled.fingerprint(), table.name);
            }
            Err(e) => {
                failures += 1;
                tracing::error!("✗ Table '{}': {}", table.name, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} tables failed to compile", failures, tables.len());
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
