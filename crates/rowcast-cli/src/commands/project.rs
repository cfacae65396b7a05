//! Project JSON lines through a table

use anyhow::{Context, Result};
use rowcast_core::{Config, RecordProjector, project_stream};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;

/// Run the project command
pub fn run(
    config_path: &str,
    table_name: &str,
    input: Option<&str>,
    output: Option<&str>,
    with_warnings: bool,
) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let table = config
        .compile_table(table_name)
        .with_context(|| format!("Failed to compile table '{table_name}'"))?;
    tracing::debug!("Table '{}' fingerprint {}", table_name, table.fingerprint());
    let projector = RecordProjector::new(Arc::new(table));

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open input {path}"))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output {path}"))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let stats = project_stream(&projector, reader, |row| {
        let view = projector.view(&row);
        if with_warnings {
            serde_json::to_writer(&mut writer, &json!({"row": view, "warnings": row.warnings}))?;
        } else {
            serde_json::to_writer(&mut writer, &view)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    })
    .with_context(|| format!("Failed to project records into '{table_name}'"))?;
    writer.flush()?;

    tracing::info!(
        "✓ Projected {} rows ({} warnings, {} malformed lines)",
        stats.rows,
        stats.warnings,
        stats.malformed
    );
    Ok(())
}
