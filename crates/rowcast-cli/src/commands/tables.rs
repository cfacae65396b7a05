//! Table listing command

use anyhow::{Context, Result};
use rowcast_core::Config;
use rowcast_core::table::ColumnRole;

/// List every table with its columns and how each column is filled
pub fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let tables = config.load_tables().context("Failed to load table definitions")?;

    for table in &tables {
        let compiled = table
            .compile(&config.project.defaults)
            .with_context(|| format!("Failed to compile table '{}'", table.name))?;

        match &table.description {
            Some(description) => println!("{} - {}", table.name, description),
            None => println!("{}", table.name),
        }
        for (column, role) in compiled.schema().columns().iter().zip(compiled.roles()) {
            let source = match role {
                ColumnRole::Direct => String::new(),
                ColumnRole::Prefix => compiled
                    .prefixes()
                    .rule_for(&column.name)
                    .map(|rule| format!("  <- prefixes {}", rule.prefixes().join(", ")))
                    .unwrap_or_default(),
                ColumnRole::CatchAll => "  <- unmapped keys".to_string(),
            };
            println!("  {} {}{}", column.name, column.column_type, source);
        }
    }

    Ok(())
}
