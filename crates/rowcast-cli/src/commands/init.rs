//! Initialize a new Rowcast project

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Run the init command
pub fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join("rowcast.yaml").exists() {
        anyhow::bail!(
            "Directory '{}' already contains a rowcast.yaml",
            project_dir.display()
        );
    }

    tracing::info!("Creating new Rowcast project: {}", project_name);

    fs::create_dir_all(project_dir.join("tables"))?;
    fs::create_dir_all(project_dir.join("data"))?;

    let config = format!(
        r#"# Rowcast Project Configuration
name: {project_name}
version: "0.1.0"

# Properties applied to every table unless the table overrides them
defaults:
  case.insensitive: true
  ignore.malformed.json: false
"#
    );
    fs::write(project_dir.join("rowcast.yaml"), config)?;

    let example_table = r#"# Example table
name: events
description: Click events with free-form attributes

columns:
  - name: id
    type: bigint
  - name: user
    type: struct<name:string, age:int>
  - name: attrs
    type: map<string,string>
  - name: other
    type: map<string,string>

properties:
  # top-level keys starting with attr_ or tag_ are collected into attrs
  prefix.for.attrs: attr_, tag_
  # event_id fills the id column
  changekeyto.id: event_id
  # everything else lands here as JSON text
  unmapped.attr.key: other
"#;
    fs::write(project_dir.join("tables/events.yaml"), example_table)?;

    let sample_data = r#"{"event_id": 1, "user": {"name": "Ann", "age": 31}, "attr_color": "red", "source": "web"}
{"event_id": 2, "user": {"name": "Bob", "age": "27"}, "tag_beta": true}
{"event_id": 3, "user": null, "attr_size": 42, "debug": [1, 2, 3]}
"#;
    fs::write(project_dir.join("data/events.jsonl"), sample_data)?;

    let gitignore = r#"# Output files
data/*.out.jsonl

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  rowcast validate                                     # Check table definitions");
    tracing::info!("  rowcast project --table events -i data/events.jsonl  # Project sample data");

    Ok(())
}
