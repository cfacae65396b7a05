//! Configuration parsing and validation
//!
//! This module handles loading Rowcast project and table definitions.
//!
//! # Configuration Files
//!
//! - `rowcast.yaml` - Project root configuration
//! - `tables/*.yaml` - One table definition per file
//!
//! ```yaml
//! # tables/events.yaml
//! name: events
//! columns:
//!   - name: id
//!     type: bigint
//!   - name: attrs
//!     type: map<string,string>
//!   - name: other
//!     type: map<string,string>
//! properties:
//!   prefix.for.attrs: attr_, tag_
//!   unmapped.attr.key: other
//!   ignore.malformed.json: true
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::schema::{ColumnSpec, Schema};
use crate::table::{CompiledTable, TableProperties};

/// Root project configuration from `rowcast.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Properties applied to every table unless the table sets them itself
    #[serde(default, deserialize_with = "properties_from_yaml")]
    pub defaults: TableProperties,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// One table definition from `tables/<name>.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared columns, in row order
    pub columns: Vec<ColumnSpec>,

    /// Projection properties (`prefix.for.*`, `changekeyto.*`, ...)
    #[serde(default, deserialize_with = "properties_from_yaml")]
    pub properties: TableProperties,
}

impl TableConfig {
    /// Validated schema of this table
    pub fn schema(&self) -> Result<Schema> {
        Schema::new(self.columns.clone())
    }

    /// Compile this table with project-wide `defaults` underneath its own properties
    pub fn compile(&self, defaults: &TableProperties) -> Result<CompiledTable> {
        let properties = self.properties.merged_over(defaults);
        CompiledTable::compile(&self.name, self.schema()?, &properties)
    }
}

/// Property values may be written as YAML scalars or as lists of scalars;
/// everything is stored as text. Lists are joined with `", "`, which reads
/// back as a prefix list.
fn properties_from_yaml<'de, D>(deserializer: D) -> std::result::Result<TableProperties, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_yaml::Value> = BTreeMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::Sequence(items) => items
                    .into_iter()
                    .map(|item| scalar_text::<D::Error>(&key, item))
                    .collect::<std::result::Result<Vec<_>, _>>()?
                    .join(", "),
                other => scalar_text::<D::Error>(&key, other)?,
            };
            Ok((key, text))
        })
        .collect()
}

fn scalar_text<E: de::Error>(key: &str, value: serde_yaml::Value) -> std::result::Result<String, E> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        _ => Err(E::custom(format!(
            "property '{key}' must be a string, number or boolean"
        ))),
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or rowcast.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join("rowcast.yaml"), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        tracing::debug!("Loaded project '{}' from {}", project.name, config_path.display());

        Ok(Self { project, base_path })
    }

    /// Load all table definitions from `tables/*.yaml`, sorted by file name
    pub fn load_tables(&self) -> Result<Vec<TableConfig>> {
        let tables_dir = self.base_path.join("tables");
        if !tables_dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = std::fs::read_dir(&tables_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut tables: Vec<TableConfig> = Vec::new();
        for entry in entries {
            let contents = std::fs::read_to_string(entry.path())?;
            let table: TableConfig = serde_yaml::from_str(&contents)?;
            if tables.iter().any(|t| t.name == table.name) {
                return Err(Error::ConfigInvalid {
                    message: format!(
                        "table '{}' is defined more than once (again in {})",
                        table.name,
                        entry.path().display()
                    ),
                });
            }
            tables.push(table);
        }
        Ok(tables)
    }

    /// Find a table definition by name
    pub fn table(&self, name: &str) -> Result<TableConfig> {
        self.load_tables()?
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::ConfigInvalid {
                message: format!("no table named '{name}' under {}", self.base_path.join("tables").display()),
            })
    }

    /// Load and compile a table with the project defaults applied
    pub fn compile_table(&self, name: &str) -> Result<CompiledTable> {
        self.table(name)?.compile(&self.project.defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: test-project
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "test-project");
        assert_eq!(config.version, "0.1.0");
        assert!(config.defaults.is_empty());
    }

    #[test]
    fn test_parse_defaults_as_text() {
        let yaml = r#"
name: test-project
version: "1.0.0"
defaults:
  ignore.malformed.json: true
  case.insensitive: "false"
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.defaults.get("ignore.malformed.json"), Some("true"));
        assert_eq!(config.defaults.get("case.insensitive"), Some("false"));
    }

    #[test]
    fn test_parse_table_config() {
        let yaml = r#"
name: events
description: Raw click events
columns:
  - name: id
    type: bigint
  - name: attrs
    type: map<string, int>
properties:
  prefix.for.attrs: [attr_, tag_]
  changekeyto.id: event_id
"#;
        let table: TableConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.name, "events");
        assert_eq!(table.columns[1].column_type, ColumnType::parse("map<string,int>").unwrap());
        assert_eq!(table.properties.get("prefix.for.attrs"), Some("attr_, tag_"));

        let compiled = table.compile(&TableProperties::new()).unwrap();
        assert_eq!(
            compiled.prefixes().rule_for("attrs").unwrap().prefixes(),
            &["attr_", "tag_"]
        );
    }

    #[test]
    fn test_nested_property_value_rejected() {
        let yaml = r#"
name: events
columns: []
properties:
  prefix.for.attrs:
    nested: true
"#;
        assert!(serde_yaml::from_str::<TableConfig>(yaml).is_err());
    }

    #[test]
    fn test_bad_column_type_rejected() {
        let yaml = r#"
name: events
columns:
  - name: id
    type: map<int,string>
"#;
        assert!(serde_yaml::from_str::<TableConfig>(yaml).is_err());
    }

    #[test]
    fn test_load_tables_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("tables")).unwrap();
        std::fs::write(dir.path().join("rowcast.yaml"), "name: test\n").unwrap();
        std::fs::write(
            dir.path().join("tables/b.yaml"),
            "name: second\ncolumns:\n  - name: x\n    type: int\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("tables/a.yml"),
            "name: first\ncolumns:\n  - name: y\n    type: string\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("tables/notes.txt"), "ignored").unwrap();

        let config = Config::load(dir.path()).unwrap();
        let tables = config.load_tables().unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(config.table("second").is_ok());
        assert!(matches!(config.table("third"), Err(Error::ConfigInvalid { .. })));
    }

    #[test]
    fn test_load_missing_config() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(dir.path());
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_duplicate_table_names_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("tables")).unwrap();
        std::fs::write(dir.path().join("rowcast.yaml"), "name: test\n").unwrap();
        let table = "name: same\ncolumns:\n  - name: x\n    type: int\n";
        std::fs::write(dir.path().join("tables/a.yaml"), table).unwrap();
        std::fs::write(dir.path().join("tables/b.yaml"), table).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert!(config.load_tables().is_err());
    }
}
