//! Table properties and their compiled, frozen form
//!
//! A table definition is a [`Schema`] plus a flat string property table.
//! [`CompiledTable::compile`] validates every rule against the schema
//! once; the result is immutable and can be shared across threads behind
//! an `Arc`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::prefix::{PrefixCollector, PrefixRule};
use crate::rename::KeyRenamer;
use crate::schema::{ColumnType, Schema};
use crate::unmapped::{ReversePrefix, UnmappedCollector, UnmappedSpec};

/// `prefix.for.<column> = <prefix>[, <prefix>...]`
pub const PREFIX_FOR: &str = "prefix.for.";
/// `unmapped.prefix.<prefix> = <column>`
pub const UNMAPPED_PREFIX: &str = "unmapped.prefix.";
/// `changekeyto.<field> = <path pattern>`
pub const CHANGE_KEY_TO: &str = "changekeyto.";
/// `mapping.<field> = <json key>`
pub const MAPPING: &str = "mapping.";
/// `unmapped.attr.key = <column>`
pub const UNMAPPED_ATTR_KEY: &str = "unmapped.attr.key";
/// Ignore ASCII case when matching keys, fields, prefixes and patterns
pub const CASE_INSENSITIVE: &str = "case.insensitive";
/// Let `a.b` in JSON populate a field named `a_b`
pub const DOTS_IN_KEYS: &str = "dots.in.keys";
/// Read malformed records as empty objects instead of failing
pub const IGNORE_MALFORMED_JSON: &str = "ignore.malformed.json";
/// Accept objects that repeat a key; the last value wins
pub const ALLOW_DUPLICATE_KEYS: &str = "allow.duplicate.json.keys";

const RULE_PREFIXES: [&str; 4] = [PREFIX_FOR, UNMAPPED_PREFIX, CHANGE_KEY_TO, MAPPING];
const FLAG_KEYS: [&str; 5] = [
    UNMAPPED_ATTR_KEY,
    CASE_INSENSITIVE,
    DOTS_IN_KEYS,
    IGNORE_MALFORMED_JSON,
    ALLOW_DUPLICATE_KEYS,
];

/// Boolean switches of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectionOptions {
    /// `case.insensitive`, default true
    pub case_insensitive: bool,
    /// `dots.in.keys`
    pub dots_in_keys: bool,
    /// `ignore.malformed.json`
    pub ignore_malformed_json: bool,
    /// `allow.duplicate.json.keys`
    pub allow_duplicate_keys: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            dots_in_keys: false,
            ignore_malformed_json: false,
            allow_duplicate_keys: false,
        }
    }
}

/// Flat property table of one table definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableProperties(BTreeMap<String, String>);

impl TableProperties {
    /// Create an empty property table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, returning `self` for chaining
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a property
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value of a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// All properties, sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no properties
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(suffix, value)` of every property whose key starts with `prefix`
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|suffix| (suffix, v)))
    }

    /// These properties layered over `defaults`; own values win
    pub fn merged_over(&self, defaults: &TableProperties) -> TableProperties {
        let mut merged = defaults.clone();
        merged.0.extend(self.0.clone());
        merged
    }

    /// Read the boolean switches
    pub fn options(&self) -> Result<ProjectionOptions> {
        let defaults = ProjectionOptions::default();
        Ok(ProjectionOptions {
            case_insensitive: self.flag(CASE_INSENSITIVE, defaults.case_insensitive)?,
            dots_in_keys: self.flag(DOTS_IN_KEYS, defaults.dots_in_keys)?,
            ignore_malformed_json: self
                .flag(IGNORE_MALFORMED_JSON, defaults.ignore_malformed_json)?,
            allow_duplicate_keys: self.flag(ALLOW_DUPLICATE_KEYS, defaults.allow_duplicate_keys)?,
        })
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key).map(str::trim) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(Error::ConfigInvalid {
                message: format!("property '{key}' must be true or false, got '{v}'"),
            }),
        }
    }

    fn is_known(key: &str) -> bool {
        FLAG_KEYS.contains(&key) || RULE_PREFIXES.iter().any(|p| key.starts_with(p))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TableProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// How a column is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    /// From the top-level key of the same name, or a renamed key
    Direct,
    /// Map of top-level keys selected by prefix
    Prefix,
    /// Map of every top-level key nothing else consumed
    CatchAll,
}

/// A validated, immutable table definition
#[derive(Debug, Clone)]
pub struct CompiledTable {
    name: String,
    schema: Schema,
    options: ProjectionOptions,
    renamer: KeyRenamer,
    prefixes: PrefixCollector,
    unmapped: UnmappedSpec,
    catch_all: Option<UnmappedCollector>,
    roles: Vec<ColumnRole>,
}

impl CompiledTable {
    /// Validate `properties` against `schema` and freeze the result
    pub fn compile(
        name: impl Into<String>,
        schema: Schema,
        properties: &TableProperties,
    ) -> Result<Self> {
        let name = name.into();
        let options = properties.options()?;
        let ci = options.case_insensitive;

        for (key, _) in properties.iter() {
            if !TableProperties::is_known(key) {
                tracing::debug!("Table '{}': ignoring unknown property '{}'", name, key);
            }
        }

        let renamer = KeyRenamer::compile(
            owned_pairs(properties.with_prefix(CHANGE_KEY_TO)),
            owned_pairs(properties.with_prefix(MAPPING)),
            ci,
            options.dots_in_keys,
        )?;

        let mut rules: Vec<PrefixRule> = Vec::new();
        for (column, list) in properties.with_prefix(PREFIX_FOR) {
            let declared = map_column(&schema, column, ci, PREFIX_FOR)?;
            let parsed = PrefixRule::parse(declared, list)?;
            match rules.iter_mut().find(|r| r.column == declared) {
                Some(rule) => {
                    for prefix in parsed.prefixes() {
                        rule.add_prefix(prefix.clone())?;
                    }
                }
                None => rules.push(parsed),
            }
        }

        let catch_all = match properties.get(UNMAPPED_ATTR_KEY).map(str::trim) {
            Some(column) => {
                let idx = schema
                    .position(column, ci)
                    .ok_or_else(|| Error::InvalidColumn {
                        column: column.to_string(),
                        message: format!("named by {UNMAPPED_ATTR_KEY} but not declared"),
                    })?;
                let declared = &schema.columns()[idx];
                if !declared.column_type.is_string_map() {
                    return Err(Error::InvalidColumn {
                        column: declared.name.clone(),
                        message: format!(
                            "catch-all column must be map<string,string>, not {}",
                            declared.column_type
                        ),
                    });
                }
                Some(declared.name.clone())
            }
            None => None,
        };

        let mut reverse_prefixes = Vec::new();
        for (prefix, column) in properties.with_prefix(UNMAPPED_PREFIX) {
            if prefix.is_empty() {
                return Err(Error::ConfigInvalid {
                    message: format!("'{UNMAPPED_PREFIX}' needs a prefix after the dot"),
                });
            }
            let declared = map_column(&schema, column.trim(), ci, UNMAPPED_PREFIX)?;
            if catch_all.as_deref() == Some(declared) {
                return Err(Error::InvalidColumn {
                    column: declared.to_string(),
                    message: format!("catch-all column cannot be the target of {UNMAPPED_PREFIX}{prefix}"),
                });
            }
            match rules.iter_mut().find(|r| r.column == declared) {
                Some(rule) => rule.add_prefix(prefix)?,
                None => rules.push(PrefixRule::new(declared, vec![prefix.to_string()])?),
            }
            reverse_prefixes.push(ReversePrefix {
                prefix: prefix.to_string(),
                column: declared.to_string(),
            });
        }

        if let Some(column) = &catch_all {
            if rules.iter().any(|r| &r.column == column) {
                return Err(Error::InvalidColumn {
                    column: column.clone(),
                    message: "cannot be both the catch-all and a prefix-collecting column".to_string(),
                });
            }
        }

        // rules follow column declaration order
        rules.sort_by_key(|r| schema.position(&r.column, false));
        let prefixes = PrefixCollector::new(rules, ci);

        let roles = schema
            .columns()
            .iter()
            .map(|column| {
                if catch_all.as_deref() == Some(column.name.as_str()) {
                    ColumnRole::CatchAll
                } else if prefixes.rule_for(&column.name).is_some() {
                    ColumnRole::Prefix
                } else {
                    ColumnRole::Direct
                }
            })
            .collect();

        tracing::debug!(
            "Compiled table '{}': {} columns, {} rename rules, {} prefix rules",
            name,
            schema.len(),
            renamer.rules().len(),
            prefixes.rules().len()
        );

        Ok(Self {
            name,
            schema,
            options,
            renamer,
            prefixes,
            unmapped: UnmappedSpec {
                column: catch_all.clone(),
                reverse_prefixes,
            },
            catch_all: catch_all.map(UnmappedCollector::new),
            roles,
        })
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared columns
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Boolean switches
    pub fn options(&self) -> ProjectionOptions {
        self.options
    }

    /// Rename and mapping rules
    pub fn renamer(&self) -> &KeyRenamer {
        &self.renamer
    }

    /// Prefix rules, in column order
    pub fn prefixes(&self) -> &PrefixCollector {
        &self.prefixes
    }

    /// Catch-all column and reverse prefixes
    pub fn unmapped(&self) -> &UnmappedSpec {
        &self.unmapped
    }

    /// Collector for the catch-all column, if one is declared
    pub fn catch_all(&self) -> Option<&UnmappedCollector> {
        self.catch_all.as_ref()
    }

    /// Role of each column, in declaration order
    pub fn roles(&self) -> &[ColumnRole] {
        &self.roles
    }

    /// SHA-256 of the compiled definition, hex encoded
    ///
    /// Two tables with the same columns, rules and options share a
    /// fingerprint whatever their names, key case or list spacing.
    /// Reverse prefixes are hashed as written, so `unmapped.prefix.x_ = a`
    /// and the equivalent `prefix.for.a` entry give different digests.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        for column in self.schema.columns() {
            hasher.update(format!("column {} {}\n", column.name, column.column_type).as_bytes());
        }
        let o = &self.options;
        hasher.update(
            format!(
                "options {} {} {} {}\n",
                o.case_insensitive, o.dots_in_keys, o.ignore_malformed_json, o.allow_duplicate_keys
            )
            .as_bytes(),
        );
        for rule in self.renamer.rules() {
            hasher.update(format!("rename {} {}\n", rule.field, rule.pattern).as_bytes());
        }
        for (field, key) in self.renamer.mappings() {
            hasher.update(format!("mapping {field} {key}\n").as_bytes());
        }
        for rule in self.prefixes.rules() {
            hasher.update(format!("prefix {} {}\n", rule.column, rule.prefixes().join(",")).as_bytes());
        }
        if let Some(column) = &self.unmapped.column {
            hasher.update(format!("unmapped {column}\n").as_bytes());
        }
        for reverse in &self.unmapped.reverse_prefixes {
            hasher.update(format!("reverse {} {}\n", reverse.prefix, reverse.column).as_bytes());
        }

        hex::encode(hasher.finalize())
    }
}

fn owned_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<(String, String)> {
    pairs
        .map(|(k, v)| (k.to_string(), v.trim().to_string()))
        .collect()
}

/// Declared name of a map-typed column referenced by a rule
fn map_column<'s>(schema: &'s Schema, column: &str, ci: bool, property: &str) -> Result<&'s str> {
    let idx = schema
        .position(column, ci)
        .ok_or_else(|| Error::InvalidColumn {
            column: column.to_string(),
            message: format!("named by {property} but not declared"),
        })?;
    let declared = &schema.columns()[idx];
    match declared.column_type {
        ColumnType::Map(_) => Ok(&declared.name),
        ref other => Err(Error::InvalidColumn {
            column: declared.name.clone(),
            message: format!("collects keys by prefix, so it must be a map, not {other}"),
        }),
    }
}
