//! Prefix-collecting map columns
//!
//! `prefix.for.<column> = a_, b_` gathers every top-level key starting
//! with `a_` or `b_` into the map column `<column>`. Keys keep their
//! full text, prefix included. Only the record's own keys are scanned;
//! nested objects are never searched.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::coerce::ValueCoercer;
use crate::error::{Error, Result};
use crate::json::JsonValue;
use crate::pattern::{eq_folded, starts_with_folded};
use crate::schema::ColumnType;
use crate::value::{Value, merge_entry};
use crate::warning::Warning;

static PREFIX_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",[ \t]*").expect("prefix separator regex is valid"));

/// Literal prefixes feeding one map column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixRule {
    /// Collecting column
    pub column: String,
    prefixes: Vec<String>,
}

impl PrefixRule {
    /// Create a rule; at least one non-empty prefix is required
    pub fn new(column: impl Into<String>, prefixes: Vec<String>) -> Result<Self> {
        let column = column.into();
        if prefixes.is_empty() {
            return Err(Error::ConfigInvalid {
                message: format!("prefix rule for column '{column}' lists no prefixes"),
            });
        }
        let mut rule = Self {
            column,
            prefixes: Vec::with_capacity(prefixes.len()),
        };
        for prefix in prefixes {
            rule.add_prefix(prefix)?;
        }
        Ok(rule)
    }

    /// Parse a comma-separated prefix list such as `"a_, b_,c_"`
    pub fn parse(column: impl Into<String>, list: &str) -> Result<Self> {
        let prefixes = PREFIX_SEPARATOR
            .split(list.trim())
            .map(str::to_string)
            .collect();
        Self::new(column, prefixes)
    }

    /// Add one more prefix; repeats are ignored
    pub fn add_prefix(&mut self, prefix: impl Into<String>) -> Result<()> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(Error::ConfigInvalid {
                message: format!("empty prefix for column '{}'", self.column),
            });
        }
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
        Ok(())
    }

    /// Prefixes in configuration order
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `key` starts with any of the prefixes
    pub fn matches(&self, key: &str, case_insensitive: bool) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| starts_with_folded(key, prefix, case_insensitive))
    }
}

/// Every prefix rule of a table
#[derive(Debug, Clone, Default)]
pub struct PrefixCollector {
    rules: Vec<PrefixRule>,
    case_insensitive: bool,
}

impl PrefixCollector {
    /// Create a collector over compiled rules
    pub fn new(rules: Vec<PrefixRule>, case_insensitive: bool) -> Self {
        Self {
            rules,
            case_insensitive,
        }
    }

    /// All rules
    pub fn rules(&self) -> &[PrefixRule] {
        &self.rules
    }

    /// Rule of a collecting column
    pub fn rule_for(&self, column: &str) -> Option<&PrefixRule> {
        self.rules
            .iter()
            .find(|rule| eq_folded(&rule.column, column, self.case_insensitive))
    }

    /// Columns that collect `key`; one key may feed several columns
    pub fn columns_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.matches(key, self.case_insensitive))
            .map(|rule| rule.column.as_str())
    }

    /// Whether any column collects `key`
    pub fn is_collected(&self, key: &str) -> bool {
        self.columns_for(key).next().is_some()
    }

    /// Build the map for `rule` from the record's top-level entries
    ///
    /// `names[i]` is the name entry `i` goes by after renaming; it is both
    /// what the prefix is tested against and the key of the map entry.
    /// Each value is coerced to `value_type`.
    pub fn collect<'v>(
        &self,
        entries: &'v [(String, JsonValue)],
        names: &[&str],
        rule: &PrefixRule,
        value_type: &ColumnType,
        coercer: &ValueCoercer<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Value {
        let mut out = Vec::new();
        let mut path: Vec<&'v str> = Vec::with_capacity(4);
        for ((key, json), name) in entries.iter().zip(names) {
            if !rule.matches(name, self.case_insensitive) {
                continue;
            }
            path.push(key);
            let value = coercer.coerce(json, value_type, &mut path, warnings);
            path.pop();
            merge_entry(&mut out, name.to_string(), value);
        }
        Value::Map(out)
    }
}
