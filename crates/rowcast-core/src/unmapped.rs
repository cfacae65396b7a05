//! Catch-all column for keys no other column consumes
//!
//! Values are kept as their compact JSON text (`"hello"` keeps its
//! quotes, `[1,2,3]` stays an array literal, numbers keep the literal
//! written in the record), so the original value can be recovered by
//! parsing the text again. JSON null stays a real null.

use crate::json::JsonValue;
use crate::value::{Value, merge_entry};

/// `unmapped.prefix.<prefix> = <column>`: collect `<prefix>` keys into
/// `<column>` instead of the catch-all
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReversePrefix {
    /// Literal key prefix
    pub prefix: String,
    /// Map column receiving matching keys
    pub column: String,
}

/// Catch-all configuration of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnmappedSpec {
    /// Catch-all column (`unmapped.attr.key`), if declared
    pub column: Option<String>,
    /// Reverse prefix entries, sorted by prefix
    pub reverse_prefixes: Vec<ReversePrefix>,
}

/// Fills the catch-all column from the record's residual keys
#[derive(Debug, Clone)]
pub struct UnmappedCollector {
    column: String,
}

impl UnmappedCollector {
    /// Create a collector for `column`
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    /// Catch-all column name
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Map of every top-level entry with `consumed[i] == false`
    ///
    /// Entries are keyed by `names[i]`, the name after renaming.
    pub fn collect(
        &self,
        entries: &[(String, JsonValue)],
        names: &[&str],
        consumed: &[bool],
    ) -> Value {
        let mut out = Vec::new();
        for (((_, json), name), used) in entries.iter().zip(names).zip(consumed) {
            if *used {
                continue;
            }
            let text = match json {
                JsonValue::Null => Value::Null,
                other => Value::String(other.to_json_text()),
            };
            merge_entry(&mut out, name.to_string(), text);
        }
        Value::Map(out)
    }
}
