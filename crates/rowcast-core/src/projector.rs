//! Record projection
//!
//! [`RecordProjector`] turns one JSON record into one [`ProjectedRow`]:
//!
//! 1. Top-level keys are renamed by any `changekeyto` rule matching them.
//! 2. Columns are filled in declaration order. Prefix columns collect
//!    matching keys; other columns take the key resolved for their name.
//! 3. Every key not consumed by steps 1-2 lands in the catch-all column.
//!
//! Projection never fails. A value that does not fit its column becomes
//! null and adds a [`Warning`] to the row.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

use crate::coerce::ValueCoercer;
use crate::error::Result;
use crate::json::{JsonValue, parse_record};
use crate::schema::Schema;
use crate::table::{ColumnRole, CompiledTable};
use crate::value::Value;
use crate::warning::{Warning, WarningKind};

/// One output row: a value per declared column, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    /// Column values
    pub values: Vec<Value>,
    /// Coercion problems met while filling the row
    pub warnings: Vec<Warning>,
}

impl ProjectedRow {
    /// Value of the column at `index`
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Whether every column came out null
    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }
}

/// A row paired with its schema, serializable as a JSON object keyed by
/// column name
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    schema: &'a Schema,
    row: &'a ProjectedRow,
}

impl<'a> RowView<'a> {
    /// Pair `row` with the schema it was projected against
    pub fn new(schema: &'a Schema, row: &'a ProjectedRow) -> Self {
        Self { schema, row }
    }

    /// Value of a column by its declared name
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.schema
            .columns()
            .iter()
            .position(|c| c.name == column)
            .and_then(|idx| self.row.value(idx))
    }
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let columns = self.schema.columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (column, value) in columns.iter().zip(&self.row.values) {
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}

/// Projects records against one compiled table
///
/// Cloning is cheap; clones share the table.
#[derive(Debug, Clone)]
pub struct RecordProjector {
    table: Arc<CompiledTable>,
}

impl RecordProjector {
    /// Create a projector over a shared table
    pub fn new(table: Arc<CompiledTable>) -> Self {
        Self { table }
    }

    /// The compiled table
    pub fn table(&self) -> &CompiledTable {
        &self.table
    }

    /// Parse and project one JSON text, honoring the duplicate-key switch
    pub fn project_text(&self, text: &str) -> Result<ProjectedRow> {
        let record = parse_record(text, self.table.options().allow_duplicate_keys)?;
        Ok(self.project(&record))
    }

    /// Project one parsed record
    ///
    /// A record that is not an object projects as an empty object and
    /// carries a warning.
    pub fn project(&self, record: &JsonValue) -> ProjectedRow {
        let table = &*self.table;
        let mut warnings = Vec::new();

        let entries: &[(String, JsonValue)] = match record {
            JsonValue::Object(entries) => entries,
            other => {
                warnings.push(Warning::new(
                    &[],
                    WarningKind::TypeMismatch {
                        expected: "object".to_string(),
                        found: other.kind().to_string(),
                    },
                ));
                &[]
            }
        };

        let renamer = table.renamer();
        let coercer = ValueCoercer::new(renamer);
        let renames = renamer.renames(entries, &[]);
        let names: Vec<&str> = entries
            .iter()
            .zip(&renames)
            .map(|((key, _), &renamed)| renamed.unwrap_or(key.as_str()))
            .collect();

        let prefixes = table.prefixes();
        let mut consumed: Vec<bool> = names.iter().map(|n| prefixes.is_collected(n)).collect();

        let columns = table.schema().columns();
        let mut values = Vec::with_capacity(columns.len());

        for (column, role) in columns.iter().zip(table.roles()) {
            let value = match role {
                ColumnRole::Prefix => {
                    match (
                        prefixes.rule_for(&column.name),
                        column.column_type.map_value(),
                    ) {
                        (Some(rule), Some(value_type)) => prefixes.collect(
                            entries,
                            &names,
                            rule,
                            value_type,
                            &coercer,
                            &mut warnings,
                        ),
                        _ => Value::Null,
                    }
                }
                // filled once every direct column has claimed its keys
                ColumnRole::CatchAll => Value::Null,
                ColumnRole::Direct => {
                    for (i, ((key, _), renamed)) in entries.iter().zip(&renames).enumerate() {
                        if renamer.candidate(key, *renamed, &column.name).is_some() {
                            consumed[i] = true;
                        }
                    }
                    match renamer.pick(entries, &renames, &column.name) {
                        Some(i) => {
                            let (key, json) = &entries[i];
                            let mut path = vec![key.as_str()];
                            coercer.coerce(json, &column.column_type, &mut path, &mut warnings)
                        }
                        None => Value::Null,
                    }
                }
            };
            values.push(value);
        }

        if let Some(collector) = table.catch_all() {
            if let Some(idx) = table.schema().position(collector.column(), false) {
                values[idx] = collector.collect(entries, &names, &consumed);
            }
        }

        ProjectedRow { values, warnings }
    }

    /// Serializable view of a row produced by this projector
    pub fn view<'a>(&'a self, row: &'a ProjectedRow) -> RowView<'a> {
        RowView::new(self.table.schema(), row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use crate::table::TableProperties;
    use serde_json::json;

    fn projector(columns: &[(&str, &str)], props: &[(&str, &str)]) -> RecordProjector {
        let schema = Schema::new(
            columns
                .iter()
                .map(|(name, ty)| ColumnSpec::new(*name, ty).unwrap())
                .collect(),
        )
        .unwrap();
        let props: TableProperties = props.iter().copied().collect();
        RecordProjector::new(Arc::new(CompiledTable::compile("t", schema, &props).unwrap()))
    }

    fn project(p: &RecordProjector, text: &str) -> serde_json::Value {
        let row = p.project_text(text).unwrap();
        serde_json::to_value(p.view(&row)).unwrap()
    }

    #[test]
    fn test_direct_columns_and_catch_all() {
        let p = projector(
            &[("id", "int"), ("name", "string"), ("other", "map<string,string>")],
            &[("unmapped.attr.key", "other")],
        );
        assert_eq!(
            project(&p, r#"{"ID": 7, "name": "x", "extra": [1, 2]}"#),
            json!({"id": 7, "name": "x", "other": {"extra": "[1,2]"}})
        );
    }

    #[test]
    fn test_column_order_follows_schema() {
        let p = projector(&[("b", "int"), ("a", "int")], &[]);
        let row = p.project_text(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(row.values, vec![Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_non_object_record_is_empty_row_with_warning() {
        let p = projector(
            &[("a", "int"), ("rest", "map<string,string>")],
            &[("unmapped.attr.key", "rest")],
        );
        let row = p.project(&JsonValue::Number(3.into()));
        assert_eq!(row.values, vec![Value::Null, Value::Map(Vec::new())]);
        assert_eq!(row.warnings.len(), 1);
        assert_eq!(row.warnings[0].path, "");
    }

    #[test]
    fn test_field_failure_does_not_abort_row() {
        let p = projector(&[("a", "int"), ("b", "string")], &[]);
        let row = p.project_text(r#"{"a": "oops", "b": "fine"}"#).unwrap();
        assert_eq!(row.values, vec![Value::Null, Value::String("fine".to_string())]);
        assert_eq!(row.warnings.len(), 1);
        assert_eq!(row.warnings[0].path, "a");
    }

    #[test]
    fn test_renamed_key_leaves_catch_all() {
        let p = projector(
            &[("troxy", "string"), ("other", "map<string,string>")],
            &[("changekeyto.troxy", "foxy"), ("unmapped.attr.key", "other")],
        );
        assert_eq!(
            project(&p, r#"{"foxy": "abc", "fox": 1}"#),
            json!({"troxy": "abc", "other": {"fox": "1"}})
        );
    }

    #[test]
    fn test_projector_is_shared_across_threads() {
        let p = projector(&[("a", "int")], &[]);
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let p = p.clone();
                std::thread::spawn(move || p.project_text(&format!(r#"{{"a": {n}}}"#)).unwrap())
            })
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap().values, vec![Value::Int(n as i64)]);
        }
    }
}
