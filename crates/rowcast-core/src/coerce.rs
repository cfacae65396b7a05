//! Type-directed coercion of JSON values
//!
//! | Declared  | Accepts                                        |
//! |-----------|------------------------------------------------|
//! | `string`  | any scalar, rendered as plain text             |
//! | `int`     | integer numbers; fractions truncate; numeric or `0x` hex strings |
//! | `float`   | numbers; numeric strings                       |
//! | `boolean` | booleans; `"true"` / `"false"` in any case     |
//! | `array`   | arrays (an empty object reads as an empty array) |
//! | `map`     | objects, keys kept verbatim                    |
//! | `struct`  | objects, fields resolved through [`KeyRenamer`] |
//!
//! JSON null is null for every type. Anything else becomes null and adds
//! a [`Warning`].

use serde_json::Number;

use crate::json::JsonValue;
use crate::rename::KeyRenamer;
use crate::schema::{ColumnType, FieldSpec, ScalarKind};
use crate::value::{Value, merge_entry};
use crate::warning::{Warning, WarningKind};

/// Coerces JSON values to declared column types
#[derive(Debug, Clone, Copy)]
pub struct ValueCoercer<'t> {
    renamer: &'t KeyRenamer,
}

impl<'t> ValueCoercer<'t> {
    /// Create a coercer resolving struct fields through `renamer`
    pub fn new(renamer: &'t KeyRenamer) -> Self {
        Self { renamer }
    }

    /// Coerce `json`, found at key path `path`, to `target`
    ///
    /// `path` is restored to its original contents before returning.
    pub fn coerce<'v>(
        &self,
        json: &'v JsonValue,
        target: &ColumnType,
        path: &mut Vec<&'v str>,
        warnings: &mut Vec<Warning>,
    ) -> Value {
        if json.is_null() {
            return Value::Null;
        }

        let result = match target {
            ColumnType::Scalar(kind) => coerce_scalar(json, *kind),
            ColumnType::Array(elem) => self.coerce_array(json, elem, path, warnings),
            ColumnType::Map(value_type) => self.coerce_map(json, value_type, path, warnings),
            ColumnType::Struct(fields) => self.coerce_struct(json, fields, path, warnings),
        };

        result.unwrap_or_else(|kind| {
            warnings.push(Warning::new(path, kind));
            Value::Null
        })
    }

    fn coerce_array<'v>(
        &self,
        json: &'v JsonValue,
        elem: &ColumnType,
        path: &mut Vec<&'v str>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Value, WarningKind> {
        match json {
            JsonValue::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.coerce(item, elem, path, warnings))
                    .collect(),
            )),
            // a record that failed to parse is read as {}, which must not poison array columns
            JsonValue::Object(entries) if entries.is_empty() => Ok(Value::Array(Vec::new())),
            other => Err(mismatch(&ColumnType::Array(Box::new(elem.clone())), other)),
        }
    }

    fn coerce_map<'v>(
        &self,
        json: &'v JsonValue,
        value_type: &ColumnType,
        path: &mut Vec<&'v str>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Value, WarningKind> {
        let JsonValue::Object(entries) = json else {
            return Err(mismatch(&ColumnType::Map(Box::new(value_type.clone())), json));
        };

        let mut out = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            path.push(key);
            let coerced = self.coerce(value, value_type, path, warnings);
            path.pop();
            merge_entry(&mut out, key.clone(), coerced);
        }
        Ok(Value::Map(out))
    }

    fn coerce_struct<'v>(
        &self,
        json: &'v JsonValue,
        fields: &[FieldSpec],
        path: &mut Vec<&'v str>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Value, WarningKind> {
        let JsonValue::Object(entries) = json else {
            return Err(mismatch(&ColumnType::Struct(fields.to_vec()), json));
        };

        let renames = self.renamer.renames(entries, path);
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            let value = match self.renamer.pick(entries, &renames, &field.name) {
                Some(i) => {
                    let (key, source) = &entries[i];
                    path.push(key);
                    let coerced = self.coerce(source, &field.field_type, path, warnings);
                    path.pop();
                    coerced
                }
                None => Value::Null,
            };
            out.push((field.name.clone(), value));
        }
        Ok(Value::Struct(out))
    }
}

fn mismatch(expected: &ColumnType, found: &JsonValue) -> WarningKind {
    WarningKind::TypeMismatch {
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
}

fn coerce_scalar(json: &JsonValue, kind: ScalarKind) -> Result<Value, WarningKind> {
    match (kind, json) {
        (_, JsonValue::Null) => Ok(Value::Null),
        (ScalarKind::String, JsonValue::String(s)) => Ok(Value::String(s.clone())),
        (ScalarKind::String, JsonValue::Number(n)) => Ok(Value::String(n.to_string())),
        (ScalarKind::String, JsonValue::Bool(b)) => Ok(Value::String(b.to_string())),
        (ScalarKind::Int, JsonValue::Number(n)) => int_from_number(n),
        (ScalarKind::Int, JsonValue::String(s)) => int_from_text(s),
        (ScalarKind::Float, JsonValue::Number(n)) => {
            n.as_f64()
                .map(Value::Float)
                .ok_or_else(|| WarningKind::NumberOutOfRange {
                    text: n.to_string(),
                })
        }
        (ScalarKind::Float, JsonValue::String(s)) => float_from_text(s),
        (ScalarKind::Bool, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),
        (ScalarKind::Bool, JsonValue::String(s)) => bool_from_text(s),
        (_, other) => Err(mismatch(&ColumnType::Scalar(kind), other)),
    }
}

fn int_from_number(n: &Number) -> Result<Value, WarningKind> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    match n.as_f64() {
        Some(f) if n.is_f64() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(Value::Int(f.trunc() as i64))
        }
        _ => Err(WarningKind::NumberOutOfRange {
            text: n.to_string(),
        }),
    }
}

fn int_from_text(s: &str) -> Result<Value, WarningKind> {
    let text = s.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => {
            let whole = match text.find('.') {
                Some(idx) if idx > 0 => &text[..idx],
                _ => text,
            };
            whole.parse::<i64>().ok()
        }
    };
    parsed.map(Value::Int).ok_or_else(|| WarningKind::UnparsableNumber {
        text: s.to_string(),
    })
}

fn float_from_text(s: &str) -> Result<Value, WarningKind> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
        .ok_or_else(|| WarningKind::UnparsableNumber {
            text: s.to_string(),
        })
}

fn bool_from_text(s: &str) -> Result<Value, WarningKind> {
    if s.eq_ignore_ascii_case("true") {
        Ok(Value::Bool(true))
    } else if s.eq_ignore_ascii_case("false") {
        Ok(Value::Bool(false))
    } else {
        Err(WarningKind::UnparsableBool {
            text: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::parse_record;
    use rstest::rstest;
    use serde_json::json;

    fn coerce_with(renamer: &KeyRenamer, text: &str, type_text: &str) -> (Value, Vec<Warning>) {
        let json = parse_record(text, true).unwrap();
        let target = ColumnType::parse(type_text).unwrap();
        let mut warnings = Vec::new();
        let mut path = Vec::new();
        let value = ValueCoercer::new(renamer).coerce(&json, &target, &mut path, &mut warnings);
        assert!(path.is_empty(), "path must be restored");
        (value, warnings)
    }

    fn coerce(text: &str, type_text: &str) -> (Value, Vec<Warning>) {
        let renamer = KeyRenamer::compile(Vec::new(), Vec::new(), true, false).unwrap();
        coerce_with(&renamer, text, type_text)
    }

    #[rstest]
    #[case("1", "string", Value::String("1".into()))]
    #[case("1.5", "string", Value::String("1.5".into()))]
    #[case("1.50", "string", Value::String("1.50".into()))]
    #[case("1e2", "int", Value::Int(100))]
    #[case("1e2", "float", Value::Float(100.0))]
    #[case("true", "string", Value::String("true".into()))]
    #[case(r#""hello""#, "string", Value::String("hello".into()))]
    #[case("42", "int", Value::Int(42))]
    #[case("1.9", "int", Value::Int(1))]
    #[case(r#""17""#, "int", Value::Int(17))]
    #[case(r#""-3.7""#, "int", Value::Int(-3))]
    #[case(r#""0x1F""#, "int", Value::Int(31))]
    #[case("2", "float", Value::Float(2.0))]
    #[case(r#""2.25""#, "float", Value::Float(2.25))]
    #[case("false", "boolean", Value::Bool(false))]
    #[case(r#""TRUE""#, "boolean", Value::Bool(true))]
    #[case("null", "int", Value::Null)]
    #[case("null", "struct<a:int>", Value::Null)]
    fn test_scalar_coercion(#[case] input: &str, #[case] type_text: &str, #[case] expected: Value) {
        let (value, warnings) = coerce(input, type_text);
        assert_eq!(value, expected);
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[rstest]
    #[case("[1]", "string")]
    #[case(r#"{"a": 1}"#, "string")]
    #[case(r#""abc""#, "int")]
    #[case("true", "int")]
    #[case("18446744073709551615", "int")]
    #[case("1e400", "int")]
    #[case("1e400", "float")]
    #[case(r#""NaN""#, "float")]
    #[case(r#""yes""#, "boolean")]
    #[case("1", "boolean")]
    #[case("5", "array<int>")]
    #[case("[1]", "map<string,int>")]
    #[case(r#""x""#, "struct<a:int>")]
    fn test_mismatch_is_null_with_warning(#[case] input: &str, #[case] type_text: &str) {
        let (value, warnings) = coerce(input, type_text);
        assert_eq!(value, Value::Null);
        assert_eq!(warnings.len(), 1, "{input} as {type_text}");
    }

    #[test]
    fn test_warning_names_expected_and_found() {
        let (_, warnings) = coerce(r#"{"a": [1]}"#, "struct<a:int>");
        assert_eq!(
            warnings,
            vec![Warning {
                path: "a".to_string(),
                kind: WarningKind::TypeMismatch {
                    expected: "int".to_string(),
                    found: "array".to_string(),
                },
            }]
        );
    }

    #[test]
    fn test_array_elements_coerced_individually() {
        let (value, warnings) = coerce(r#"[1, "2", "x", null]"#, "array<int>");
        assert_eq!(
            value,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Null, Value::Null])
        );
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_empty_object_reads_as_empty_array() {
        let (value, warnings) = coerce("{}", "array<int>");
        assert_eq!(value, Value::Array(Vec::new()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_map_keeps_keys_verbatim() {
        let (value, _) = coerce(r#"{"B": 2, "a": 1}"#, "map<string,int>");
        assert_eq!(value.keys(), vec!["B", "a"]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"B": 2, "a": 1})
        );
    }

    #[test]
    fn test_struct_missing_field_keeps_siblings() {
        let (value, warnings) = coerce(r#"{"h1": "abc", "extra": 5}"#, "struct<h1:string,h2:int>");
        assert_eq!(
            value,
            Value::Struct(vec![
                ("h1".to_string(), Value::String("abc".to_string())),
                ("h2".to_string(), Value::Null),
            ])
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_struct_field_lookup_ignores_case() {
        let (value, _) = coerce(r#"{"H2": 7}"#, "struct<h2:int>");
        assert_eq!(value.get("h2"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_struct_renames_through_arrays() {
        let renamer = KeyRenamer::compile(
            vec![("testme".to_string(), "ary.shoop.foot.noot".to_string())],
            Vec::new(),
            true,
            false,
        )
        .unwrap();
        let json = parse_record(
            r#"{"ary": [{"shoop": {"foot": {"noot": 123}}}, {"shoop": {"foot": {"noot": 456}}}]}"#,
            false,
        )
        .unwrap();
        let target =
            ColumnType::parse("array<struct<shoop:struct<foot:struct<testme:int>>>>").unwrap();
        let JsonValue::Object(entries) = &json else {
            panic!("Expected object");
        };
        let mut path = vec![entries[0].0.as_str()];
        let mut warnings = Vec::new();
        let value = ValueCoercer::new(&renamer).coerce(&entries[0].1, &target, &mut path, &mut warnings);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!([{"shoop": {"foot": {"testme": 123}}}, {"shoop": {"foot": {"testme": 456}}}])
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_nested_warning_path() {
        let (_, warnings) = coerce(
            r#"{"h_1": {"h2": "nope"}}"#,
            "map<string,struct<h2:int>>",
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, "h_1.h2");
    }
}
