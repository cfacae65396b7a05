//! Typed values produced by projection

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A value coerced to its declared column type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing, null, or failed coercion
    Null,
    /// `int` leaf
    Int(i64),
    /// `float` leaf
    Float(f64),
    /// `string` leaf
    String(String),
    /// `boolean` leaf
    Bool(bool),
    /// `array<T>` value
    Array(Vec<Value>),
    /// `map<string,T>` value, entries in insertion order
    Map(Vec<(String, Value)>),
    /// `struct<...>` value, one entry per declared field in declaration order
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Entry of a map or field of a struct
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) | Value::Struct(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Text of a `String` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Keys of a map or struct, in order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Value::Map(entries) | Value::Struct(entries) => {
                entries.iter().map(|(k, _)| k.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Insert into an ordered entry list; a repeated key keeps its first
/// position and takes the newer value
pub fn merge_entry(entries: &mut Vec<(String, Value)>, key: String, value: Value) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) | Value::Struct(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}
