//! Ordered JSON value tree
//!
//! Records are parsed into [`JsonValue`] rather than `serde_json::Value`
//! so that object keys keep their arrival order and repeated keys survive
//! parsing. Whether a repeated key is acceptable is decided by
//! [`parse_record`]; lookups resolve repeats by taking the last occurrence.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;
use std::fmt;

use crate::error::{Error, Result};

// serde_json's `arbitrary_precision` hands numbers to visitors as a
// one-entry map under this key, holding the literal text
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// A parsed JSON value with order-preserving, duplicate-preserving objects
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any JSON number
    Number(Number),
    /// A JSON string
    String(String),
    /// A JSON array
    Array(Vec<JsonValue>),
    /// A JSON object, entries in arrival order
    Object(Vec<(String, JsonValue)>),
}

impl JsonValue {
    /// Entries of an object value
    pub fn as_object(&self) -> Option<&[(String, JsonValue)]> {
        match self {
            JsonValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in an object; the last occurrence wins
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object()?
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Whether this is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// Short name of the JSON kind, for warnings
    pub fn kind(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    /// Compact JSON text for this value
    ///
    /// Strings keep their quotes, numbers are written exactly as they
    /// appeared in the source (`1e2`, `1.50` and 30-digit integers stay
    /// as written), arrays and objects are written without whitespace.
    /// Parsing the result yields an equal value.
    pub fn to_json_text(&self) -> String {
        self.to_string()
    }

    /// First key that appears twice within a single object, at any depth
    pub fn find_duplicate_key(&self) -> Option<&str> {
        match self {
            JsonValue::Array(items) => items.iter().find_map(JsonValue::find_duplicate_key),
            JsonValue::Object(entries) => {
                for (i, (key, _)) in entries.iter().enumerate() {
                    if entries[..i].iter().any(|(k, _)| k == key) {
                        return Some(key);
                    }
                }
                entries.iter().find_map(|(_, v)| v.find_duplicate_key())
            }
            _ => None,
        }
    }
}

/// Parse one JSON document
///
/// When `allow_duplicate_keys` is false, an object that carries the same
/// key twice anywhere in the document is rejected.
pub fn parse_record(text: &str, allow_duplicate_keys: bool) -> Result<JsonValue> {
    let value: JsonValue = serde_json::from_str(text)?;
    if !allow_duplicate_keys {
        if let Some(key) = value.find_duplicate_key() {
            return Err(Error::DuplicateKey {
                key: key.to_string(),
            });
        }
    }
    Ok(value)
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonValue::Null => f.write_str("null"),
            JsonValue::Bool(b) => write!(f, "{b}"),
            JsonValue::Number(n) => write!(f, "{n}"),
            JsonValue::String(s) => write_quoted(f, s),
            JsonValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            JsonValue::Object(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_quoted(f, key)?;
                    write!(f, ":{value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    f.write_str(&quoted)
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            JsonValue::Null => serializer.serialize_unit(),
            JsonValue::Bool(b) => serializer.serialize_bool(*b),
            JsonValue::Number(n) => n.serialize(serializer),
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            JsonValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<JsonValue, E> {
        Number::from_f64(v)
            .map(JsonValue::Number)
            .ok_or_else(|| E::custom("non-finite number"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<JsonValue, D::Error> {
        JsonValue::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<JsonValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<JsonValue, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        let Some(first) = map.next_key::<String>()? else {
            return Ok(JsonValue::Object(entries));
        };
        if first == NUMBER_TOKEN {
            let literal: String = map.next_value()?;
            return literal
                .parse::<Number>()
                .map(JsonValue::Number)
                .map_err(de::Error::custom);
        }
        entries.push((first, map.next_value()?));
        while let Some((key, value)) = map.next_entry::<String, JsonValue>()? {
            entries.push((key, value));
        }
        Ok(JsonValue::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_object_keeps_arrival_order() {
        let value = parse_record(r#"{"z": 1, "a": 2, "m": 3}"#, false).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_duplicates_survive_and_last_wins() {
        let value = parse_record(r#"{"a": 1, "b": 2, "a": 3}"#, true).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
        assert_eq!(value.get("a"), Some(&JsonValue::Number(3.into())));
    }

    #[test]
    fn test_duplicates_rejected_at_depth() {
        let err = parse_record(r#"{"outer": [{"k": 1, "k": 2}]}"#, false).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref key } if key == "k"));
    }

    #[test]
    fn test_malformed_text_is_json_error() {
        let err = parse_record(r#"{"a": "#, false).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[rstest]
    #[case(r#"1"#, "1")]
    #[case(r#"1.1"#, "1.1")]
    #[case(r#"-7"#, "-7")]
    #[case(r#"true"#, "true")]
    #[case(r#""hello""#, r#""hello""#)]
    #[case(r#""say \"hi\"""#, r#""say \"hi\"""#)]
    #[case(r#"[1, 2, 3]"#, "[1,2,3]")]
    #[case(r#"{"a": 1, "b": [true, null]}"#, r#"{"a":1,"b":[true,null]}"#)]
    fn test_compact_text(#[case] input: &str, #[case] expected: &str) {
        let value = parse_record(input, false).unwrap();
        assert_eq!(value.to_json_text(), expected);
    }

    #[rstest]
    #[case("1e2")]
    #[case("1.50")]
    #[case("123456789012345678901234")]
    #[case("1e400")]
    #[case("0.1000000000000000055511151231257827")]
    fn test_number_literal_survives(#[case] literal: &str) {
        let value = parse_record(&format!(r#"{{"n": {literal}}}"#), false).unwrap();
        assert_eq!(value.get("n").unwrap().to_json_text(), literal);
        assert_eq!(value.to_json_text(), format!(r#"{{"n":{literal}}}"#));
    }

    #[test]
    fn test_text_reparses_to_equal_value() {
        let input = r#"{"n": 12.5, "s": "tab\there", "o": {"x": [1, {"y": false}]}}"#;
        let value = parse_record(input, false).unwrap();
        let again = parse_record(&value.to_json_text(), false).unwrap();
        assert_eq!(value, again);
    }

    #[test]
    fn test_serialize_matches_display() {
        let value = parse_record(r#"{"b": 1, "a": "x"}"#, false).unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), value.to_json_text());
    }
}
