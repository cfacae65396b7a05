//! Declared row schema
//!
//! A table is an ordered list of [`ColumnSpec`]s. Column types are written
//! in table files as Hive-style DDL type strings:
//!
//! ```text
//! int | bigint | float | double | string | boolean
//! array<T>
//! map<string,T>
//! struct<name:T,other:U>
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier regex is valid"));

/// Scalar leaf kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 text
    String,
    /// Boolean
    Bool,
}

impl ScalarKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" | "integer" | "bigint" | "smallint" | "tinyint" => Some(ScalarKind::Int),
            "float" | "double" | "decimal" => Some(ScalarKind::Float),
            "string" | "varchar" | "char" => Some(ScalarKind::String),
            "boolean" | "bool" => Some(ScalarKind::Bool),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
            ScalarKind::Bool => "boolean",
        }
    }
}

/// A named field inside a struct type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Declared field name
    pub name: String,
    /// Declared field type
    pub field_type: ColumnType,
}

/// Declared semantic type of a column or nested field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    /// A scalar leaf
    Scalar(ScalarKind),
    /// Ordered list of elements
    Array(Box<ColumnType>),
    /// String-keyed map
    Map(Box<ColumnType>),
    /// Ordered set of named fields
    Struct(Vec<FieldSpec>),
}

impl ColumnType {
    /// Parse a DDL type string such as `map<string,struct<a:int>>`
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = TypeParser { text, pos: 0 };
        let parsed = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos < text.len() {
            return Err(parser.error(format!(
                "unexpected trailing input '{}'",
                &text[parser.pos..]
            )));
        }
        Ok(parsed)
    }

    /// Whether this is `map<string,string>`
    pub fn is_string_map(&self) -> bool {
        matches!(self, ColumnType::Map(value) if **value == ColumnType::Scalar(ScalarKind::String))
    }

    /// Value type of a map, if this is one
    pub fn map_value(&self) -> Option<&ColumnType> {
        match self {
            ColumnType::Map(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Scalar(kind) => f.write_str(kind.as_str()),
            ColumnType::Array(elem) => write!(f, "array<{elem}>"),
            ColumnType::Map(value) => write!(f, "map<string,{value}>"),
            ColumnType::Struct(fields) => {
                f.write_str("struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", field.name, field.field_type)?;
                }
                f.write_str(">")
            }
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        ColumnType::parse(&text)
    }
}

impl From<ColumnType> for String {
    fn from(column_type: ColumnType) -> Self {
        column_type.to_string()
    }
}

/// A declared top-level column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Create a column, parsing its type string
    pub fn new(name: impl Into<String>, type_text: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            column_type: ColumnType::parse(type_text)?,
        })
    }
}

/// Ordered row schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Build a schema, rejecting invalid or repeated column names
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        for (i, column) in columns.iter().enumerate() {
            if !IDENTIFIER_REGEX.is_match(&column.name) {
                return Err(Error::InvalidColumn {
                    column: column.name.clone(),
                    message: "not a valid column name".to_string(),
                });
            }
            if columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(Error::InvalidColumn {
                    column: column.name.clone(),
                    message: "declared more than once".to_string(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Columns in declaration order
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column by name
    pub fn position(&self, name: &str, case_insensitive: bool) -> Option<usize> {
        self.columns.iter().position(|c| {
            if case_insensitive {
                c.name.eq_ignore_ascii_case(name)
            } else {
                c.name == name
            }
        })
    }
}

struct TypeParser<'a> {
    text: &'a str,
    pos: usize,
}

impl TypeParser<'_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::InvalidType {
            text: self.text.to_string(),
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.text[self.pos..].chars().next()
    }

    fn expect(&mut self, wanted: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == wanted => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{wanted}' but found '{c}'"))),
            None => Err(self.error(format!("expected '{wanted}' but input ended"))),
        }
    }

    fn word(&mut self) -> Result<&str> {
        self.skip_whitespace();
        let start = self.pos;
        let len = self.text[start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(self.text.len() - start);
        if len == 0 {
            return Err(self.error("expected a type or field name"));
        }
        self.pos += len;
        Ok(&self.text[start..start + len])
    }

    fn parse_type(&mut self) -> Result<ColumnType> {
        let name = self.word()?.to_ascii_lowercase();
        match name.as_str() {
            "array" => {
                self.expect('<')?;
                let elem = self.parse_type()?;
                self.expect('>')?;
                Ok(ColumnType::Array(Box::new(elem)))
            }
            "map" => {
                self.expect('<')?;
                let key = self.parse_type()?;
                if key != ColumnType::Scalar(ScalarKind::String) {
                    return Err(self.error(format!("map keys must be string, not {key}")));
                }
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect('>')?;
                Ok(ColumnType::Map(Box::new(value)))
            }
            "struct" => self.parse_struct(),
            other => {
                let kind = ScalarKind::from_name(other)
                    .ok_or_else(|| self.error(format!("unknown type '{other}'")))?;
                // varchar(10), decimal(10,2): size arguments do not change the kind
                if self.peek() == Some('(') {
                    let close = self.text[self.pos..]
                        .find(')')
                        .ok_or_else(|| self.error("unclosed '('"))?;
                    self.pos += close + 1;
                }
                Ok(ColumnType::Scalar(kind))
            }
        }
    }

    fn parse_struct(&mut self) -> Result<ColumnType> {
        self.expect('<')?;
        let mut fields: Vec<FieldSpec> = Vec::new();
        loop {
            let name = self.word()?.to_string();
            if fields.iter().any(|f| f.name.eq_ignore_ascii_case(&name)) {
                return Err(self.error(format!("struct field '{name}' declared twice")));
            }
            self.expect(':')?;
            let field_type = self.parse_type()?;
            fields.push(FieldSpec { name, field_type });
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('>') => {
                    self.pos += 1;
                    return Ok(ColumnType::Struct(fields));
                }
                Some(c) => return Err(self.error(format!("expected ',' or '>' but found '{c}'"))),
                None => return Err(self.error("unterminated struct")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("int", "int")]
    #[case("BIGINT", "int")]
    #[case("double", "float")]
    #[case("varchar(32)", "string")]
    #[case("decimal(10, 2)", "float")]
    #[case("boolean", "boolean")]
    #[case("array<int>", "array<int>")]
    #[case("MAP<STRING, ARRAY<INT>>", "map<string,array<int>>")]
    #[case("map<string, map<string, int>>", "map<string,map<string,int>>")]
    #[case(
        "struct<h1:string, h2:int>",
        "struct<h1:string,h2:int>"
    )]
    #[case(
        "array<struct<shoop:struct<foot:struct<noot:int>>>>",
        "array<struct<shoop:struct<foot:struct<noot:int>>>>"
    )]
    fn test_parse_and_display(#[case] input: &str, #[case] canonical: &str) {
        let parsed = ColumnType::parse(input).unwrap();
        assert_eq!(parsed.to_string(), canonical);
        assert_eq!(ColumnType::parse(canonical).unwrap(), parsed);
    }

    #[rstest]
    #[case("")]
    #[case("integerish")]
    #[case("array<int")]
    #[case("map<int,string>")]
    #[case("struct<>")]
    #[case("struct<a:int,a:string>")]
    #[case("int extra")]
    fn test_parse_rejects(#[case] input: &str) {
        let err = ColumnType::parse(input).unwrap_err();
        assert!(matches!(err, Error::InvalidType { .. }), "{input}: {err}");
    }

    #[test]
    fn test_struct_field_order_preserved() {
        let parsed = ColumnType::parse("struct<z:int,a:string,m:boolean>").unwrap();
        let ColumnType::Struct(fields) = parsed else {
            panic!("Expected struct");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_string_map_detection() {
        assert!(ColumnType::parse("map<string,string>").unwrap().is_string_map());
        assert!(!ColumnType::parse("map<string,int>").unwrap().is_string_map());
        assert!(!ColumnType::parse("string").unwrap().is_string_map());
    }

    #[test]
    fn test_schema_rejects_duplicate_columns() {
        let columns = vec![
            ColumnSpec::new("Listed", "int").unwrap(),
            ColumnSpec::new("listed", "string").unwrap(),
        ];
        assert!(matches!(
            Schema::new(columns),
            Err(Error::InvalidColumn { .. })
        ));
    }

    #[test]
    fn test_schema_position_respects_case_option() {
        let schema = Schema::new(vec![ColumnSpec::new("Troxy", "string").unwrap()]).unwrap();
        assert_eq!(schema.position("troxy", true), Some(0));
        assert_eq!(schema.position("troxy", false), None);
    }

    #[test]
    fn test_column_spec_from_yaml() {
        let yaml = "name: things\ntype: map<string, struct<value:int>>\n";
        let column: ColumnSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(column.name, "things");
        assert_eq!(column.column_type.to_string(), "map<string,struct<value:int>>");
    }
}
