//! Error types for rowcast-core
//!
//! Only configuration and input-framing problems are errors. Per-field
//! coercion problems during projection are reported as
//! [`Warning`](crate::warning::Warning)s and never abort a row.

use thiserror::Error;

/// Result type alias for rowcast-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rowcast-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A column type string could not be parsed
    #[error("invalid column type '{text}': {message}")]
    InvalidType {
        /// The type text as written
        text: String,
        /// Description of the problem
        message: String,
    },

    /// A rename path pattern could not be compiled
    #[error("invalid path pattern '{pattern}' for field '{field}': {message}")]
    InvalidPattern {
        /// Target field of the rule
        field: String,
        /// The pattern as written
        pattern: String,
        /// Description of the problem
        message: String,
    },

    /// Two rename rules can match the same path with equal specificity
    #[error(
        "ambiguous rename rules: '{first}' (-> {first_field}) and '{second}' (-> {second_field}) \
         can match the same key path with equal specificity"
    )]
    AmbiguousRenameRule {
        /// First pattern
        first: String,
        /// Field targeted by the first pattern
        first_field: String,
        /// Second pattern
        second: String,
        /// Field targeted by the second pattern
        second_field: String,
    },

    /// A rule refers to a column that is missing or has the wrong type
    #[error("column '{column}': {message}")]
    InvalidColumn {
        /// Column name as configured
        column: String,
        /// Description of the problem
        message: String,
    },

    /// A JSON record appeared with the same key twice
    #[error("duplicate key '{key}' in JSON object")]
    DuplicateKey {
        /// The repeated key
        key: String,
    },

    /// A JSON record could not be parsed
    #[error("malformed JSON on line {line}: {message}")]
    MalformedJson {
        /// 1-based input line number
        line: usize,
        /// Parser message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
