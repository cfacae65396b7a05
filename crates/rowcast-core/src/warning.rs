//! Per-field projection warnings
//!
//! A value that cannot be coerced to its declared type becomes null and
//! leaves a [`Warning`] behind; the rest of the row is unaffected.

use serde::Serialize;
use std::fmt;

/// What went wrong with one value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// JSON shape does not fit the declared type
    TypeMismatch {
        /// Declared type, as DDL text
        expected: String,
        /// JSON kind that was found
        found: String,
    },
    /// Number does not fit a 64-bit integer
    NumberOutOfRange {
        /// The number as written
        text: String,
    },
    /// String could not be read as a number
    UnparsableNumber {
        /// The string value
        text: String,
    },
    /// String could not be read as a boolean
    UnparsableBool {
        /// The string value
        text: String,
    },
}

/// A coercion problem at a key path within the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Dotted key path from the record root; arrays add no segment
    pub path: String,
    /// What went wrong
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl Warning {
    /// Create a warning at a key path
    pub fn new(path: &[&str], kind: WarningKind) -> Self {
        Self {
            path: path.join("."),
            kind,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<record>" } else { &self.path };
        match &self.kind {
            WarningKind::TypeMismatch { expected, found } => {
                write!(f, "{path}: expected {expected}, found {found}")
            }
            WarningKind::NumberOutOfRange { text } => {
                write!(f, "{path}: number {text} is out of range")
            }
            WarningKind::UnparsableNumber { text } => {
                write!(f, "{path}: '{text}' is not a number")
            }
            WarningKind::UnparsableBool { text } => {
                write!(f, "{path}: '{text}' is not a boolean")
            }
        }
    }
}
