//! Rowcast Core Library
//!
//! This crate projects loosely-structured JSON records onto statically
//! declared, strongly-typed rows:
//! - Configuration parsing and validation
//! - Rule compilation (prefix maps, key renaming, catch-all column)
//! - Type-directed value coercion
//! - Record projection and line-delimited input
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │   Config    │────▶│ CompiledTable│────▶│  Projector  │────▶ rows
//! │   (YAML)    │     │   (frozen)   │     │ (per record)│
//! └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rowcast_core::{Config, RecordProjector};
//!
//! let config = Config::load("./my-project")?;
//! let table = config.compile_table("events")?;
//! let projector = RecordProjector::new(Arc::new(table));
//! let row = projector.project_text(r#"{"id": 1, "attr_color": "red"}"#)?;
//! println!("{}", serde_json::to_string(&projector.view(&row))?);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coerce;
pub mod config;
pub mod error;
pub mod json;
pub mod pattern;
pub mod prefix;
pub mod projector;
pub mod reader;
pub mod rename;
pub mod schema;
pub mod table;
pub mod unmapped;
pub mod value;
pub mod warning;

pub use config::{Config, ProjectConfig, TableConfig};
pub use error::{Error, Result};
pub use json::{JsonValue, parse_record};
pub use projector::{ProjectedRow, RecordProjector, RowView};
pub use reader::{RecordReader, StreamStats, project_stream};
pub use schema::{ColumnSpec, ColumnType, Schema};
pub use table::{CompiledTable, ProjectionOptions, TableProperties};
pub use value::Value;
pub use warning::{Warning, WarningKind};
