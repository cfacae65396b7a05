//! Line-delimited record input
//!
//! Each non-blank line holds one JSON object. A line holding a JSON
//! array is a batch: every element is a record of its own.

use std::collections::VecDeque;
use std::io::BufRead;

use crate::error::{Error, Result};
use crate::json::{JsonValue, parse_record};
use crate::projector::{ProjectedRow, RecordProjector};
use crate::table::ProjectionOptions;

/// Iterator over the records of a line-delimited JSON stream
///
/// With `ignore_malformed_json` a line that fails to parse yields an
/// empty object, which projects as a row of nulls and empty maps.
/// Otherwise it yields [`Error::MalformedJson`] and iteration may go on
/// with the next line.
pub struct RecordReader<R> {
    input: R,
    buf: String,
    line: usize,
    malformed: usize,
    pending: VecDeque<JsonValue>,
    ignore_malformed: bool,
    allow_duplicate_keys: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Read records from `input` using a table's options
    pub fn new(input: R, options: ProjectionOptions) -> Self {
        Self {
            input,
            buf: String::new(),
            line: 0,
            malformed: 0,
            pending: VecDeque::new(),
            ignore_malformed: options.ignore_malformed_json,
            allow_duplicate_keys: options.allow_duplicate_keys,
        }
    }

    /// Number of lines read so far
    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of malformed lines met so far
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<JsonValue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }

            self.buf.clear();
            match self.input.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => return Some(Err(e.into())),
            }

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            match parse_line(text, self.allow_duplicate_keys) {
                Ok(records) => self.pending.extend(records),
                Err(message) => {
                    self.malformed += 1;
                    if self.ignore_malformed {
                        tracing::warn!("Line {}: skipping malformed record: {}", self.line, message);
                        return Some(Ok(JsonValue::Object(Vec::new())));
                    }
                    return Some(Err(Error::MalformedJson {
                        line: self.line,
                        message,
                    }));
                }
            }
        }
    }
}

fn parse_line(text: &str, allow_duplicate_keys: bool) -> std::result::Result<Vec<JsonValue>, String> {
    match parse_record(text, allow_duplicate_keys).map_err(|e| e.to_string())? {
        record @ JsonValue::Object(_) => Ok(vec![record]),
        JsonValue::Array(items) => {
            if let Some(pos) = items.iter().position(|item| item.as_object().is_none()) {
                return Err(format!("batch element {pos} is not a JSON object"));
            }
            Ok(items)
        }
        other => Err(format!("expected a JSON object, found {}", other.kind())),
    }
}

/// Counters from one [`project_stream`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Rows handed to the sink
    pub rows: usize,
    /// Malformed lines read as empty records
    pub malformed: usize,
    /// Coercion warnings across all rows
    pub warnings: usize,
}

/// Project every record of `input` and hand each row to `sink`
///
/// Coercion warnings are logged with the row number and the key path.
/// The first malformed line stops the run unless the table ignores
/// malformed records.
pub fn project_stream<R, F>(projector: &RecordProjector, input: R, mut sink: F) -> Result<StreamStats>
where
    R: BufRead,
    F: FnMut(ProjectedRow) -> Result<()>,
{
    let mut reader = RecordReader::new(input, projector.table().options());
    let mut stats = StreamStats::default();

    while let Some(record) = reader.next() {
        let row = projector.project(&record?);
        stats.rows += 1;
        stats.warnings += row.warnings.len();
        for warning in &row.warnings {
            tracing::warn!("Row {} (line {}): {}", stats.rows, reader.line(), warning);
        }
        sink(row)?;
    }

    stats.malformed = reader.malformed();
    tracing::debug!(
        "Projected {} rows from {} lines into '{}'",
        stats.rows,
        reader.line(),
        projector.table().name()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, Schema};
    use crate::table::{CompiledTable, TableProperties};
    use crate::value::Value;
    use std::io::Cursor;
    use std::sync::Arc;

    fn read_all(text: &str, options: ProjectionOptions) -> Vec<Result<JsonValue>> {
        RecordReader::new(Cursor::new(text.to_string()), options).collect()
    }

    #[test]
    fn test_reads_lines_and_skips_blank_ones() {
        let records = read_all("{\"a\": 1}\n\n   \n{\"a\": 2}\n", ProjectionOptions::default());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(Result::is_ok));
    }

    #[test]
    fn test_array_line_is_a_batch() {
        let records = read_all("[{\"a\": 1}, {\"a\": 2}]\n{\"a\": 3}", ProjectionOptions::default());
        let values: Vec<JsonValue> = records.into_iter().map(Result::unwrap).collect();
        assert_eq!(values.len(), 3);
        assert_eq!(values[2].get("a"), Some(&JsonValue::Number(3.into())));
    }

    #[test]
    fn test_malformed_line_is_an_error_with_line_number() {
        let records = read_all("{\"a\": 1}\n{\"a\": \n{\"a\": 3}\n", ProjectionOptions::default());
        assert_eq!(records.len(), 3);
        assert!(matches!(records[1], Err(Error::MalformedJson { line: 2, .. })));
        assert!(records[2].is_ok());
    }

    #[test]
    fn test_malformed_line_ignored_when_asked() {
        let options = ProjectionOptions {
            ignore_malformed_json: true,
            ..ProjectionOptions::default()
        };
        let records = read_all("not json\n[1, 2]\n", options);
        let values: Vec<JsonValue> = records.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec![JsonValue::Object(Vec::new()), JsonValue::Object(Vec::new())]);
    }

    #[test]
    fn test_duplicate_keys_follow_option() {
        let line = "{\"a\": 1, \"a\": 2}";
        assert!(read_all(line, ProjectionOptions::default())[0].is_err());

        let options = ProjectionOptions {
            allow_duplicate_keys: true,
            ..ProjectionOptions::default()
        };
        let record = read_all(line, options).pop().unwrap().unwrap();
        assert_eq!(record.get("a"), Some(&JsonValue::Number(2.into())));
    }

    #[test]
    fn test_project_stream_counts_rows_and_warnings() {
        let schema = Schema::new(vec![
            ColumnSpec::new("a", "int").unwrap(),
            ColumnSpec::new("b", "array<int>").unwrap(),
        ])
        .unwrap();
        let props = TableProperties::new().with("ignore.malformed.json", "true");
        let projector =
            RecordProjector::new(Arc::new(CompiledTable::compile("t", schema, &props).unwrap()));

        let input = "{\"a\": 1, \"b\": [1]}\n{oops\n{\"a\": \"x\"}\n";
        let mut rows = Vec::new();
        let stats = project_stream(&projector, Cursor::new(input), |row| {
            rows.push(row);
            Ok(())
        })
        .unwrap();

        assert_eq!(
            stats,
            StreamStats {
                rows: 3,
                malformed: 1,
                warnings: 1
            }
        );
        assert!(rows[1].is_all_null());
        assert_eq!(rows[2].values[0], Value::Null);
    }

    #[test]
    fn test_project_stream_stops_at_malformed_line() {
        let schema = Schema::new(vec![ColumnSpec::new("a", "int").unwrap()]).unwrap();
        let projector = RecordProjector::new(Arc::new(
            CompiledTable::compile("t", schema, &TableProperties::new()).unwrap(),
        ));
        let err = project_stream(&projector, Cursor::new("{\"a\": 1}\n{"), |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::MalformedJson { line: 2, .. }));
    }
}
