use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::observability::log_debug;
use crate::schema::Schema;
use crate::value::{cast_value, Value};

const SEPARATOR: char = ',';

/// Rows of comma-separated text under a header line, not yet cast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBatch {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowBatch {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RowBatch { header, rows }
    }

    pub fn from_path(path: &Path) -> Result<RowBatch> {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        RowBatch::from_reader(BufReader::new(file)).map_err(|e| match e {
            StoreError::Io { source, .. } => StoreError::io(path, source),
            other => other,
        })
    }

    /// First line is the header; blank lines are skipped.
    pub fn from_reader(reader: impl BufRead) -> Result<RowBatch> {
        let mut lines = reader.lines();
        let header = loop {
            match lines.next() {
                None => {
                    return Err(StoreError::SchemaMismatch("no column headers".into()));
                }
                Some(line) => {
                    let line = line.map_err(|e| StoreError::io("<csv>", e))?;
                    let line = line.trim_end_matches('\r');
                    if !line.is_empty() {
                        break split_fields(line);
                    }
                }
            }
        };
        let mut rows = Vec::new();
        for line in lines {
            let line = line.map_err(|e| StoreError::io("<csv>", e))?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            rows.push(split_fields(line));
        }
        Ok(RowBatch { header, rows })
    }

    /// Cast every row into `schema` order.
    ///
    /// Rows shorter than the header are padded with nulls, longer rows are
    /// truncated to the header width. The header must name exactly the
    /// schema's columns, in any order.
    pub fn cast_rows(&self, schema: &Schema) -> Result<Vec<Vec<Option<Value>>>> {
        if !schema.matches_names(&self.header) {
            return Err(StoreError::SchemaMismatch(format!(
                "incoming columns [{}] differ from registered columns [{}]",
                self.header.join(","),
                schema
                    .columns()
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            )));
        }
        // header position of each schema column
        let positions: Vec<usize> = schema
            .columns()
            .iter()
            .filter_map(|c| self.header.iter().position(|h| *h == c.name))
            .collect();

        let mut out = Vec::with_capacity(self.rows.len());
        for (n, row) in self.rows.iter().enumerate() {
            if row.len() != self.header.len() {
                log_debug!(
                    component = "ingest",
                    event = "ragged_row",
                    row = n,
                    fields = row.len(),
                    expected = self.header.len(),
                );
            }
            let cells = schema
                .columns()
                .iter()
                .zip(&positions)
                .map(|(def, &pos)| cast_value(def, row.get(pos).map_or("", String::as_str)))
                .collect();
            out.push(cells);
        }
        Ok(out)
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(SEPARATOR).map(str::to_string).collect()
}
