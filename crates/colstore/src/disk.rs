use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::format::{decode_text, Encoding};
use crate::io::{self, LineCursor, RecordReader};
use crate::observability::{log_debug, log_error, log_info};
use crate::schema::{ColumnDef, DataType, Schema, STATION_COLUMN};
use crate::store::Store;
use crate::value::Value;

/// Physical encoding policy of a disk store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Numbers as 4-byte records, everything else as text lines.
    Generic,
    /// Generic, plus 1-byte station codes and 8-byte epoch timestamps.
    Enhanced,
}

impl Layout {
    pub fn dir_name(self) -> &'static str {
        match self {
            Layout::Generic => "disk",
            Layout::Enhanced => "enhanced_disk",
        }
    }

    pub(crate) fn encoding(self, column: &ColumnDef) -> Encoding {
        match (self, column.data_type) {
            (_, DataType::Integer) => Encoding::Int32,
            (_, DataType::Float) => Encoding::Float32,
            (Layout::Enhanced, DataType::Timestamp) => Encoding::EpochSeconds,
            (Layout::Enhanced, DataType::String) if column.name == STATION_COLUMN => {
                Encoding::StationCode
            }
            _ => Encoding::Text,
        }
    }
}

/// One `<column>.store` file per column under `<root>/<layout dir>/`.
///
/// No file handle outlives an operation; every call opens what it reads.
pub struct DiskStore {
    dir: PathBuf,
    schema: Schema,
    layout: Layout,
}

impl DiskStore {
    /// Start an empty store, truncating any column files already there.
    pub fn create(root: &Path, schema: Schema) -> Result<Self> {
        DiskStore::create_with_layout(root, schema, Layout::Generic)
    }

    /// Reopen a store written by an earlier [`DiskStore::create`].
    pub fn open(root: &Path) -> Result<Self> {
        DiskStore::open_with_layout(root, Layout::Generic)
    }

    pub(crate) fn create_with_layout(root: &Path, schema: Schema, layout: Layout) -> Result<Self> {
        let dir = root.join(layout.dir_name());
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        io::write_schema_file(&dir, &schema)?;
        for col in schema.columns() {
            io::create_column_file(&io::column_path(&dir, &col.name))?;
        }
        log_info!(
            component = "disk",
            event = "store_created",
            dir = %dir.display(),
            columns = schema.len(),
        );
        Ok(DiskStore { dir, schema, layout })
    }

    pub(crate) fn open_with_layout(root: &Path, layout: Layout) -> Result<Self> {
        let dir = root.join(layout.dir_name());
        let schema = io::read_schema_file(&dir)?
            .ok_or_else(|| StoreError::invalid(dir.join(io::SCHEMA_FILE), "missing schema file"))?;
        for col in schema.columns() {
            let path = io::column_path(&dir, &col.name);
            if !path.exists() {
                return Err(StoreError::invalid(path, "missing column file"));
            }
        }
        Ok(DiskStore { dir, schema, layout })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn column_file(&self, column: &str) -> PathBuf {
        io::column_path(&self.dir, column)
    }

    pub(crate) fn encoding(&self, column: &ColumnDef) -> Encoding {
        self.layout.encoding(column)
    }

    fn check_column(&self, column: &ColumnDef) -> Result<()> {
        match self.schema.column(&column.name) {
            Some(def) if def == column => Ok(()),
            _ => Err(StoreError::UnknownColumn(column.name.clone())),
        }
    }
}

impl Store for DiskStore {
    fn name(&self) -> &'static str {
        self.layout.dir_name()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> Result<usize> {
        let Some(first) = self.schema.columns().first() else {
            return Ok(0);
        };
        let path = self.column_file(&first.name);
        match self.encoding(first).width() {
            Some(width) => {
                let len = io::file_len(&path)? as usize;
                if len % width != 0 {
                    return Err(StoreError::invalid(
                        &path,
                        format!("length {len} is not a multiple of record width {width}"),
                    ));
                }
                Ok(len / width)
            }
            None => io::count_lines(&path),
        }
    }

    fn append_rows(&mut self, rows: &[Vec<Option<Value>>]) -> Result<()> {
        let ncols = self.schema.len();
        if let Some(row) = rows.iter().find(|r| r.len() != ncols) {
            return Err(StoreError::SchemaMismatch(format!(
                "row has {} cells, schema has {ncols} columns",
                row.len()
            )));
        }

        // Encode everything first so a bad value leaves every file untouched.
        let mut buffers = Vec::with_capacity(ncols);
        for (ci, def) in self.schema.columns().iter().enumerate() {
            let encoding = self.encoding(def);
            let mut buf = Vec::with_capacity(rows.len() * encoding.width().unwrap_or(16));
            for row in rows {
                encoding.encode(def, row[ci].as_ref(), &mut buf)?;
            }
            buffers.push(buf);
        }

        let paths: Vec<PathBuf> = self.schema.columns().iter().map(|def| self.column_file(&def.name)).collect();
        let lengths = paths.iter().map(|p| io::file_len(p)).collect::<Result<Vec<_>>>()?;

        for (ci, (path, buf)) in paths.iter().zip(&buffers).enumerate() {
            if let Err(e) = io::append_records(path, buf) {
                log_error!(
                    component = "disk",
                    event = "append_failed",
                    column = %self.schema.columns()[ci].name,
                    error = %e,
                );
                // columns must keep equal row counts
                for (path, &len) in paths.iter().zip(&lengths).take(ci + 1) {
                    if let Err(undo) = io::truncate_file(path, len) {
                        log_error!(component = "disk", event = "rollback_failed", path = %path.display(), error = %undo);
                    }
                }
                return Err(e);
            }
        }
        log_debug!(component = "disk", event = "rows_appended", dir = %self.dir.display(), rows = rows.len());
        Ok(())
    }

    fn scan(
        &self,
        column: &ColumnDef,
        candidates: Option<&[usize]>,
        visit: &mut dyn FnMut(usize, Value),
    ) -> Result<()> {
        self.check_column(column)?;
        let path = self.column_file(&column.name);
        let encoding = self.encoding(column);

        match (encoding.width(), candidates) {
            (Some(width), None) => io::for_each_record(&path, width, |i, bytes| {
                if let Some(v) = encoding
                    .decode_fixed(bytes)
                    .map_err(|reason| StoreError::invalid(&path, reason))?
                {
                    visit(i, v);
                }
                Ok(())
            }),
            (Some(width), Some(candidates)) => {
                let mut reader = RecordReader::open(&path, width)?;
                for &i in candidates {
                    let bytes = reader.read_at(i)?;
                    if let Some(v) = encoding
                        .decode_fixed(bytes)
                        .map_err(|reason| StoreError::invalid(&path, reason))?
                    {
                        visit(i, v);
                    }
                }
                Ok(())
            }
            (None, None) => {
                for (i, line) in io::line_reader(&path)?.enumerate() {
                    let line = line.map_err(|e| StoreError::io(&path, e))?;
                    if let Some(v) = decode_text(column.data_type, &line)
                        .map_err(|reason| StoreError::invalid(&path, reason))?
                    {
                        visit(i, v);
                    }
                }
                Ok(())
            }
            (None, Some(candidates)) => {
                let mut cursor = LineCursor::open(&path)?;
                for &i in candidates {
                    let line = cursor.line_at(i)?.ok_or_else(|| StoreError::IndexOutOfBounds {
                        column: column.name.clone(),
                        index: i,
                        len: cursor.position(),
                    })?;
                    if let Some(v) = decode_text(column.data_type, &line)
                        .map_err(|reason| StoreError::invalid(&path, reason))?
                    {
                        visit(i, v);
                    }
                }
                Ok(())
            }
        }
    }

    fn value_at(&self, column: &ColumnDef, index: usize) -> Result<Option<Value>> {
        self.check_column(column)?;
        let path = self.column_file(&column.name);
        let encoding = self.encoding(column);
        match encoding.width() {
            Some(width) => {
                let mut reader = RecordReader::open(&path, width)?;
                encoding
                    .decode_fixed(reader.read_at(index)?)
                    .map_err(|reason| StoreError::invalid(&path, reason))
            }
            None => {
                let mut cursor = LineCursor::open(&path)?;
                let line = cursor.line_at(index)?.ok_or_else(|| StoreError::IndexOutOfBounds {
                    column: column.name.clone(),
                    index,
                    len: cursor.position(),
                })?;
                decode_text(column.data_type, &line).map_err(|reason| StoreError::invalid(&path, reason))
            }
        }
    }
}
