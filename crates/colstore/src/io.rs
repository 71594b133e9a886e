use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::format::BUFFER_SIZE;
use crate::schema::{ColumnDef, DataType, Schema};

pub const COLUMN_EXT: &str = "store";
pub const SCHEMA_FILE: &str = ".schema";

pub fn column_path(dir: &Path, column: &str) -> PathBuf {
    dir.join(format!("{column}.{COLUMN_EXT}"))
}

// --- File writing helpers ---

/// Create (or truncate) an empty column file.
pub fn create_column_file(path: &Path) -> Result<()> {
    File::create(path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

/// Append already-encoded records in one sequential write.
pub fn append_records(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(data).map_err(|e| StoreError::io(path, e))?;
    file.sync_data().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

// --- Fixed-width reads ---

/// Random access to the fixed-width records of one column file. Each reader
/// owns its handle, so concurrent scans never share a file position.
pub struct RecordReader {
    path: PathBuf,
    file: File,
    width: usize,
    buf: [u8; 8],
}

impl RecordReader {
    pub fn open(path: &Path, width: usize) -> Result<Self> {
        debug_assert!(width <= 8);
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        Ok(RecordReader {
            path: path.to_path_buf(),
            file,
            width,
            buf: [0; 8],
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of row `index`. Fewer than `width` bytes is a short read.
    pub fn read_at(&mut self, index: usize) -> Result<&[u8]> {
        let Some(offset) = index.checked_mul(self.width) else {
            return Err(self.out_of_bounds(index));
        };
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .map_err(|e| StoreError::io(&self.path, e))?;
        let width = self.width;
        let got = read_full(&mut self.file, &mut self.buf[..width])
            .map_err(|e| StoreError::io(&self.path, e))?;
        if got != width {
            return Err(StoreError::ShortRead {
                path: self.path.clone(),
                index,
                expected: width,
                got,
            });
        }
        Ok(&self.buf[..width])
    }

    fn out_of_bounds(&self, index: usize) -> StoreError {
        let len = self.file.metadata().map_or(0, |m| m.len() as usize / self.width);
        StoreError::IndexOutOfBounds {
            column: column_name(&self.path),
            index,
            len,
        }
    }
}

fn column_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Visit every fixed-width record of a column file in order, through a
/// `BUFFER_SIZE` buffered reader.
pub fn for_each_record(
    path: &Path,
    width: usize,
    mut visit: impl FnMut(usize, &[u8]) -> Result<()>,
) -> Result<()> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buf = [0u8; 8];
    let mut index = 0;
    loop {
        let got = read_full(&mut reader, &mut buf[..width]).map_err(|e| StoreError::io(path, e))?;
        if got == 0 {
            return Ok(());
        }
        if got != width {
            return Err(StoreError::ShortRead {
                path: path.to_path_buf(),
                index,
                expected: width,
                got,
            });
        }
        visit(index, &buf[..width])?;
        index += 1;
    }
}

fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// --- Text reads ---

pub fn line_reader(path: &Path) -> Result<std::io::Lines<BufReader<File>>> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    Ok(BufReader::with_capacity(BUFFER_SIZE, file).lines())
}

/// Forward-only walk over the lines of a text column file. Reaching a line
/// behind the cursor reopens the file and walks again from the start.
pub struct LineCursor {
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    next: usize,
}

impl LineCursor {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(LineCursor {
            path: path.to_path_buf(),
            lines: line_reader(path)?,
            next: 0,
        })
    }

    /// Line `index`, or `None` if the file has no such line.
    pub fn line_at(&mut self, index: usize) -> Result<Option<String>> {
        if index < self.next {
            self.lines = line_reader(&self.path)?;
            self.next = 0;
        }
        while self.next <= index {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            let line = line.map_err(|e| StoreError::io(&self.path, e))?;
            self.next += 1;
            if self.next > index {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    /// Lines consumed so far.
    pub fn position(&self) -> usize {
        self.next
    }
}

pub fn count_lines(path: &Path) -> Result<usize> {
    let mut n = 0;
    for line in line_reader(path)? {
        line.map_err(|e| StoreError::io(path, e))?;
        n += 1;
    }
    Ok(n)
}

pub fn file_len(path: &Path) -> Result<u64> {
    let meta = fs::metadata(path).map_err(|e| StoreError::io(path, e))?;
    Ok(meta.len())
}

/// Cut a column file back to `len` bytes, dropping a partial append.
pub fn truncate_file(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.set_len(len).map_err(|e| StoreError::io(path, e))?;
    file.sync_data().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

// --- Schema file ---

pub fn write_schema_file(dir: &Path, schema: &Schema) -> Result<()> {
    let path = dir.join(SCHEMA_FILE);
    let mut content = String::new();
    for col in schema.columns() {
        content.push_str(&format!("{}:{}\n", col.name, col.data_type));
    }
    fs::write(&path, content).map_err(|e| StoreError::io(&path, e))?;
    Ok(())
}

pub fn read_schema_file(dir: &Path) -> Result<Option<Schema>> {
    let path = dir.join(SCHEMA_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
    let mut columns = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, type_str) = line
            .rsplit_once(':')
            .ok_or_else(|| StoreError::invalid(&path, format!("bad schema line: {line}")))?;
        let data_type = DataType::from_name(type_str)
            .ok_or_else(|| StoreError::invalid(&path, format!("unknown type: {type_str}")))?;
        columns.push(ColumnDef::new(name, data_type));
    }
    Ok(Some(Schema::new(columns)?))
}
