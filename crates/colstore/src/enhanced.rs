//! Disk store specialised for weather-station readings.
//!
//! On top of the generic disk layout, the `Station` column is compressed to
//! one byte per row and `Timestamp` is stored as 8-byte epoch seconds at
//! UTC+8, so every column the analysis touches is fixed-width and randomly
//! addressable. [`ExtremeValues`] runs the twelve months concurrently.

use std::fs::File;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::thread;

use bytes::Buf;
use jiff::civil::DateTime;
use memmap2::Mmap;

use crate::aggregate::MinMax;
use crate::analysis::{first_per_day, Category, ExtremeValues, Output};
use crate::disk::{DiskStore, Layout};
use crate::error::{Result, StoreError};
use crate::format::{epoch_seconds, station_code, Encoding, NULL_EPOCH, NULL_STATION};
use crate::io::RecordReader;
use crate::observability::{log_debug, log_warn};
use crate::schema::{
    ColumnDef, DataType, Schema, HUMIDITY_COLUMN, STATION_COLUMN, TEMPERATURE_COLUMN,
    TIMESTAMP_COLUMN,
};
use crate::store::{degrade, Store};
use crate::value::{IndexSet, Value};

pub struct EnhancedDiskStore {
    disk: DiskStore,
}

impl EnhancedDiskStore {
    pub fn create(root: &Path, schema: Schema) -> Result<Self> {
        check_schema(&schema)?;
        let disk = DiskStore::create_with_layout(root, schema, Layout::Enhanced)?;
        Ok(EnhancedDiskStore { disk })
    }

    pub fn open(root: &Path) -> Result<Self> {
        let disk = DiskStore::open_with_layout(root, Layout::Enhanced)?;
        check_schema(disk.schema())?;
        Ok(EnhancedDiskStore { disk })
    }

    pub fn disk(&self) -> &DiskStore {
        &self.disk
    }

    /// Rows whose timestamp falls in `year`, from one pass over the
    /// memory-mapped Timestamp column.
    fn year_indices(&self, year: i16) -> Result<IndexSet> {
        let path = self.disk.column_file(TIMESTAMP_COLUMN);
        let bound = |dt: std::result::Result<DateTime, jiff::Error>| {
            dt.map_err(|e| format!("{e}"))
                .and_then(epoch_seconds)
                .map_err(|reason| StoreError::SchemaMismatch(format!("year {year}: {reason}")))
        };
        let start = bound(DateTime::new(year, 1, 1, 0, 0, 0, 0))?;
        let end = bound(DateTime::new(year, 12, 31, 23, 59, 59, 0))?;

        let file = File::open(&path).map_err(|e| StoreError::io(&path, e))?;
        let len = file.metadata().map_err(|e| StoreError::io(&path, e))?.len();
        if len == 0 {
            return Ok(Vec::new());
        }
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| StoreError::io(&path, e))?;
        let records = mmap.chunks_exact(8);
        if !records.remainder().is_empty() {
            return Err(StoreError::invalid(&path, "trailing partial timestamp record"));
        }
        Ok(records
            .enumerate()
            .filter_map(|(i, mut record)| {
                let secs = record.get_i64();
                (secs != NULL_EPOCH && (start..=end).contains(&secs)).then_some(i)
            })
            .collect())
    }

    /// Candidates whose station byte equals the code of `station`.
    fn station_indices(&self, station: &str, candidates: &[usize]) -> Result<IndexSet> {
        let code = station_code(station);
        if code == NULL_STATION {
            log_warn!(component = "enhanced", event = "unknown_station", station);
            return Ok(Vec::new());
        }
        let mut reader = RecordReader::open(&self.disk.column_file(STATION_COLUMN), 1)?;
        let mut out = Vec::new();
        for &i in candidates {
            if reader.read_at(i)?[0] == code {
                out.push(i);
            }
        }
        Ok(out)
    }

    fn month_indices(&self, month: i8, candidates: &[usize]) -> Result<IndexSet> {
        let def = self.disk.schema().require(TIMESTAMP_COLUMN)?;
        let mut out = Vec::new();
        self.disk.scan(def, Some(candidates), &mut |i, v| {
            if v.as_timestamp().is_some_and(|t| t.month() == month) {
                out.push(i);
            }
        })?;
        Ok(out)
    }

    /// Min and max of a measurement column in one pass over `indices`.
    fn shared_scan(&self, column: &str, indices: &[usize]) -> Result<MinMax> {
        let def = self.disk.schema().require(column)?;
        let mut acc = MinMax::new();
        self.disk.scan(def, Some(indices), &mut |i, v| {
            if let Some(x) = v.as_f32() {
                acc.offer(i, x);
            }
        })?;
        Ok(acc)
    }

    fn scan_month(&self, month: i8, qualified: &[usize], station: &str) -> Result<Vec<Output>> {
        let in_month = self.month_indices(month, qualified)?;
        if in_month.is_empty() {
            return Ok(Vec::new());
        }
        let MinMax { min: min_temp, max: max_temp } = self.shared_scan(TEMPERATURE_COLUMN, &in_month)?;
        let MinMax { min: min_hum, max: max_hum } = self.shared_scan(HUMIDITY_COLUMN, &in_month)?;

        let mut times = CellReader::open(&self.disk, TIMESTAMP_COLUMN)?;
        let mut temps = CellReader::open(&self.disk, TEMPERATURE_COLUMN)?;
        let mut hums = CellReader::open(&self.disk, HUMIDITY_COLUMN)?;

        let mut out = Vec::new();
        for (category, indices) in [
            (Category::MaxHumidity, max_hum.into_indices()),
            (Category::MinHumidity, min_hum.into_indices()),
            (Category::MaxTemp, max_temp.into_indices()),
            (Category::MinTemp, min_temp.into_indices()),
        ] {
            let values = match category.column() {
                HUMIDITY_COLUMN => &mut hums,
                _ => &mut temps,
            };
            out.extend(first_per_day(category, station, &indices, |i| {
                let timestamp = times.read(i)?.and_then(|v| v.as_timestamp());
                let value = values.read(i)?.and_then(|v| v.as_f32());
                Ok(timestamp.zip(value))
            })?);
        }
        log_debug!(
            component = "enhanced",
            event = "month_scanned",
            month,
            rows = in_month.len(),
            outputs = out.len(),
        );
        Ok(out)
    }
}

impl ExtremeValues for EnhancedDiskStore {
    /// One scoped worker per month; each appends its batch to the shared
    /// result under the mutex. Output order across months is unspecified.
    fn extreme_values(&self, year: i16, station: &str) -> Vec<Output> {
        let in_year = degrade(self.name(), "year_scan", self.year_indices(year));
        let qualified = degrade(self.name(), "station_scan", self.station_indices(station, &in_year));

        let results = Mutex::new(Vec::new());
        thread::scope(|s| {
            for month in 1..=12 {
                let qualified = &qualified;
                let results = &results;
                s.spawn(move || {
                    let batch = degrade(self.name(), "month_scan", self.scan_month(month, qualified, station));
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(batch);
                });
            }
        });
        results.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for EnhancedDiskStore {
    fn name(&self) -> &'static str {
        self.disk.name()
    }

    fn schema(&self) -> &Schema {
        self.disk.schema()
    }

    fn row_count(&self) -> Result<usize> {
        self.disk.row_count()
    }

    fn append_rows(&mut self, rows: &[Vec<Option<Value>>]) -> Result<()> {
        self.disk.append_rows(rows)
    }

    fn scan(
        &self,
        column: &ColumnDef,
        candidates: Option<&[usize]>,
        visit: &mut dyn FnMut(usize, Value),
    ) -> Result<()> {
        self.disk.scan(column, candidates, visit)
    }

    fn value_at(&self, column: &ColumnDef, index: usize) -> Result<Option<Value>> {
        self.disk.value_at(column, index)
    }
}

/// Per-unit handle on one fixed-width column.
struct CellReader {
    reader: RecordReader,
    encoding: Encoding,
}

impl CellReader {
    fn open(disk: &DiskStore, column: &str) -> Result<Self> {
        let def = disk.schema().require(column)?;
        let encoding = disk.encoding(def);
        let path = disk.column_file(column);
        let width = encoding
            .width()
            .ok_or_else(|| StoreError::invalid(&path, "expected a fixed-width column"))?;
        Ok(CellReader {
            reader: RecordReader::open(&path, width)?,
            encoding,
        })
    }

    fn read(&mut self, index: usize) -> Result<Option<Value>> {
        let decoded = self.encoding.decode_fixed(self.reader.read_at(index)?);
        decoded.map_err(|reason| StoreError::invalid(self.reader.path(), reason))
    }
}

fn check_schema(schema: &Schema) -> Result<()> {
    let expect = |name: &str, ok: fn(DataType) -> bool, wanted: &str| -> Result<()> {
        match schema.column(name) {
            Some(def) if ok(def.data_type) => Ok(()),
            Some(def) => Err(StoreError::SchemaMismatch(format!(
                "column {name} is {}, expected {wanted}",
                def.data_type
            ))),
            None => Err(StoreError::SchemaMismatch(format!("missing column {name}"))),
        }
    };
    expect(TIMESTAMP_COLUMN, |t| t == DataType::Timestamp, "timestamp")?;
    expect(STATION_COLUMN, |t| t == DataType::String, "string")?;
    expect(TEMPERATURE_COLUMN, DataType::is_numeric, "a number")?;
    expect(HUMIDITY_COLUMN, DataType::is_numeric, "a number")?;
    Ok(())
}
