//! Monthly extreme temperature and humidity per station and year.

use std::collections::HashSet;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use jiff::civil::DateTime;

use crate::aggregate::Direction;
use crate::error::{Result, StoreError};
use crate::schema::{HUMIDITY_COLUMN, STATION_COLUMN, TEMPERATURE_COLUMN, TIMESTAMP_COLUMN};
use crate::store::Store;

pub const RESULT_HEADER: &str = "Date,Station,Category,Value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    MaxHumidity,
    MaxTemp,
    MinHumidity,
    MinTemp,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::MaxHumidity,
        Category::MinHumidity,
        Category::MaxTemp,
        Category::MinTemp,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::MaxHumidity => "Max Humidity",
            Category::MaxTemp => "Max Temperature",
            Category::MinHumidity => "Min Humidity",
            Category::MinTemp => "Min Temperature",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Category::MaxHumidity | Category::MinHumidity => HUMIDITY_COLUMN,
            Category::MaxTemp | Category::MinTemp => TEMPERATURE_COLUMN,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Category::MaxHumidity | Category::MaxTemp => Direction::Max,
            Category::MinHumidity | Category::MinTemp => Direction::Min,
        }
    }
}

/// One extreme reading: a line of the result file.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub timestamp: DateTime,
    pub station: String,
    pub category: Category,
    pub value: f32,
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{:?}",
            self.timestamp.strftime("%Y-%m-%d"),
            self.station,
            self.category.label(),
            self.value
        )
    }
}

/// Stores that can run the monthly extreme-value analysis themselves.
pub trait ExtremeValues {
    fn extreme_values(&self, year: i16, station: &str) -> Vec<Output>;
}

/// Resolve each index to an [`Output`], keeping only the first index per
/// day of month. Indices whose timestamp or value is null are skipped.
pub(crate) fn first_per_day(
    category: Category,
    station: &str,
    indices: &[usize],
    mut resolve: impl FnMut(usize) -> Result<Option<(DateTime, f32)>>,
) -> Result<Vec<Output>> {
    let mut days = HashSet::new();
    let mut out = Vec::new();
    for &i in indices {
        let Some((timestamp, value)) = resolve(i)? else {
            continue;
        };
        if days.insert(timestamp.day()) {
            out.push(Output {
                timestamp,
                station: station.to_string(),
                category,
                value,
            });
        }
    }
    Ok(out)
}

/// The analysis expressed only with [`Store`] queries, month by month on
/// the calling thread. Works on every backend.
pub fn extreme_values(store: &dyn Store, year: i16, station: &str) -> Vec<Output> {
    let in_year = store.filter(TIMESTAMP_COLUMN, &|v| {
        v.as_timestamp().is_some_and(|t| t.year() == year)
    });
    let qualified = store.filter_in(STATION_COLUMN, &|v| v.as_str() == Some(station), &in_year);

    let mut results = Vec::new();
    for month in 1..=12 {
        let in_month = store.filter_in(
            TIMESTAMP_COLUMN,
            &|v| v.as_timestamp().is_some_and(|t| t.month() == month),
            &qualified,
        );
        for category in Category::ALL {
            let column = category.column();
            let indices = match category.direction() {
                Direction::Max => store.get_max(column, &in_month),
                Direction::Min => store.get_min(column, &in_month),
            };
            let resolved = first_per_day(category, station, &indices, |i| {
                let timestamp = store
                    .get_value(TIMESTAMP_COLUMN, i)
                    .and_then(|v| v.as_timestamp());
                let value = store.get_value(column, i).and_then(|v| v.as_f32());
                Ok(timestamp.zip(value))
            });
            results.extend(resolved.unwrap_or_default());
        }
    }
    results
}

/// Append `outputs` to the result file, writing the header first if the
/// file is new.
pub fn append_outputs(path: &Path, outputs: &[Output]) -> Result<()> {
    let is_new = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    if is_new {
        writeln!(writer, "{RESULT_HEADER}").map_err(|e| StoreError::io(path, e))?;
    }
    for output in outputs {
        writeln!(writer, "{output}").map_err(|e| StoreError::io(path, e))?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
