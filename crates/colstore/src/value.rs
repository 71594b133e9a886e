use std::fmt;

use jiff::civil::DateTime;

use crate::error::{Result, StoreError};
use crate::observability::{log_debug, log_warn};
use crate::schema::{ColumnDef, DataType};

/// Text token meaning "no value", both in CSV input and in text column files.
pub const NULL_TOKEN: &str = "M";

/// `yyyy-MM-dd HH:mm`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Ordered row positions. Filters narrow it, aggregates reduce it.
pub type IndexSet = Vec<usize>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i32),
    Float(f32),
    Timestamp(DateTime),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Str(_) => DataType::String,
            Value::Int(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Numeric view used by min/max. Integers are widened to `f32`, so
    /// magnitudes above 2^24 may compare equal.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::Int(v) => Some(v as f32),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime> {
        match *self {
            Value::Timestamp(dt) => Some(dt),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Timestamp(dt) => write!(f, "{}", dt.strftime(TIMESTAMP_FORMAT)),
        }
    }
}

/// Parse one field of ingestion text as `data_type`.
///
/// `""` and `M` are null. Numbers equal to the on-disk null sentinel
/// (`i32::MIN`, NaN) are also null, so every backend sees the same cell.
pub fn parse_value(column: &ColumnDef, raw: &str) -> Result<Option<Value>> {
    if raw.is_empty() || raw == NULL_TOKEN {
        return Ok(None);
    }
    let cast_err = |reason: String| StoreError::Cast {
        column: column.name.clone(),
        value: raw.to_string(),
        reason,
    };
    let value = match column.data_type {
        DataType::String => Value::Str(raw.to_string()),
        DataType::Integer => {
            let v: i32 = raw.parse().map_err(|e| cast_err(format!("{e}")))?;
            if v == i32::MIN {
                log_debug!(
                    component = "cast",
                    event = "sentinel_value",
                    column = %column.name,
                    "integer equals the null sentinel"
                );
                return Ok(None);
            }
            Value::Int(v)
        }
        DataType::Float => {
            let v: f32 = raw.parse().map_err(|e| cast_err(format!("{e}")))?;
            if v.is_nan() {
                return Ok(None);
            }
            Value::Float(v)
        }
        DataType::Timestamp => Value::Timestamp(parse_timestamp(raw).map_err(cast_err)?),
    };
    Ok(Some(value))
}

/// Parse `yyyy-MM-dd HH:mm` with every field at full width. `strptime`
/// alone also takes unpadded fields such as `2020-1-1 0:00`.
pub(crate) fn parse_timestamp(raw: &str) -> std::result::Result<DateTime, String> {
    let dt = DateTime::strptime(TIMESTAMP_FORMAT, raw)
        .map_err(|e| format!("expected format {TIMESTAMP_FORMAT}: {e}"))?;
    if dt.strftime(TIMESTAMP_FORMAT).to_string() != raw {
        return Err(format!("expected format {TIMESTAMP_FORMAT}: fields not zero-padded"));
    }
    Ok(dt)
}

/// Like [`parse_value`], but a cast failure is logged and stored as null.
pub fn cast_value(column: &ColumnDef, raw: &str) -> Option<Value> {
    match parse_value(column, raw) {
        Ok(v) => v,
        Err(e) => {
            log_warn!(component = "cast", event = "cast_failed", error = %e);
            None
        }
    }
}
