//! Physical cell encodings shared by the disk backends.
//!
//! Fixed-width records are big-endian. Nulls are in-band sentinels:
//!
//! | encoding       | width | null           |
//! |----------------|-------|----------------|
//! | `Text`         | line  | `M`            |
//! | `Int32`        | 4     | `i32::MIN`     |
//! | `Float32`      | 4     | NaN            |
//! | `StationCode`  | 1     | ASCII `M`      |
//! | `EpochSeconds` | 8     | `0`            |

use bytes::{Buf, BufMut};
use jiff::civil::DateTime;
use jiff::tz::Offset;
use jiff::Timestamp;

use crate::error::{Result, StoreError};
use crate::schema::{ColumnDef, DataType};
use crate::value::{parse_timestamp, Value, NULL_TOKEN};

pub const NULL_I32: i32 = i32::MIN;
pub const NULL_F32: f32 = f32::NAN;
pub const NULL_EPOCH: i64 = 0;
pub const NULL_STATION: u8 = b'M';

pub const PAYA_LEBAR: &str = "Paya Lebar";
pub const CHANGI: &str = "Changi";
pub const PAYA_LEBAR_CODE: u8 = b'P';
pub const CHANGI_CODE: u8 = b'C';

/// Offset at which civil timestamps are converted to epoch seconds.
pub const WEATHER_OFFSET: Offset = Offset::constant(8);

/// Read buffer for whole-column scans.
pub const BUFFER_SIZE: usize = 10 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Text,
    Int32,
    Float32,
    StationCode,
    EpochSeconds,
}

impl Encoding {
    /// Record width in bytes, `None` for newline-delimited text.
    pub fn width(self) -> Option<usize> {
        match self {
            Encoding::Text => None,
            Encoding::Int32 | Encoding::Float32 => Some(4),
            Encoding::StationCode => Some(1),
            Encoding::EpochSeconds => Some(8),
        }
    }

    /// Append the physical form of `cell` to `out`.
    pub fn encode(self, column: &ColumnDef, cell: Option<&Value>, out: &mut Vec<u8>) -> Result<()> {
        if let Some(v) = cell {
            if v.data_type() != column.data_type {
                return Err(StoreError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.data_type,
                });
            }
        }
        match (self, cell) {
            (Encoding::Text, None) => {
                out.put_slice(NULL_TOKEN.as_bytes());
                out.put_u8(b'\n');
            }
            (Encoding::Text, Some(v)) => {
                out.put_slice(v.to_string().as_bytes());
                out.put_u8(b'\n');
            }
            (Encoding::Int32, None) => out.put_i32(NULL_I32),
            (Encoding::Int32, Some(Value::Int(v))) => out.put_i32(*v),
            (Encoding::Float32, None) => out.put_f32(NULL_F32),
            (Encoding::Float32, Some(Value::Float(v))) => out.put_f32(*v),
            (Encoding::StationCode, None) => out.put_u8(NULL_STATION),
            (Encoding::StationCode, Some(Value::Str(name))) => out.put_u8(station_code(name)),
            (Encoding::EpochSeconds, None) => out.put_i64(NULL_EPOCH),
            (Encoding::EpochSeconds, Some(Value::Timestamp(dt))) => {
                let secs = epoch_seconds(*dt).map_err(|reason| StoreError::Cast {
                    column: column.name.clone(),
                    value: dt.to_string(),
                    reason,
                })?;
                out.put_i64(secs);
            }
            _ => {
                return Err(StoreError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.data_type,
                });
            }
        }
        Ok(())
    }

    /// Decode one fixed-width record. `bytes` must be exactly `width()` long.
    pub fn decode_fixed(self, bytes: &[u8]) -> std::result::Result<Option<Value>, String> {
        if Some(bytes.len()) != self.width() {
            return Err(format!(
                "record of {} bytes for {:?} encoding",
                bytes.len(),
                self
            ));
        }
        let mut buf = bytes;
        let value = match self {
            Encoding::Int32 => {
                let v = buf.get_i32();
                (v != NULL_I32).then_some(Value::Int(v))
            }
            Encoding::Float32 => {
                let v = buf.get_f32();
                (!v.is_nan()).then_some(Value::Float(v))
            }
            Encoding::StationCode => station_name(buf.get_u8()).map(|s| Value::Str(s.to_string())),
            Encoding::EpochSeconds => {
                let secs = buf.get_i64();
                if secs == NULL_EPOCH {
                    None
                } else {
                    Some(Value::Timestamp(from_epoch_seconds(secs)?))
                }
            }
            Encoding::Text => unreachable!("text has no fixed width"),
        };
        Ok(value)
    }
}

/// Decode one line of a text column (without its trailing newline).
pub fn decode_text(data_type: DataType, line: &str) -> std::result::Result<Option<Value>, String> {
    if line == NULL_TOKEN {
        return Ok(None);
    }
    let value = match data_type {
        DataType::String => Value::Str(line.to_string()),
        DataType::Integer => Value::Int(line.parse().map_err(|e| format!("{line:?}: {e}"))?),
        DataType::Float => Value::Float(line.parse().map_err(|e| format!("{line:?}: {e}"))?),
        DataType::Timestamp => {
            Value::Timestamp(parse_timestamp(line).map_err(|e| format!("{line:?}: {e}"))?)
        }
    };
    Ok(Some(value))
}

/// One-byte code of a station name; unknown names map to the null code.
pub fn station_code(name: &str) -> u8 {
    match name {
        PAYA_LEBAR => PAYA_LEBAR_CODE,
        CHANGI => CHANGI_CODE,
        _ => NULL_STATION,
    }
}

pub fn station_name(code: u8) -> Option<&'static str> {
    match code {
        PAYA_LEBAR_CODE => Some(PAYA_LEBAR),
        CHANGI_CODE => Some(CHANGI),
        _ => None,
    }
}

pub fn epoch_seconds(dt: DateTime) -> std::result::Result<i64, String> {
    WEATHER_OFFSET
        .to_timestamp(dt)
        .map(|ts| ts.as_second())
        .map_err(|e| format!("{e}"))
}

pub fn from_epoch_seconds(secs: i64) -> std::result::Result<DateTime, String> {
    let ts = Timestamp::from_second(secs).map_err(|e| format!("epoch {secs}: {e}"))?;
    Ok(WEATHER_OFFSET.to_datetime(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::datetime;

    fn roundtrip(enc: Encoding, column: &ColumnDef, cell: Option<Value>) -> Option<Value> {
        let mut buf = Vec::new();
        enc.encode(column, cell.as_ref(), &mut buf).unwrap();
        match enc.width() {
            Some(w) => {
                assert_eq!(buf.len(), w);
                enc.decode_fixed(&buf).unwrap()
            }
            None => {
                assert_eq!(buf.last(), Some(&b'\n'));
                let line = std::str::from_utf8(&buf[..buf.len() - 1]).unwrap();
                decode_text(column.data_type, line).unwrap()
            }
        }
    }

    #[test]
    fn test_numeric_records() {
        let int_col = ColumnDef::new("id", DataType::Integer);
        let float_col = ColumnDef::new("t", DataType::Float);
        for v in [0, 1, -1, i32::MAX, i32::MIN + 1] {
            assert_eq!(roundtrip(Encoding::Int32, &int_col, Some(Value::Int(v))), Some(Value::Int(v)));
        }
        for v in [0.0_f32, -3.25, 30.5, f32::MAX, f32::INFINITY] {
            assert_eq!(
                roundtrip(Encoding::Float32, &float_col, Some(Value::Float(v))),
                Some(Value::Float(v))
            );
        }
        assert_eq!(roundtrip(Encoding::Int32, &int_col, None), None);
        assert_eq!(roundtrip(Encoding::Float32, &float_col, None), None);
    }

    #[test]
    fn test_big_endian_layout() {
        let col = ColumnDef::new("id", DataType::Integer);
        let mut buf = Vec::new();
        Encoding::Int32.encode(&col, Some(&Value::Int(1)), &mut buf).unwrap();
        Encoding::Int32.encode(&col, None, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 1, 0x80, 0, 0, 0]);
    }

    #[test]
    fn test_any_nan_is_null() {
        let quiet = f32::from_bits(0x7fc0_0001).to_be_bytes();
        assert_eq!(Encoding::Float32.decode_fixed(&quiet).unwrap(), None);
    }

    #[test]
    fn test_text_records() {
        let s = ColumnDef::new("Station", DataType::String);
        let t = ColumnDef::new("Timestamp", DataType::Timestamp);
        let dt = datetime(2019, 12, 31, 23, 30, 0, 0);
        assert_eq!(
            roundtrip(Encoding::Text, &s, Some(Value::Str("Changi".into()))),
            Some(Value::Str("Changi".into()))
        );
        assert_eq!(
            roundtrip(Encoding::Text, &t, Some(Value::Timestamp(dt))),
            Some(Value::Timestamp(dt))
        );
        assert_eq!(roundtrip(Encoding::Text, &s, None), None);
        assert_eq!(roundtrip(Encoding::Text, &t, None), None);
    }

    #[test]
    fn test_unpadded_text_timestamp_is_invalid() {
        assert!(decode_text(DataType::Timestamp, "2020-1-1 0:00").is_err());
        assert_eq!(
            decode_text(DataType::Timestamp, "2020-01-01 00:00"),
            Ok(Some(Value::Timestamp(datetime(2020, 1, 1, 0, 0, 0, 0))))
        );
    }

    #[test]
    fn test_station_codes() {
        let s = ColumnDef::new("Station", DataType::String);
        for name in [PAYA_LEBAR, CHANGI] {
            assert_eq!(
                roundtrip(Encoding::StationCode, &s, Some(Value::Str(name.into()))),
                Some(Value::Str(name.into()))
            );
        }
        assert_eq!(
            roundtrip(Encoding::StationCode, &s, Some(Value::Str("Tengah".into()))),
            None
        );
        assert_eq!(roundtrip(Encoding::StationCode, &s, None), None);
        assert_eq!(station_code(CHANGI), b'C');
    }

    #[test]
    fn test_epoch_seconds_at_utc_plus_8() {
        let t = ColumnDef::new("Timestamp", DataType::Timestamp);
        let dt = datetime(2020, 1, 1, 0, 0, 0, 0);
        assert_eq!(epoch_seconds(dt), Ok(1_577_808_000));

        let mut buf = Vec::new();
        Encoding::EpochSeconds
            .encode(&t, Some(&Value::Timestamp(dt)), &mut buf)
            .unwrap();
        assert_eq!(buf, 1_577_808_000_i64.to_be_bytes());
        assert_eq!(
            roundtrip(Encoding::EpochSeconds, &t, Some(Value::Timestamp(dt))),
            Some(Value::Timestamp(dt))
        );
        assert_eq!(roundtrip(Encoding::EpochSeconds, &t, None), None);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let col = ColumnDef::new("id", DataType::Integer);
        let mut buf = Vec::new();
        let err = Encoding::Int32
            .encode(&col, Some(&Value::Float(1.0)), &mut buf)
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
        assert!(buf.is_empty());
    }
}
