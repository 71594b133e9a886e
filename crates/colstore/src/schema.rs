use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, StoreError};

pub const ID_COLUMN: &str = "id";
pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const STATION_COLUMN: &str = "Station";
pub const TEMPERATURE_COLUMN: &str = "Temperature";
pub const HUMIDITY_COLUMN: &str = "Humidity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Integer,
    Float,
    Timestamp,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Name used in the `.schema` file.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Timestamp => "timestamp",
        }
    }

    pub fn from_name(name: &str) -> Option<DataType> {
        match name {
            "string" => Some(DataType::String),
            "integer" => Some(DataType::Integer),
            "float" => Some(DataType::Float),
            "timestamp" => Some(DataType::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        ColumnDef {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered, name-unique column definitions. Column position in the schema is
/// the position used by every backend for its per-column storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(StoreError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Schema { columns })
    }

    /// `id, Timestamp, Station, Temperature, Humidity`: the weather-station
    /// readings the specialized backend is built for.
    pub fn weather() -> Self {
        Schema {
            columns: vec![
                ColumnDef::new(ID_COLUMN, DataType::Integer),
                ColumnDef::new(TIMESTAMP_COLUMN, DataType::Timestamp),
                ColumnDef::new(STATION_COLUMN, DataType::String),
                ColumnDef::new(TEMPERATURE_COLUMN, DataType::Float),
                ColumnDef::new(HUMIDITY_COLUMN, DataType::Float),
            ],
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&ColumnDef> {
        self.column(name)
            .ok_or_else(|| StoreError::UnknownColumn(name.to_string()))
    }

    /// True if `names` is exactly this schema's column set, in any order.
    pub fn matches_names<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let incoming: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        incoming.len() == names.len()
            && incoming.len() == self.columns.len()
            && self.columns.iter().all(|c| incoming.contains(c.name.as_str()))
    }
}
