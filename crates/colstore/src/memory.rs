use crate::error::{Result, StoreError};
use crate::schema::{ColumnDef, Schema};
use crate::store::Store;
use crate::value::Value;

/// Columns held as typed vectors in process memory.
pub struct MemoryStore {
    schema: Schema,
    columns: Vec<Vec<Option<Value>>>,
}

impl MemoryStore {
    pub fn new(schema: Schema) -> Self {
        let columns = vec![Vec::new(); schema.len()];
        MemoryStore { schema, columns }
    }

    fn column(&self, def: &ColumnDef) -> Result<&[Option<Value>]> {
        let pos = self
            .schema
            .position(&def.name)
            .ok_or_else(|| StoreError::UnknownColumn(def.name.clone()))?;
        Ok(&self.columns[pos])
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "main_memory"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.columns.first().map_or(0, Vec::len))
    }

    fn append_rows(&mut self, rows: &[Vec<Option<Value>>]) -> Result<()> {
        for row in rows {
            if row.len() != self.schema.len() {
                return Err(StoreError::SchemaMismatch(format!(
                    "row has {} cells, schema has {} columns",
                    row.len(),
                    self.schema.len()
                )));
            }
            for (def, cell) in self.schema.columns().iter().zip(row) {
                if cell.as_ref().is_some_and(|v| v.data_type() != def.data_type) {
                    return Err(StoreError::TypeMismatch {
                        column: def.name.clone(),
                        expected: def.data_type,
                    });
                }
            }
        }
        for row in rows {
            for (col, cell) in self.columns.iter_mut().zip(row) {
                col.push(cell.clone());
            }
        }
        Ok(())
    }

    fn scan(
        &self,
        column: &ColumnDef,
        candidates: Option<&[usize]>,
        visit: &mut dyn FnMut(usize, Value),
    ) -> Result<()> {
        let cells = self.column(column)?;
        match candidates {
            None => {
                for (i, cell) in cells.iter().enumerate() {
                    if let Some(v) = cell {
                        visit(i, v.clone());
                    }
                }
            }
            Some(candidates) => {
                for &i in candidates {
                    let cell = cells.get(i).ok_or_else(|| StoreError::IndexOutOfBounds {
                        column: column.name.clone(),
                        index: i,
                        len: cells.len(),
                    })?;
                    if let Some(v) = cell {
                        visit(i, v.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn value_at(&self, column: &ColumnDef, index: usize) -> Result<Option<Value>> {
        let cells = self.column(column)?;
        cells
            .get(index)
            .cloned()
            .ok_or_else(|| StoreError::IndexOutOfBounds {
                column: column.name.clone(),
                index,
                len: cells.len(),
            })
    }
}
