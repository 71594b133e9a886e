use crate::aggregate::{Direction, Extremum};
use crate::error::{Result, StoreError};
use crate::ingest::RowBatch;
use crate::observability::{log_error, log_info, log_warn};
use crate::schema::{ColumnDef, Schema};
use crate::value::{IndexSet, Value};

/// Cell predicate used by [`Store::filter`]. Never called on null cells.
pub type Predicate<'a> = &'a dyn Fn(&Value) -> bool;

/// A column store backend.
///
/// Backends provide the physical primitives (`append_rows`, `scan`,
/// `value_at`, `row_count`); the query operations are provided on top of
/// them so that every backend shares the same filter and min/max semantics.
/// Query operations never fail: an error is logged and the operation returns
/// its empty result.
pub trait Store: Send + Sync {
    /// Backend identifier, also the directory name of disk backends.
    fn name(&self) -> &'static str;

    fn schema(&self) -> &Schema;

    fn row_count(&self) -> Result<usize>;

    /// Append rows given in schema order. Nothing is written if any value
    /// disagrees with its column type.
    fn append_rows(&mut self, rows: &[Vec<Option<Value>>]) -> Result<()>;

    /// Visit `(index, value)` for every non-null cell of `column`, either
    /// over the whole column or over `candidates` in their given order.
    fn scan(
        &self,
        column: &ColumnDef,
        candidates: Option<&[usize]>,
        visit: &mut dyn FnMut(usize, Value),
    ) -> Result<()>;

    fn value_at(&self, column: &ColumnDef, index: usize) -> Result<Option<Value>>;

    /// Cast and append every row of `batch`. The batch header must name
    /// exactly this store's columns; otherwise nothing is written.
    fn ingest(&mut self, batch: &RowBatch) -> Result<usize> {
        let rows = match batch.cast_rows(self.schema()) {
            Ok(rows) => rows,
            Err(e) => {
                log_warn!(component = "ingest", event = "ingest_rejected", store = self.name(), error = %e);
                return Err(e);
            }
        };
        self.append_rows(&rows)?;
        log_info!(
            component = "ingest",
            event = "rows_ingested",
            store = self.name(),
            rows = rows.len(),
        );
        Ok(rows.len())
    }

    fn filter(&self, column: &str, predicate: Predicate<'_>) -> IndexSet {
        let result = self.schema().require(column).and_then(|def| {
            let mut out = Vec::new();
            self.scan(def, None, &mut |i, v| {
                if predicate(&v) {
                    out.push(i);
                }
            })?;
            Ok(out)
        });
        degrade(self.name(), "filter", result)
    }

    /// [`filter`](Store::filter) restricted to `candidates`, keeping their
    /// order. Chaining calls over different columns is an AND.
    fn filter_in(&self, column: &str, predicate: Predicate<'_>, candidates: &[usize]) -> IndexSet {
        let result = self.schema().require(column).and_then(|def| {
            let mut out = Vec::new();
            self.scan(def, Some(candidates), &mut |i, v| {
                if predicate(&v) {
                    out.push(i);
                }
            })?;
            Ok(out)
        });
        degrade(self.name(), "filter_in", result)
    }

    fn get_max(&self, column: &str, candidates: &[usize]) -> IndexSet {
        let result = extremum(self, column, candidates, Direction::Max);
        degrade(self.name(), "get_max", result)
    }

    fn get_min(&self, column: &str, candidates: &[usize]) -> IndexSet {
        let result = extremum(self, column, candidates, Direction::Min);
        degrade(self.name(), "get_min", result)
    }

    fn get_value(&self, column: &str, index: usize) -> Option<Value> {
        let result = self
            .schema()
            .require(column)
            .and_then(|def| self.value_at(def, index));
        degrade(self.name(), "get_value", result)
    }

    /// The first `n` cells of every column, in schema order.
    fn head(&self, n: usize) -> Vec<(String, Vec<Option<Value>>)> {
        let rows = degrade(self.name(), "head", self.row_count()).min(n);
        self.schema()
            .columns()
            .iter()
            .map(|def| {
                let cells = (0..rows)
                    .map(|i| degrade(self.name(), "head", self.value_at(def, i)))
                    .collect();
                (def.name.clone(), cells)
            })
            .collect()
    }
}

fn extremum<S: Store + ?Sized>(
    store: &S,
    column: &str,
    candidates: &[usize],
    direction: Direction,
) -> Result<IndexSet> {
    let def = store.schema().require(column)?;
    if !def.data_type.is_numeric() {
        return Err(StoreError::NotNumeric {
            column: def.name.clone(),
            data_type: def.data_type,
        });
    }
    let mut acc = Extremum::new(direction);
    store.scan(def, Some(candidates), &mut |i, v| {
        if let Some(x) = v.as_f32() {
            acc.offer(i, x);
        }
    })?;
    Ok(acc.into_indices())
}

/// Operation boundary: log the error and fall back to the empty result.
pub(crate) fn degrade<T: Default>(store: &str, op: &'static str, result: Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            match e {
                StoreError::Io { .. }
                | StoreError::InvalidFile { .. }
                | StoreError::ShortRead { .. } => {
                    log_error!(component = "store", event = "storage_failure", store, op, error = %e);
                }
                _ => {
                    log_warn!(component = "store", event = "invalid_request", store, op, error = %e);
                }
            }
            T::default()
        }
    }
}
