use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::SqlFluentError;
use crate::types::RowValues;

/// Maps one row of a result set to a caller type.
pub type RowMapper<T> = Box<dyn Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync>;

/// A row from a database query result
///
/// Column names and the name→index cache are shared by every row of the same
/// result set.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl CustomDbRow {
    /// Create a new database row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            rows,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by 0-based column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    /// Number of columns in this row
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn require(&self, index: usize) -> Result<&RowValues, SqlFluentError> {
        self.rows.get(index).ok_or_else(|| {
            SqlFluentError::ExecutionError(format!(
                "column index {index} out of range for a row of {} columns",
                self.rows.len()
            ))
        })
    }

    /// Integer at `index`; NULL is an error.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not an integer.
    pub fn try_get_i64(&self, index: usize) -> Result<i64, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_int()
            .copied()
            .ok_or_else(|| mismatch(index, "an integer", value))
    }

    /// Text at `index`; NULL is an error.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not text.
    pub fn try_get_string(&self, index: usize) -> Result<String, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_text()
            .map(str::to_owned)
            .ok_or_else(|| mismatch(index, "text", value))
    }

    /// Text at `index`, `None` for NULL.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not text.
    pub fn try_get_opt_string(&self, index: usize) -> Result<Option<String>, SqlFluentError> {
        match self.require(index)? {
            RowValues::Null => Ok(None),
            _ => self.try_get_string(index).map(Some),
        }
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not a float.
    pub fn try_get_f64(&self, index: usize) -> Result<f64, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_float()
            .ok_or_else(|| mismatch(index, "a float", value))
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not boolean-like.
    pub fn try_get_bool(&self, index: usize) -> Result<bool, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_bool()
            .copied()
            .ok_or_else(|| mismatch(index, "a boolean", value))
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not numeric.
    pub fn try_get_decimal(&self, index: usize) -> Result<Decimal, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_decimal()
            .ok_or_else(|| mismatch(index, "a decimal", value))
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not a date.
    pub fn try_get_date(&self, index: usize) -> Result<NaiveDate, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_date()
            .ok_or_else(|| mismatch(index, "a date", value))
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not a time.
    pub fn try_get_time(&self, index: usize) -> Result<NaiveTime, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_time()
            .ok_or_else(|| mismatch(index, "a time", value))
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not a timestamp.
    pub fn try_get_timestamp(&self, index: usize) -> Result<NaiveDateTime, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_timestamp()
            .ok_or_else(|| mismatch(index, "a timestamp", value))
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when the column is missing or not binary.
    pub fn try_get_blob(&self, index: usize) -> Result<Vec<u8>, SqlFluentError> {
        let value = self.require(index)?;
        value
            .as_blob()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch(index, "binary data", value))
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

fn mismatch(index: usize, wanted: &str, found: &RowValues) -> SqlFluentError {
    SqlFluentError::ExecutionError(format!(
        "column {index} is not {wanted}: found {found:?}"
    ))
}
