//! Helper utilities for testing and development.

use std::sync::Arc;

use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

/// Build a result set from column names and row values.
#[must_use]
pub fn result_set_of(column_names: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
    let names: Vec<String> = column_names.iter().map(|c| (*c).to_string()).collect();
    let mut set = ResultSet::with_capacity(rows.len());
    set.set_column_names(Arc::new(names));
    for row in rows {
        set.add_row_values(row);
    }
    set
}
