use std::sync::Arc;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::SqlFluentError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlFluentError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlFluentError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a prepared statement and materialize every row it produces, in cursor order.
///
/// # Errors
/// Returns `SqlFluentError` if execution or value extraction fails.
pub fn build_result_set(stmt: &mut Statement, params: &[Value]) -> Result<ResultSet, SqlFluentError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut rows_iter = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    while let Some(row) = rows_iter.next()? {
        let row_values = (0..col_count)
            .map(|i| sqlite_extract_value_sync(row, i))
            .collect::<Result<Vec<_>, _>>()?;
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Run a statement and report whether it produced a first row, without reading it.
///
/// # Errors
/// Returns `SqlFluentError` if execution fails.
pub fn first_row_exists(stmt: &mut Statement, params: &[Value]) -> Result<bool, SqlFluentError> {
    let mut rows_iter = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    Ok(rows_iter.next()?.is_some())
}

/// Result set holding the contiguous rowid range an insert produced.
///
/// `SQLite` assigns rowids to a multi-row insert consecutively, so the range is
/// `last - changes + 1 ..= last` and is already in insertion order.
#[must_use]
pub fn rowid_key_set(last_rowid: i64, changes: u64) -> ResultSet {
    let count = i64::try_from(changes).unwrap_or(i64::MAX);
    let mut keys = ResultSet::with_capacity(usize::try_from(changes).unwrap_or(0));
    keys.set_column_names(Arc::new(vec!["last_insert_rowid()".to_string()]));
    if count > 0 {
        for id in (last_rowid - count + 1)..=last_rowid {
            keys.add_row_values(vec![RowValues::Int(id)]);
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rowid_range_is_in_insertion_order() {
        let keys = rowid_key_set(12, 3);
        let ids: Vec<i64> = keys.results.iter().map(|r| r.try_get_i64(0).unwrap()).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn no_changes_means_no_keys() {
        assert!(rowid_key_set(5, 0).is_empty());
    }

    #[test]
    fn extracts_rows_in_cursor_order() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT);
             INSERT INTO t VALUES (2, 'b'), (1, 'a'), (3, NULL);",
        )
        .unwrap();
        let mut stmt = conn.prepare("SELECT id, name FROM t ORDER BY id").unwrap();
        let rs = build_result_set(&mut stmt, &[]).unwrap();
        assert_eq!(rs.len(), 3);
        assert_eq!(rs.results[0].get("name"), Some(&RowValues::Text("a".into())));
        assert!(rs.results[2].get("name").unwrap().is_null());
    }
}
