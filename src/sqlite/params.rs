use rusqlite::types::Value;

use crate::binder::{ParamDirection, ParameterBinder, bind_values};
use crate::error::SqlFluentError;
use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// `SQLite` has no native decimal or temporal types; those are stored as text in
/// ISO-8601 form so they sort and compare correctly.
#[must_use]
pub fn row_value_to_sqlite_value(value: RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(i),
        RowValues::Float(f) => Value::Real(f),
        RowValues::Decimal(d) => Value::Text(d.to_string()),
        RowValues::Text(s) => Value::Text(s),
        RowValues::Bool(b) => Value::Integer(i64::from(b)),
        RowValues::Date(d) => Value::Text(d.format("%F").to_string()),
        RowValues::Time(t) => Value::Text(t.format("%T%.f").to_string()),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes),
    }
}

/// Positional `SQLite` parameters for one statement execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(pub Vec<Value>);

impl Params {
    /// Resolve every binder's send value, in position order.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::ParameterError` if a typed binder cannot be coerced.
    pub fn from_binders(binders: &[ParameterBinder]) -> Result<Self, SqlFluentError> {
        Ok(Params(
            bind_values(binders)?
                .into_iter()
                .map(row_value_to_sqlite_value)
                .collect(),
        ))
    }

    /// Drop trailing OUT-only positions the statement has no placeholder for.
    ///
    /// Lets a routine written as `INSERT ... RETURNING` declare its outputs after its
    /// inputs without binding them.
    pub fn trim_trailing_outputs(&mut self, binders: &[ParameterBinder], placeholders: usize) {
        let mut len = self.0.len();
        while len > placeholders
            && binders
                .get(len - 1)
                .is_some_and(|b| b.direction() == ParamDirection::Out)
        {
            len -= 1;
        }
        self.0.truncate(len);
    }

    /// Borrow the underlying values.
    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }
}
