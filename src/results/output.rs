use std::collections::BTreeMap;

use crate::binder::ParameterBinder;
use crate::error::SqlFluentError;
use crate::types::RowValues;

use super::row::CustomDbRow;

/// Maps the post-call output register to a caller type.
pub type OutputMapper<T> =
    Box<dyn Fn(&OutputRegister) -> Result<T, SqlFluentError> + Send + Sync>;

/// Values read back from OUT and INOUT positions after a callable statement ran.
///
/// Keys are the same 1-based positions the binders were appended at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRegister {
    values: BTreeMap<usize, RowValues>,
    produced_rows: bool,
}

impl OutputRegister {
    /// Fill the register from the first row a call produced.
    ///
    /// Output positions take the row's columns in declaration order and are converted
    /// to their registered types.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` when output positions are registered but
    /// the call produced no row or too few columns, and `ParameterError` when a column
    /// cannot be converted to its registered type.
    pub fn from_call_result(
        binders: &[ParameterBinder],
        first_row: Option<&CustomDbRow>,
    ) -> Result<Self, SqlFluentError> {
        let outputs: Vec<(usize, &ParameterBinder)> = binders
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_output())
            .map(|(idx, b)| (idx + 1, b))
            .collect();

        let mut register = OutputRegister {
            values: BTreeMap::new(),
            produced_rows: first_row.is_some(),
        };
        if outputs.is_empty() {
            return Ok(register);
        }

        let row = first_row.ok_or_else(|| {
            SqlFluentError::ExecutionError(format!(
                "call produced no row for {} output parameter(s)",
                outputs.len()
            ))
        })?;
        if row.len() < outputs.len() {
            return Err(SqlFluentError::ExecutionError(format!(
                "call returned {} column(s) for {} output parameter(s)",
                row.len(),
                outputs.len()
            )));
        }

        for (column, (position, binder)) in outputs.into_iter().enumerate() {
            let raw = row.rows[column].clone();
            let value = match binder.sql_type() {
                Some(ty) => raw.coerce(ty)?,
                None => raw,
            };
            register.values.insert(position, value);
        }
        Ok(register)
    }

    /// True if the call produced at least one result row.
    #[must_use]
    pub fn produced_rows(&self) -> bool {
        self.produced_rows
    }

    /// Raw value at an output position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&RowValues> {
        self.values.get(&position)
    }

    /// Output positions in ascending order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.values.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, position: usize) -> Result<&RowValues, SqlFluentError> {
        self.values.get(&position).ok_or_else(|| {
            SqlFluentError::ExecutionError(format!(
                "no output parameter registered at position {position}"
            ))
        })
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` if the position is not an output or not an integer.
    pub fn get_i64(&self, position: usize) -> Result<i64, SqlFluentError> {
        let value = self.require(position)?;
        value.as_int().copied().ok_or_else(|| {
            SqlFluentError::ExecutionError(format!(
                "output parameter {position} is not an integer: {value:?}"
            ))
        })
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` if the position is not an output or not text.
    pub fn get_string(&self, position: usize) -> Result<String, SqlFluentError> {
        let value = self.require(position)?;
        value.as_text().map(str::to_owned).ok_or_else(|| {
            SqlFluentError::ExecutionError(format!(
                "output parameter {position} is not text: {value:?}"
            ))
        })
    }

    /// # Errors
    /// Returns `SqlFluentError::ExecutionError` if the position is not an output or not boolean-like.
    pub fn get_bool(&self, position: usize) -> Result<bool, SqlFluentError> {
        let value = self.require(position)?;
        value.as_bool().copied().ok_or_else(|| {
            SqlFluentError::ExecutionError(format!(
                "output parameter {position} is not a boolean: {value:?}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::SqlType;

    fn row(values: Vec<RowValues>) -> CustomDbRow {
        let names = (0..values.len()).map(|i| format!("c{i}")).collect();
        CustomDbRow::new(Arc::new(names), values)
    }

    #[test]
    fn outputs_fill_in_declaration_order() {
        let binders = vec![
            ParameterBinder::input("Inception"),
            ParameterBinder::output(SqlType::BigInt),
            ParameterBinder::input("Nolan"),
            ParameterBinder::in_out(SqlType::Varchar, "old"),
        ];
        let first = row(vec![RowValues::Int(9), RowValues::Text("new".into())]);
        let register = OutputRegister::from_call_result(&binders, Some(&first)).unwrap();

        assert_eq!(register.positions().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(register.get_i64(2).unwrap(), 9);
        assert_eq!(register.get_string(4).unwrap(), "new");
        assert!(register.get(1).is_none());
        assert!(register.get_i64(1).is_err());
    }

    #[test]
    fn outputs_are_converted_to_registered_type() {
        let binders = vec![ParameterBinder::output(SqlType::Integer)];
        let first = row(vec![RowValues::Text("12".into())]);
        let register = OutputRegister::from_call_result(&binders, Some(&first)).unwrap();
        assert_eq!(register.get_i64(1).unwrap(), 12);
    }

    #[test]
    fn missing_row_with_outputs_is_an_error() {
        let binders = vec![ParameterBinder::output(SqlType::Integer)];
        assert!(OutputRegister::from_call_result(&binders, None).is_err());
    }

    #[test]
    fn no_outputs_only_reports_rows() {
        let binders = vec![ParameterBinder::input(1)];
        let register = OutputRegister::from_call_result(&binders, None).unwrap();
        assert!(!register.produced_rows());
        assert!(register.is_empty());
    }
}
