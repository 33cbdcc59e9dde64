use crate::error::SqlFluentError;
use crate::types::{RowValues, SqlType};

/// Which way a positional parameter flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    /// Value is sent; nothing is read back.
    In,
    /// No value is sent; the position is registered as an output slot.
    Out,
    /// Value is sent and the same position is read back after the call.
    InOut,
}

/// One positional bind instruction.
///
/// The binder does not know its own position: position is the binder's index in the
/// owning statement plus one.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinder {
    direction: ParamDirection,
    value: RowValues,
    sql_type: Option<SqlType>,
    type_name: Option<String>,
}

impl ParameterBinder {
    /// IN binder carrying a plain value.
    #[must_use]
    pub fn input(value: impl Into<RowValues>) -> Self {
        Self {
            direction: ParamDirection::In,
            value: value.into(),
            sql_type: None,
            type_name: None,
        }
    }

    /// IN binder whose value is converted to `sql_type` before it is bound.
    #[must_use]
    pub fn typed_input(value: impl Into<RowValues>, sql_type: SqlType) -> Self {
        Self {
            direction: ParamDirection::In,
            value: value.into(),
            sql_type: Some(sql_type),
            type_name: None,
        }
    }

    /// Untyped NULL.
    #[must_use]
    pub fn null() -> Self {
        Self::input(RowValues::Null)
    }

    /// NULL carrying type metadata, for engines that cannot infer structured NULLs.
    ///
    /// The value is always sent as a plain NULL. `PostgreSQL` takes the parameter's type
    /// from the prepared statement and `SQLite` has no parameter types, so the type name
    /// is only reported in dispatch logs.
    #[must_use]
    pub fn typed_null(sql_type: SqlType, type_name: impl Into<String>) -> Self {
        Self {
            direction: ParamDirection::In,
            value: RowValues::Null,
            sql_type: Some(sql_type),
            type_name: Some(type_name.into()),
        }
    }

    /// Pure OUT registration.
    #[must_use]
    pub fn output(sql_type: SqlType) -> Self {
        Self {
            direction: ParamDirection::Out,
            value: RowValues::Null,
            sql_type: Some(sql_type),
            type_name: None,
        }
    }

    /// INOUT: `value` is sent and the position is read back as `sql_type`.
    #[must_use]
    pub fn in_out(sql_type: SqlType, value: impl Into<RowValues>) -> Self {
        Self {
            direction: ParamDirection::InOut,
            value: value.into(),
            sql_type: Some(sql_type),
            type_name: None,
        }
    }

    #[must_use]
    pub fn direction(&self) -> ParamDirection {
        self.direction
    }

    #[must_use]
    pub fn value(&self) -> &RowValues {
        &self.value
    }

    #[must_use]
    pub fn sql_type(&self) -> Option<SqlType> {
        self.sql_type
    }

    /// Engine type name recorded by [`ParameterBinder::typed_null`].
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// True for OUT and INOUT binders.
    #[must_use]
    pub fn is_output(&self) -> bool {
        matches!(self.direction, ParamDirection::Out | ParamDirection::InOut)
    }

    /// The value a backend should send for this position.
    ///
    /// OUT binders send NULL. IN and INOUT binders with a type tag are coerced to it.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ParameterError` if coercion to the tagged type fails.
    pub fn bind_value(&self) -> Result<RowValues, SqlFluentError> {
        match (self.direction, self.sql_type) {
            (ParamDirection::Out, _) => Ok(RowValues::Null),
            (ParamDirection::InOut, Some(ty)) => self.value.clone().coerce(ty),
            (ParamDirection::In, Some(ty)) if self.type_name.is_none() => {
                self.value.clone().coerce(ty)
            }
            _ => Ok(self.value.clone()),
        }
    }
}

/// 1-based positions of typed NULLs with their engine type names.
pub fn typed_null_hints(binders: &[ParameterBinder]) -> Vec<(usize, &str)> {
    binders
        .iter()
        .enumerate()
        .filter_map(|(idx, b)| b.type_name().map(|name| (idx + 1, name)))
        .collect()
}

/// Resolve the send values for a whole binder row, in position order.
///
/// # Errors
/// Returns the first coercion failure.
pub fn bind_values(binders: &[ParameterBinder]) -> Result<Vec<RowValues>, SqlFluentError> {
    binders.iter().map(ParameterBinder::bind_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_binder_sends_null() {
        let binder = ParameterBinder::output(SqlType::BigInt);
        assert!(binder.is_output());
        assert_eq!(binder.bind_value().unwrap(), RowValues::Null);
    }

    #[test]
    fn in_out_sends_coerced_value() {
        let binder = ParameterBinder::in_out(SqlType::BigInt, "7");
        assert_eq!(binder.direction(), ParamDirection::InOut);
        assert_eq!(binder.bind_value().unwrap(), RowValues::Int(7));
    }

    #[test]
    fn typed_null_keeps_metadata() {
        let binder = ParameterBinder::typed_null(SqlType::Array, "integer[]");
        assert_eq!(binder.type_name(), Some("integer[]"));
        assert_eq!(binder.sql_type(), Some(SqlType::Array));
        assert!(binder.bind_value().unwrap().is_null());
    }

    #[test]
    fn typed_null_hints_report_positions() {
        let binders = vec![
            ParameterBinder::input(1),
            ParameterBinder::typed_null(SqlType::Array, "text[]"),
            ParameterBinder::null(),
            ParameterBinder::typed_null(SqlType::Struct, "movie_rating"),
        ];
        assert_eq!(
            typed_null_hints(&binders),
            vec![(2, "text[]"), (4, "movie_rating")]
        );
        assert!(binders[1].bind_value().unwrap().is_null());
    }

    #[test]
    fn typed_input_coercion_error_surfaces_at_bind() {
        let binder = ParameterBinder::typed_input("not a date", SqlType::Date);
        assert!(binder.bind_value().is_err());
    }
}
