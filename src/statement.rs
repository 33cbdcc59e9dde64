use std::sync::Arc;

use crate::binder::ParameterBinder;
use crate::types::{RowValues, SqlType};

/// How a statement is sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Fixed SQL text, no binders.
    Plain,
    /// Prepared statement with positional IN binders.
    Prepared,
    /// Stored-routine invocation; binders may be IN, OUT, or INOUT.
    Callable,
}

/// SQL text plus its ordered, append-only binder list.
///
/// The SQL is opaque: placeholder count and order are the caller's responsibility and
/// mismatches are reported by the backend when the statement runs.
#[derive(Debug, Clone)]
pub struct StatementSpec {
    sql: Arc<str>,
    kind: StatementKind,
    binders: Vec<ParameterBinder>,
}

impl StatementSpec {
    #[must_use]
    pub fn new(sql: impl Into<Arc<str>>, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            kind,
            binders: Vec::new(),
        }
    }

    pub(crate) fn with_binders(
        sql: Arc<str>,
        kind: StatementKind,
        binders: Vec<ParameterBinder>,
    ) -> Self {
        Self { sql, kind, binders }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn shared_sql(&self) -> Arc<str> {
        Arc::clone(&self.sql)
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    #[must_use]
    pub fn binders(&self) -> &[ParameterBinder] {
        &self.binders
    }

    /// Number of binders appended so far; the next append lands at `len() + 1`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.binders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    /// Binder at a 1-based position.
    #[must_use]
    pub fn binder_at(&self, position: usize) -> Option<&ParameterBinder> {
        position.checked_sub(1).and_then(|idx| self.binders.get(idx))
    }

    /// Append a binder and return its 1-based position.
    pub fn append(&mut self, binder: ParameterBinder) -> usize {
        self.binders.push(binder);
        self.binders.len()
    }

    pub(crate) fn has_outputs(&self) -> bool {
        self.binders.iter().any(ParameterBinder::is_output)
    }
}

/// Fluent IN-parameter appends shared by every surface that accepts values.
///
/// Each call binds at the next position, whatever the value's type.
pub trait BindParams: Sized {
    /// Append a binder at the next position.
    fn push_binder(&mut self, binder: ParameterBinder);

    /// Bind a value; the Rust type picks the representation.
    #[must_use]
    fn param(mut self, value: impl Into<RowValues>) -> Self {
        self.push_binder(ParameterBinder::input(value));
        self
    }

    /// Bind a value converted to an explicit target type.
    #[must_use]
    fn param_typed(mut self, value: impl Into<RowValues>, sql_type: SqlType) -> Self {
        self.push_binder(ParameterBinder::typed_input(value, sql_type));
        self
    }

    /// Bind a plain NULL.
    #[must_use]
    fn param_null(mut self) -> Self {
        self.push_binder(ParameterBinder::null());
        self
    }

    /// Bind a NULL that carries its SQL type and engine type name.
    #[must_use]
    fn param_typed_null(mut self, sql_type: SqlType, type_name: impl Into<String>) -> Self {
        self.push_binder(ParameterBinder::typed_null(sql_type, type_name));
        self
    }
}

impl BindParams for StatementSpec {
    fn push_binder(&mut self, binder: ParameterBinder) {
        self.append(binder);
    }
}
