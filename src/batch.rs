use std::sync::Arc;

use async_trait::async_trait;

use crate::binder::ParameterBinder;
use crate::error::SqlFluentError;
use crate::session::{ConnectionProvider, Session};
use crate::sql::{Sql, SqlExt};
use crate::statement::{BindParams, StatementKind, StatementSpec};

/// Batch opened from a [`PreparedSqlBuilder`](crate::builder::PreparedSqlBuilder).
pub type PreparedBatch = BatchGroup;

/// Batch opened from a [`CallableSqlBuilder`](crate::builder::CallableSqlBuilder) that
/// has no OUT or INOUT parameters.
pub type CallableBatch = BatchGroup;

/// Repeated IN-only parameter rows against one SQL text.
///
/// The binders present on the builder when the batch is opened form row 0 and fix the
/// template cardinality `C`. Every later row must carry exactly `C` binders. Arity is
/// checked on `add_batch` and again before dispatch, so a malformed batch never reaches
/// the database.
///
/// ```rust
/// use sql_fluent::prelude::*;
///
/// let batch = prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
///     .param("Inception")
///     .param("Nolan")
///     .add_batch()
///     .param("Tenet")
///     .param("Nolan")
///     .add_batch()
///     .unwrap()
///     .param("Dunkirk")
///     .param("Nolan");
/// assert_eq!(batch.cardinality(), 2);
/// assert_eq!(batch.pending_len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct BatchGroup {
    sql: Arc<str>,
    kind: StatementKind,
    template: Vec<ParameterBinder>,
    rows: Vec<Vec<ParameterBinder>>,
    pending: Vec<ParameterBinder>,
}

impl BatchGroup {
    pub(crate) fn from_template(spec: &StatementSpec) -> Self {
        Self {
            sql: spec.shared_sql(),
            kind: spec.kind(),
            template: spec.binders().to_vec(),
            rows: Vec::new(),
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Binders per row, fixed by the template row.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.template.len()
    }

    /// Completed rows, template included.
    #[must_use]
    pub fn row_count(&self) -> usize {
        1 + self.rows.len()
    }

    /// Binders appended since the last row boundary.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn check_pending(&self) -> Result<(), SqlFluentError> {
        if self.pending.len() == self.cardinality() {
            Ok(())
        } else {
            Err(SqlFluentError::BatchMismatch {
                expected: self.cardinality(),
                actual: self.pending.len(),
            })
        }
    }

    /// Close the pending row and start a new one.
    ///
    /// # Errors
    /// Returns `SqlFluentError::BatchMismatch` if the pending row does not have exactly
    /// the template's binder count.
    pub fn add_batch(mut self) -> Result<Self, SqlFluentError> {
        self.check_pending()?;
        let row = std::mem::take(&mut self.pending);
        self.rows.push(row);
        Ok(self)
    }

    /// Every row in submission order, template first, after validating the pending row.
    ///
    /// An empty pending row is ignored; a partial one is rejected.
    ///
    /// # Errors
    /// Returns `SqlFluentError::BatchMismatch` for a partial or oversized pending row.
    pub fn dispatch_rows(&self) -> Result<Vec<Vec<ParameterBinder>>, SqlFluentError> {
        if !self.pending.is_empty() {
            self.check_pending()?;
        }
        let mut rows = Vec::with_capacity(self.row_count() + 1);
        rows.push(self.template.clone());
        rows.extend(self.rows.iter().cloned());
        if !self.pending.is_empty() {
            rows.push(self.pending.clone());
        }
        Ok(rows)
    }

    /// Validate, then run every row as one batch on a connection from `provider`.
    ///
    /// Returns one affected-row count per row, in submission order.
    ///
    /// # Errors
    /// Returns `SqlFluentError::BatchMismatch` before any connection is acquired, or the
    /// execution layer's error.
    pub async fn execute_batch<P>(self, provider: &P) -> Result<Vec<u64>, SqlFluentError>
    where
        P: ConnectionProvider,
    {
        self.dispatch_rows()?;
        self.execute_with(provider).await
    }
}

impl BindParams for BatchGroup {
    fn push_binder(&mut self, binder: ParameterBinder) {
        self.pending.push(binder);
    }
}

#[async_trait]
impl Sql<Vec<u64>> for BatchGroup {
    async fn execute(&self, session: &mut dyn Session) -> Result<Vec<u64>, SqlFluentError> {
        let rows = self.dispatch_rows()?;
        tracing::debug!(
            rows = rows.len(),
            cardinality = self.cardinality(),
            kind = ?self.kind,
            "dispatching parameter batch"
        );
        session.execute_batch(&self.sql, &rows).await
    }
}

/// Several distinct parameterless statements sent as one batch.
#[derive(Debug, Clone)]
pub struct StatementBatch {
    statements: Vec<String>,
}

impl StatementBatch {
    pub(crate) fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            statements: vec![first.into(), second.into()],
        }
    }

    /// Queue another statement.
    #[must_use]
    pub fn add_batch(mut self, sql: impl Into<String>) -> Self {
        self.statements.push(sql.into());
        self
    }

    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Run every statement on a connection from `provider`; one count per statement.
    ///
    /// # Errors
    /// Returns the execution layer's error.
    pub async fn execute_batch<P>(self, provider: &P) -> Result<Vec<u64>, SqlFluentError>
    where
        P: ConnectionProvider,
    {
        self.execute_with(provider).await
    }
}

#[async_trait]
impl Sql<Vec<u64>> for StatementBatch {
    async fn execute(&self, session: &mut dyn Session) -> Result<Vec<u64>, SqlFluentError> {
        tracing::debug!(statements = self.statements.len(), "dispatching statement batch");
        session.execute_statement_batch(&self.statements).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::prepare_sql;
    use crate::types::RowValues;

    fn opened() -> BatchGroup {
        prepare_sql("INSERT INTO t(a, b) VALUES (?, ?)")
            .param(1)
            .param("one")
            .add_batch()
    }

    #[test]
    fn template_fixes_cardinality() {
        let batch = opened();
        assert_eq!(batch.cardinality(), 2);
        assert_eq!(batch.row_count(), 1);
        assert_eq!(batch.pending_len(), 0);
    }

    #[test]
    fn rows_keep_submission_order() {
        let batch = opened()
            .param(2)
            .param("two")
            .add_batch()
            .unwrap()
            .param(3)
            .param("three");
        let rows = batch.dispatch_rows().unwrap();
        assert_eq!(rows.len(), 3);
        let firsts: Vec<&RowValues> = rows.iter().map(|r| r[0].value()).collect();
        assert_eq!(
            firsts,
            vec![&RowValues::Int(1), &RowValues::Int(2), &RowValues::Int(3)]
        );
    }

    #[test]
    fn short_row_is_rejected_on_add() {
        let err = opened().param(2).add_batch().unwrap_err();
        match err {
            SqlFluentError::BatchMismatch { expected, actual } => {
                assert_eq!((expected, actual), (2, 1));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn long_row_is_rejected_before_dispatch() {
        let batch = opened().param(2).param("two").param("extra");
        let err = batch.dispatch_rows().unwrap_err();
        assert!(err.is_batch_mismatch());
        assert!(
            err.to_string()
                .contains("Parameters do not match with first set of parameters")
        );
    }

    #[test]
    fn empty_pending_row_is_not_dispatched() {
        let batch = opened().param(2).param("two").add_batch().unwrap();
        assert_eq!(batch.dispatch_rows().unwrap().len(), 2);
    }

    #[test]
    fn empty_row_on_add_is_rejected() {
        assert!(opened().add_batch().unwrap_err().is_batch_mismatch());
    }

    #[test]
    fn zero_cardinality_template_accepts_empty_rows() {
        let batch = prepare_sql("INSERT INTO t DEFAULT VALUES")
            .add_batch()
            .add_batch()
            .unwrap();
        assert_eq!(batch.cardinality(), 0);
        assert_eq!(batch.dispatch_rows().unwrap().len(), 2);
    }
}
