use async_trait::async_trait;

use crate::binder::ParameterBinder;
use crate::error::SqlFluentError;
use crate::results::{OutputRegister, ResultSet};
use crate::statement::StatementSpec;
use crate::types::DatabaseType;

/// Named rollback marker inside an open transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Savepoint {
    name: String,
}

impl Savepoint {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name as a double-quoted SQL identifier.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.name.replace('"', "\"\""))
    }
}

/// The execution primitives of one live, exclusively owned connection.
///
/// Builders, batches, and transaction chains never talk to a driver directly; every
/// round trip goes through one of these calls. Errors are the backend's own, passed
/// through unchanged.
#[async_trait]
pub trait Session: Send {
    fn database_type(&self) -> DatabaseType;

    /// Run a statement and return the affected row count.
    async fn execute_update(&mut self, stmt: &StatementSpec) -> Result<u64, SqlFluentError>;

    /// Run a statement and materialize its rows in cursor order.
    async fn query(&mut self, stmt: &StatementSpec) -> Result<ResultSet, SqlFluentError>;

    /// Run a statement and report whether a first row is producible.
    async fn query_exists(&mut self, stmt: &StatementSpec) -> Result<bool, SqlFluentError>;

    /// Run a data-changing statement and return its generated keys in generation order.
    async fn execute_returning_keys(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<ResultSet, SqlFluentError>;

    /// Invoke a callable statement and read its output positions.
    async fn execute_call(&mut self, stmt: &StatementSpec)
    -> Result<OutputRegister, SqlFluentError>;

    /// Dispatch one SQL text against many IN-only binder rows; one count per row.
    async fn execute_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<ParameterBinder>],
    ) -> Result<Vec<u64>, SqlFluentError>;

    /// Dispatch several parameterless statements as one batch; one count per statement.
    async fn execute_statement_batch(
        &mut self,
        statements: &[String],
    ) -> Result<Vec<u64>, SqlFluentError>;

    fn auto_commit(&self) -> bool;

    /// Toggle per-statement commit. Turning it back on commits any open work.
    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), SqlFluentError>;

    async fn commit(&mut self) -> Result<(), SqlFluentError>;

    async fn rollback(&mut self) -> Result<(), SqlFluentError>;

    async fn set_savepoint(&mut self, name: &str) -> Result<Savepoint, SqlFluentError>;

    async fn rollback_to_savepoint(&mut self, savepoint: &Savepoint)
    -> Result<(), SqlFluentError>;

    async fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), SqlFluentError>;
}

/// Source of sessions; each call hands out a connection owned by the caller until dropped.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Connection: Session + 'static;

    async fn connection(&self) -> Result<Self::Connection, SqlFluentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savepoint_names_are_quoted() {
        assert_eq!(Savepoint::new("sp1").quoted(), "\"sp1\"");
        assert_eq!(Savepoint::new("a\"b").quoted(), "\"a\"\"b\"");
    }
}
