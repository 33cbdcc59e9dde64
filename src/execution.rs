use async_trait::async_trait;

use crate::error::SqlFluentError;
use crate::results::{CustomDbRow, OutputMapper, OutputRegister, RowMapper};
use crate::session::Session;
use crate::sql::Sql;
use crate::statement::StatementSpec;

/// Executes a statement and yields the affected row count.
pub struct Update {
    spec: StatementSpec,
}

impl Update {
    #[must_use]
    pub fn new(spec: StatementSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Sql<u64> for Update {
    async fn execute(&self, session: &mut dyn Session) -> Result<u64, SqlFluentError> {
        session.execute_update(&self.spec).await
    }
}

/// True iff the query produces a first row. Row content is never materialized.
pub struct Exists {
    spec: StatementSpec,
}

impl Exists {
    #[must_use]
    pub fn new(spec: StatementSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Sql<bool> for Exists {
    async fn execute(&self, session: &mut dyn Session) -> Result<bool, SqlFluentError> {
        session.query_exists(&self.spec).await
    }
}

/// Maps the first row, or yields `None` for an empty cursor.
pub struct QueryForOne<T> {
    spec: StatementSpec,
    mapper: RowMapper<T>,
}

impl<T> QueryForOne<T> {
    pub fn new<F>(spec: StatementSpec, mapper: F) -> Self
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        Self {
            spec,
            mapper: Box::new(mapper),
        }
    }
}

#[async_trait]
impl<T: Send> Sql<Option<T>> for QueryForOne<T> {
    async fn execute(&self, session: &mut dyn Session) -> Result<Option<T>, SqlFluentError> {
        let rows = session.query(&self.spec).await?;
        rows.first().map(|row| (self.mapper)(row)).transpose()
    }
}

/// Maps every row, preserving cursor order.
pub struct QueryForList<T> {
    spec: StatementSpec,
    mapper: RowMapper<T>,
}

impl<T> QueryForList<T> {
    pub fn new<F>(spec: StatementSpec, mapper: F) -> Self
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        Self {
            spec,
            mapper: Box::new(mapper),
        }
    }
}

#[async_trait]
impl<T: Send> Sql<Vec<T>> for QueryForList<T> {
    async fn execute(&self, session: &mut dyn Session) -> Result<Vec<T>, SqlFluentError> {
        let rows = session.query(&self.spec).await?;
        rows.results.iter().map(|row| (self.mapper)(row)).collect()
    }
}

/// Runs an insert/update and maps the first generated key row.
pub struct GeneratedKey<T> {
    spec: StatementSpec,
    mapper: RowMapper<T>,
}

impl<T> GeneratedKey<T> {
    pub fn new<F>(spec: StatementSpec, mapper: F) -> Self
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        Self {
            spec,
            mapper: Box::new(mapper),
        }
    }
}

#[async_trait]
impl<T: Send> Sql<Option<T>> for GeneratedKey<T> {
    async fn execute(&self, session: &mut dyn Session) -> Result<Option<T>, SqlFluentError> {
        let keys = session.execute_returning_keys(&self.spec).await?;
        keys.first().map(|row| (self.mapper)(row)).transpose()
    }
}

/// Runs an insert/update and maps every generated key row, in generation order.
pub struct GeneratedKeys<T> {
    spec: StatementSpec,
    mapper: RowMapper<T>,
}

impl<T> GeneratedKeys<T> {
    pub fn new<F>(spec: StatementSpec, mapper: F) -> Self
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        Self {
            spec,
            mapper: Box::new(mapper),
        }
    }
}

#[async_trait]
impl<T: Send> Sql<Vec<T>> for GeneratedKeys<T> {
    async fn execute(&self, session: &mut dyn Session) -> Result<Vec<T>, SqlFluentError> {
        let keys = session.execute_returning_keys(&self.spec).await?;
        keys.results.iter().map(|row| (self.mapper)(row)).collect()
    }
}

/// Invokes a callable statement; yields true iff the call produced a result row.
pub struct Call {
    spec: StatementSpec,
}

impl Call {
    #[must_use]
    pub fn new(spec: StatementSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Sql<bool> for Call {
    async fn execute(&self, session: &mut dyn Session) -> Result<bool, SqlFluentError> {
        let register = session.execute_call(&self.spec).await?;
        Ok(register.produced_rows())
    }
}

/// Invokes a callable statement and maps its output register.
pub struct OutParams<T> {
    spec: StatementSpec,
    mapper: OutputMapper<T>,
}

impl<T> OutParams<T> {
    pub fn new<F>(spec: StatementSpec, mapper: F) -> Self
    where
        F: Fn(&OutputRegister) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        Self {
            spec,
            mapper: Box::new(mapper),
        }
    }
}

#[async_trait]
impl<T: Send> Sql<T> for OutParams<T> {
    async fn execute(&self, session: &mut dyn Session) -> Result<T, SqlFluentError> {
        let register = session.execute_call(&self.spec).await?;
        (self.mapper)(&register)
    }
}
