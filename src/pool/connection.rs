use async_trait::async_trait;

use crate::binder::ParameterBinder;
use crate::error::SqlFluentError;
use crate::results::{OutputRegister, ResultSet};
use crate::session::{Savepoint, Session};
use crate::statement::StatementSpec;
use crate::types::DatabaseType;

#[cfg(feature = "postgres")]
use crate::postgres::PostgresSession;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteSession;

use super::types::MiddlewarePool;

/// A connection checked out of a [`MiddlewarePool`], whichever backend it belongs to.
#[derive(Debug)]
pub enum MiddlewarePoolConnection {
    #[cfg(feature = "postgres")]
    Postgres(PostgresSession),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteSession),
}

impl MiddlewarePool {
    /// Get a connection from the pool
    ///
    /// # Errors
    /// Returns `SqlFluentError::PoolError` if the pool fails to provide a connection.
    pub async fn get_connection(
        pool: &MiddlewarePool,
        translate_placeholders: bool,
    ) -> Result<MiddlewarePoolConnection, SqlFluentError> {
        match pool {
            #[cfg(feature = "postgres")]
            MiddlewarePool::Postgres(pg_pool) => Ok(MiddlewarePoolConnection::Postgres(
                PostgresSession::from_pool(pg_pool, translate_placeholders).await?,
            )),
            #[cfg(feature = "sqlite")]
            MiddlewarePool::Sqlite(sqlite_pool) => {
                let _ = translate_placeholders;
                Ok(MiddlewarePoolConnection::Sqlite(
                    SqliteSession::from_pool(sqlite_pool).await?,
                ))
            }
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $session:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "postgres")]
            MiddlewarePoolConnection::Postgres($session) => $body,
            #[cfg(feature = "sqlite")]
            MiddlewarePoolConnection::Sqlite($session) => $body,
        }
    };
}

#[async_trait]
impl Session for MiddlewarePoolConnection {
    fn database_type(&self) -> DatabaseType {
        dispatch!(self, s => s.database_type())
    }

    async fn execute_update(&mut self, stmt: &StatementSpec) -> Result<u64, SqlFluentError> {
        dispatch!(self, s => s.execute_update(stmt).await)
    }

    async fn query(&mut self, stmt: &StatementSpec) -> Result<ResultSet, SqlFluentError> {
        dispatch!(self, s => s.query(stmt).await)
    }

    async fn query_exists(&mut self, stmt: &StatementSpec) -> Result<bool, SqlFluentError> {
        dispatch!(self, s => s.query_exists(stmt).await)
    }

    async fn execute_returning_keys(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<ResultSet, SqlFluentError> {
        dispatch!(self, s => s.execute_returning_keys(stmt).await)
    }

    async fn execute_call(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<OutputRegister, SqlFluentError> {
        dispatch!(self, s => s.execute_call(stmt).await)
    }

    async fn execute_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<ParameterBinder>],
    ) -> Result<Vec<u64>, SqlFluentError> {
        dispatch!(self, s => s.execute_batch(sql, rows).await)
    }

    async fn execute_statement_batch(
        &mut self,
        statements: &[String],
    ) -> Result<Vec<u64>, SqlFluentError> {
        dispatch!(self, s => s.execute_statement_batch(statements).await)
    }

    fn auto_commit(&self) -> bool {
        dispatch!(self, s => s.auto_commit())
    }

    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), SqlFluentError> {
        dispatch!(self, s => s.set_auto_commit(enabled).await)
    }

    async fn commit(&mut self) -> Result<(), SqlFluentError> {
        dispatch!(self, s => s.commit().await)
    }

    async fn rollback(&mut self) -> Result<(), SqlFluentError> {
        dispatch!(self, s => s.rollback().await)
    }

    async fn set_savepoint(&mut self, name: &str) -> Result<Savepoint, SqlFluentError> {
        dispatch!(self, s => s.set_savepoint(name).await)
    }

    async fn rollback_to_savepoint(
        &mut self,
        savepoint: &Savepoint,
    ) -> Result<(), SqlFluentError> {
        dispatch!(self, s => s.rollback_to_savepoint(savepoint).await)
    }

    async fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), SqlFluentError> {
        dispatch!(self, s => s.release_savepoint(savepoint).await)
    }
}
