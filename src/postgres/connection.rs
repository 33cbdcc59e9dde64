use std::borrow::Cow;
use std::fmt;
use std::pin::pin;
use std::sync::LazyLock;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use futures_util::TryStreamExt;
use regex::Regex;
use tokio::runtime::Handle;
use tokio_postgres::Client;

use crate::binder::{ParameterBinder, typed_null_hints};
use crate::error::SqlFluentError;
use crate::results::{OutputRegister, ResultSet};
use crate::session::{Savepoint, Session};
use crate::statement::StatementSpec;
use crate::translation::translate_placeholders;
use crate::types::DatabaseType;

use super::config::PgManager;
use super::params::Params;
use super::query::build_result_set_from_statement;

static RETURNING_CLAUSE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\breturning\b").ok());

fn has_returning_clause(sql: &str) -> bool {
    RETURNING_CLAUSE
        .as_ref()
        .is_some_and(|re| re.is_match(sql))
}

/// A pooled `PostgreSQL` client driven through the [`Session`] primitives.
///
/// With auto-commit off the session always has a transaction open: `BEGIN` is issued
/// when auto-commit is turned off and again after every commit or rollback. Dropping
/// the session in that state rolls the transaction back before the client returns to
/// the pool.
pub struct PostgresSession {
    conn: Option<PooledConnection<'static, PgManager>>,
    auto_commit: bool,
    translate_placeholders: bool,
}

impl PostgresSession {
    pub(crate) fn new(conn: PooledConnection<'static, PgManager>, translate: bool) -> Self {
        Self {
            conn: Some(conn),
            auto_commit: true,
            translate_placeholders: translate,
        }
    }

    /// Check a client out of `pool`.
    ///
    /// # Errors
    /// Returns `SqlFluentError::PoolError` if no client can be acquired.
    pub async fn from_pool(
        pool: &Pool<PgManager>,
        translate_placeholders: bool,
    ) -> Result<Self, SqlFluentError> {
        Ok(Self::new(pool.get_owned().await?, translate_placeholders))
    }

    fn client(&self) -> Result<&Client, SqlFluentError> {
        self.conn.as_deref().ok_or_else(|| {
            SqlFluentError::ConnectionError("postgres connection already released".into())
        })
    }

    fn sql_for<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        translate_placeholders(sql, self.translate_placeholders)
    }

    fn prepare_params(stmt: &StatementSpec) -> Result<Params, SqlFluentError> {
        tracing::debug!(kind = ?stmt.kind(), binders = stmt.len(), "postgres dispatch");
        for (position, type_name) in typed_null_hints(stmt.binders()) {
            tracing::debug!(position, type_name, "typed NULL; type comes from the prepared statement");
        }
        Params::from_binders(stmt.binders())
    }

    async fn run_query(&self, sql: &str, params: &Params) -> Result<ResultSet, SqlFluentError> {
        let client = self.client()?;
        let prepared = client.prepare(sql).await?;
        let rows = client.query(&prepared, &params.as_refs()).await?;
        build_result_set_from_statement(&prepared, &rows)
    }

    async fn exec_control(&self, sql: &str) -> Result<(), SqlFluentError> {
        tracing::debug!(sql, "postgres control statement");
        self.client()?.batch_execute(sql).await?;
        Ok(())
    }

    /// Await `work` inside its own transaction when the session is in auto-commit mode.
    async fn atomically<R, F>(&self, work: F) -> Result<R, SqlFluentError>
    where
        F: Future<Output = Result<R, SqlFluentError>> + Send,
    {
        if !self.auto_commit {
            return work.await;
        }
        self.exec_control("BEGIN").await?;
        match work.await {
            Ok(value) => {
                self.exec_control("COMMIT").await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.exec_control("ROLLBACK").await {
                    tracing::error!(error = %rollback_err, "postgres batch rollback failed");
                }
                Err(err)
            }
        }
    }
}

async fn run_rows(
    client: &Client,
    sql: &str,
    rows: &[Params],
) -> Result<Vec<u64>, SqlFluentError> {
    let prepared = client.prepare(sql).await?;
    let mut counts = Vec::with_capacity(rows.len());
    for row in rows {
        counts.push(client.execute(&prepared, &row.as_refs()).await?);
    }
    Ok(counts)
}

async fn run_statements(client: &Client, statements: &[String]) -> Result<Vec<u64>, SqlFluentError> {
    let mut counts = Vec::with_capacity(statements.len());
    for sql in statements {
        counts.push(client.execute(sql.as_str(), &[]).await?);
    }
    Ok(counts)
}

impl fmt::Debug for PostgresSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSession")
            .field("auto_commit", &self.auto_commit)
            .field("translate_placeholders", &self.translate_placeholders)
            .finish_non_exhaustive()
    }
}

impl Drop for PostgresSession {
    fn drop(&mut self) {
        if self.auto_commit {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                if let Some(conn) = self.conn.take() {
                    handle.spawn(async move {
                        let _ = conn.simple_query("ROLLBACK").await;
                    });
                }
            }
            // Pool validation rolls the transaction back on the next checkout.
            Err(_) => tracing::warn!("postgres session dropped outside a runtime with a transaction open"),
        }
    }
}

#[async_trait]
impl Session for PostgresSession {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn execute_update(&mut self, stmt: &StatementSpec) -> Result<u64, SqlFluentError> {
        let params = Self::prepare_params(stmt)?;
        let sql = self.sql_for(stmt.sql());
        let client = self.client()?;
        let prepared = client.prepare(&sql).await?;
        if prepared.columns().is_empty() {
            Ok(client.execute(&prepared, &params.as_refs()).await?)
        } else {
            // `... RETURNING` yields one row per changed row.
            Ok(client.query(&prepared, &params.as_refs()).await?.len() as u64)
        }
    }

    async fn query(&mut self, stmt: &StatementSpec) -> Result<ResultSet, SqlFluentError> {
        let params = Self::prepare_params(stmt)?;
        let sql = self.sql_for(stmt.sql());
        self.run_query(&sql, &params).await
    }

    async fn query_exists(&mut self, stmt: &StatementSpec) -> Result<bool, SqlFluentError> {
        let params = Self::prepare_params(stmt)?;
        let sql = self.sql_for(stmt.sql());
        let client = self.client()?;
        let prepared = client.prepare(&sql).await?;
        let stream = client.query_raw(&prepared, params.as_refs()).await?;
        let mut stream = pin!(stream);
        Ok(stream.try_next().await?.is_some())
    }

    async fn execute_returning_keys(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<ResultSet, SqlFluentError> {
        let params = Self::prepare_params(stmt)?;
        let translated = self.sql_for(stmt.sql());
        let sql = if has_returning_clause(&translated) {
            translated.into_owned()
        } else {
            format!("{} RETURNING *", translated.trim_end().trim_end_matches(';'))
        };
        self.run_query(&sql, &params).await
    }

    async fn execute_call(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<OutputRegister, SqlFluentError> {
        let params = Self::prepare_params(stmt)?;
        let sql = self.sql_for(stmt.sql());
        let rows = self.run_query(&sql, &params).await?;
        OutputRegister::from_call_result(stmt.binders(), rows.first())
    }

    async fn execute_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<ParameterBinder>],
    ) -> Result<Vec<u64>, SqlFluentError> {
        let params = rows
            .iter()
            .map(|row| Params::from_binders(row))
            .collect::<Result<Vec<Params>, _>>()?;
        let sql = self.sql_for(sql);
        tracing::debug!(rows = params.len(), auto_commit = self.auto_commit, "postgres batch");
        let client = self.client()?;
        self.atomically(run_rows(client, &sql, &params)).await
    }

    async fn execute_statement_batch(
        &mut self,
        statements: &[String],
    ) -> Result<Vec<u64>, SqlFluentError> {
        tracing::debug!(
            statements = statements.len(),
            auto_commit = self.auto_commit,
            "postgres statement batch"
        );
        let client = self.client()?;
        self.atomically(run_statements(client, statements)).await
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), SqlFluentError> {
        if enabled == self.auto_commit {
            return Ok(());
        }
        self.exec_control(if enabled { "COMMIT" } else { "BEGIN" })
            .await?;
        self.auto_commit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlFluentError> {
        if self.auto_commit {
            return Err(SqlFluentError::ExecutionError(
                "commit requested while auto-commit is on".into(),
            ));
        }
        self.exec_control("COMMIT").await?;
        self.exec_control("BEGIN").await
    }

    async fn rollback(&mut self) -> Result<(), SqlFluentError> {
        if self.auto_commit {
            return Err(SqlFluentError::ExecutionError(
                "rollback requested while auto-commit is on".into(),
            ));
        }
        self.exec_control("ROLLBACK").await?;
        self.exec_control("BEGIN").await
    }

    async fn set_savepoint(&mut self, name: &str) -> Result<Savepoint, SqlFluentError> {
        let savepoint = Savepoint::new(name);
        self.exec_control(&format!("SAVEPOINT {}", savepoint.quoted()))
            .await?;
        Ok(savepoint)
    }

    async fn rollback_to_savepoint(
        &mut self,
        savepoint: &Savepoint,
    ) -> Result<(), SqlFluentError> {
        self.exec_control(&format!("ROLLBACK TO SAVEPOINT {}", savepoint.quoted()))
            .await
    }

    async fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), SqlFluentError> {
        self.exec_control(&format!("RELEASE SAVEPOINT {}", savepoint.quoted()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_returning_clause() {
        assert!(has_returning_clause("INSERT INTO t(a) VALUES ($1) RETURNING id"));
        assert!(has_returning_clause("insert into t(a) values ($1)\nreturning *"));
        assert!(!has_returning_clause("INSERT INTO returning_log(a) VALUES ($1)"));
    }
}
