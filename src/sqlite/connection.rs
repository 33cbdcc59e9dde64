use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bb8::Pool;

use crate::binder::{ParameterBinder, typed_null_hints};
use crate::error::SqlFluentError;
use crate::results::{OutputRegister, ResultSet};
use crate::session::{Savepoint, Session};
use crate::statement::StatementSpec;
use crate::types::DatabaseType;

use super::config::{SharedSqliteConnection, SqliteManager, SqlitePooledConnection};
use super::params::Params;
use super::query::{build_result_set, first_row_exists, rowid_key_set};

/// A pooled `SQLite` connection driven through the [`Session`] primitives.
///
/// Blocking rusqlite calls run on tokio's blocking pool. With auto-commit off the
/// session always has a transaction open: `BEGIN` is issued when auto-commit is turned
/// off and again after every commit or rollback.
pub struct SqliteSession {
    conn: SqlitePooledConnection,
    auto_commit: bool,
}

impl SqliteSession {
    pub(crate) fn new(conn: SqlitePooledConnection) -> Self {
        Self {
            conn,
            auto_commit: true,
        }
    }

    /// Check a connection out of `pool`.
    ///
    /// # Errors
    /// Returns `SqlFluentError::PoolError` if no connection can be acquired.
    pub async fn from_pool(pool: &Pool<SqliteManager>) -> Result<Self, SqlFluentError> {
        Ok(Self::new(pool.get_owned().await?))
    }

    pub(crate) fn conn_handle(&self) -> SharedSqliteConnection {
        Arc::clone(&*self.conn)
    }

    /// Run a closure against the raw rusqlite connection on the blocking pool.
    ///
    /// # Errors
    /// Returns the closure's error or a join error.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, SqlFluentError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlFluentError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(self.conn_handle(), func).await
    }

    async fn exec_control(&self, sql: String) -> Result<(), SqlFluentError> {
        tracing::debug!(sql = %sql, "sqlite control statement");
        self.with_connection(move |conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
    }

    fn prepare(stmt: &StatementSpec) -> Result<(String, Params), SqlFluentError> {
        tracing::debug!(
            kind = ?stmt.kind(),
            binders = stmt.len(),
            typed_nulls = ?typed_null_hints(stmt.binders()),
            "sqlite dispatch"
        );
        Ok((stmt.sql().to_owned(), Params::from_binders(stmt.binders())?))
    }
}

impl fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSession")
            .field("auto_commit", &self.auto_commit)
            .finish_non_exhaustive()
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.auto_commit {
            return;
        }
        // Best effort: never hand a connection with an open transaction back to the pool.
        if let Ok(guard) = self.conn.try_lock() {
            if let Err(err) = guard.execute_batch("ROLLBACK") {
                tracing::warn!(error = %err, "sqlite rollback on drop failed");
            }
        }
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlFluentError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlFluentError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlFluentError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

/// Run one statement per row and collect each row's change count.
fn run_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    rows: &[Params],
) -> Result<Vec<u64>, SqlFluentError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut counts = Vec::with_capacity(rows.len());
    for row in rows {
        let changed = stmt.execute(rusqlite::params_from_iter(row.as_values().iter()))?;
        counts.push(changed as u64);
    }
    Ok(counts)
}

fn run_statements(
    conn: &rusqlite::Connection,
    statements: &[String],
) -> Result<Vec<u64>, SqlFluentError> {
    statements
        .iter()
        .map(|sql| Ok(conn.execute(sql, [])? as u64))
        .collect()
}

/// Run `work` inside its own transaction when the session is in auto-commit mode.
fn atomically<R>(
    conn: &mut rusqlite::Connection,
    auto_commit: bool,
    work: impl FnOnce(&rusqlite::Connection) -> Result<R, SqlFluentError>,
) -> Result<R, SqlFluentError> {
    if auto_commit {
        let tx = conn.transaction()?;
        let out = work(&tx)?;
        tx.commit()?;
        Ok(out)
    } else {
        work(conn)
    }
}

#[async_trait]
impl Session for SqliteSession {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn execute_update(&mut self, stmt: &StatementSpec) -> Result<u64, SqlFluentError> {
        let (sql, params) = Self::prepare(stmt)?;
        self.with_connection(move |conn| {
            let mut prepared = conn.prepare(&sql)?;
            if prepared.column_count() == 0 {
                let changed = prepared.execute(rusqlite::params_from_iter(params.as_values()))?;
                Ok(changed as u64)
            } else {
                // `UPDATE ... RETURNING` yields one row per changed row.
                let rows = build_result_set(&mut prepared, params.as_values())?;
                Ok(rows.len() as u64)
            }
        })
        .await
    }

    async fn query(&mut self, stmt: &StatementSpec) -> Result<ResultSet, SqlFluentError> {
        let (sql, params) = Self::prepare(stmt)?;
        self.with_connection(move |conn| {
            let mut prepared = conn.prepare(&sql)?;
            build_result_set(&mut prepared, params.as_values())
        })
        .await
    }

    async fn query_exists(&mut self, stmt: &StatementSpec) -> Result<bool, SqlFluentError> {
        let (sql, params) = Self::prepare(stmt)?;
        self.with_connection(move |conn| {
            let mut prepared = conn.prepare(&sql)?;
            first_row_exists(&mut prepared, params.as_values())
        })
        .await
    }

    async fn execute_returning_keys(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<ResultSet, SqlFluentError> {
        let (sql, params) = Self::prepare(stmt)?;
        self.with_connection(move |conn| {
            let mut prepared = conn.prepare(&sql)?;
            if prepared.column_count() > 0 {
                return build_result_set(&mut prepared, params.as_values());
            }
            let changed = prepared.execute(rusqlite::params_from_iter(params.as_values()))?;
            drop(prepared);
            Ok(rowid_key_set(conn.last_insert_rowid(), changed as u64))
        })
        .await
    }

    async fn execute_call(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<OutputRegister, SqlFluentError> {
        let (sql, mut params) = Self::prepare(stmt)?;
        let binders: Vec<ParameterBinder> = stmt.binders().to_vec();
        let rows = self
            .with_connection(move |conn| {
                let mut prepared = conn.prepare(&sql)?;
                params.trim_trailing_outputs(&binders, prepared.parameter_count());
                build_result_set(&mut prepared, params.as_values())
            })
            .await?;
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
        let sql = sql.to_owned();
        let auto_commit = self.auto_commit;
        tracing::debug!(rows = params.len(), auto_commit, "sqlite batch");
        self.with_connection(move |conn| {
            atomically(conn, auto_commit, |c| run_rows(c, &sql, &params))
        })
        .await
    }

    async fn execute_statement_batch(
        &mut self,
        statements: &[String],
    ) -> Result<Vec<u64>, SqlFluentError> {
        let statements = statements.to_vec();
        let auto_commit = self.auto_commit;
        tracing::debug!(statements = statements.len(), auto_commit, "sqlite statement batch");
        self.with_connection(move |conn| {
            atomically(conn, auto_commit, |c| run_statements(c, &statements))
        })
        .await
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), SqlFluentError> {
        if enabled == self.auto_commit {
            return Ok(());
        }
        let sql = if enabled { "COMMIT" } else { "BEGIN" };
        self.exec_control(sql.to_string()).await?;
        self.auto_commit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlFluentError> {
        if self.auto_commit {
            return Err(SqlFluentError::ExecutionError(
                "commit requested while auto-commit is on".into(),
            ));
        }
        self.exec_control("COMMIT; BEGIN".to_string()).await
    }

    async fn rollback(&mut self) -> Result<(), SqlFluentError> {
        if self.auto_commit {
            return Err(SqlFluentError::ExecutionError(
                "rollback requested while auto-commit is on".into(),
            ));
        }
        self.exec_control("ROLLBACK; BEGIN".to_string()).await
    }

    async fn set_savepoint(&mut self, name: &str) -> Result<Savepoint, SqlFluentError> {
        let savepoint = Savepoint::new(name);
        self.exec_control(format!("SAVEPOINT {}", savepoint.quoted()))
            .await?;
        Ok(savepoint)
    }

    async fn rollback_to_savepoint(
        &mut self,
        savepoint: &Savepoint,
    ) -> Result<(), SqlFluentError> {
        self.exec_control(format!("ROLLBACK TO SAVEPOINT {}", savepoint.quoted()))
            .await
    }

    async fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), SqlFluentError> {
        self.exec_control(format!("RELEASE SAVEPOINT {}", savepoint.quoted()))
            .await
    }
}
