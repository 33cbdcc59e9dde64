use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::binder::ParameterBinder;
use crate::error::SqlFluentError;
use crate::results::{OutputRegister, ResultSet};
use crate::session::{ConnectionProvider, Savepoint, Session};
use crate::statement::StatementSpec;
use crate::types::DatabaseType;

/// One primitive call observed by a [`RecordingSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Update(String),
    Query(String),
    Exists(String),
    ReturningKeys(String),
    Call(String),
    Batch { sql: String, rows: usize },
    StatementBatch(Vec<String>),
    SetAutoCommit(bool),
    Commit,
    Rollback,
    SetSavepoint(String),
    RollbackToSavepoint(String),
    ReleaseSavepoint(String),
}

impl RecordedCall {
    /// True for calls that would send a statement to the database.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::Update(_)
                | Self::Query(_)
                | Self::Exists(_)
                | Self::ReturningKeys(_)
                | Self::Call(_)
                | Self::Batch { .. }
                | Self::StatementBatch(_)
        )
    }
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<RecordedCall>,
    failing: Vec<String>,
    results: HashMap<String, ResultSet>,
    rows_affected: u64,
}

/// In-memory [`Session`] that records every primitive call and answers from a script.
///
/// Clones share the same log and script, so the session doubles as its own
/// [`ConnectionProvider`].
#[derive(Debug, Clone)]
pub struct RecordingSession {
    script: Arc<Mutex<Script>>,
    auto_commit: bool,
    database_type: DatabaseType,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                rows_affected: 1,
                ..Script::default()
            })),
            auto_commit: true,
            #[cfg(feature = "sqlite")]
            database_type: DatabaseType::Sqlite,
            #[cfg(all(not(feature = "sqlite"), feature = "postgres"))]
            database_type: DatabaseType::Postgres,
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make every statement whose SQL equals `sql` fail.
    #[must_use]
    pub fn failing_on(self, sql: impl Into<String>) -> Self {
        self.script().failing.push(sql.into());
        self
    }

    /// Answer queries, key retrievals, and calls for `sql` with `rows`.
    #[must_use]
    pub fn with_result(self, sql: impl Into<String>, rows: ResultSet) -> Self {
        self.script().results.insert(sql.into(), rows);
        self
    }

    /// Affected-row count reported by every update and batch row.
    #[must_use]
    pub fn with_rows_affected(self, count: u64) -> Self {
        self.script().rows_affected = count;
        self
    }

    /// Every call seen so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script().calls.clone()
    }

    /// Number of statements that would have reached the database.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.script().calls.iter().filter(|c| c.is_statement()).count()
    }

    fn record(&self, call: RecordedCall) {
        self.script().calls.push(call);
    }

    fn run(&self, call: RecordedCall, sql: &str) -> Result<(), SqlFluentError> {
        let mut script = self.script();
        script.calls.push(call);
        if script.failing.iter().any(|f| f == sql) {
            return Err(SqlFluentError::ExecutionError(format!("scripted failure: {sql}")));
        }
        Ok(())
    }

    fn result_for(&self, sql: &str) -> ResultSet {
        self.script()
            .results
            .get(sql)
            .cloned()
            .unwrap_or_else(|| ResultSet::with_capacity(0))
    }

    fn rows_affected(&self) -> u64 {
        self.script().rows_affected
    }
}

#[async_trait]
impl Session for RecordingSession {
    fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    async fn execute_update(&mut self, stmt: &StatementSpec) -> Result<u64, SqlFluentError> {
        self.run(RecordedCall::Update(stmt.sql().to_owned()), stmt.sql())?;
        Ok(self.rows_affected())
    }

    async fn query(&mut self, stmt: &StatementSpec) -> Result<ResultSet, SqlFluentError> {
        self.run(RecordedCall::Query(stmt.sql().to_owned()), stmt.sql())?;
        Ok(self.result_for(stmt.sql()))
    }

    async fn query_exists(&mut self, stmt: &StatementSpec) -> Result<bool, SqlFluentError> {
        self.run(RecordedCall::Exists(stmt.sql().to_owned()), stmt.sql())?;
        Ok(!self.result_for(stmt.sql()).is_empty())
    }

    async fn execute_returning_keys(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<ResultSet, SqlFluentError> {
        self.run(RecordedCall::ReturningKeys(stmt.sql().to_owned()), stmt.sql())?;
        Ok(self.result_for(stmt.sql()))
    }

    async fn execute_call(
        &mut self,
        stmt: &StatementSpec,
    ) -> Result<OutputRegister, SqlFluentError> {
        self.run(RecordedCall::Call(stmt.sql().to_owned()), stmt.sql())?;
        let rows = self.result_for(stmt.sql());
        OutputRegister::from_call_result(stmt.binders(), rows.first())
    }

    async fn execute_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<ParameterBinder>],
    ) -> Result<Vec<u64>, SqlFluentError> {
        self.run(
            RecordedCall::Batch {
                sql: sql.to_owned(),
                rows: rows.len(),
            },
            sql,
        )?;
        Ok(vec![self.rows_affected(); rows.len()])
    }

    async fn execute_statement_batch(
        &mut self,
        statements: &[String],
    ) -> Result<Vec<u64>, SqlFluentError> {
        let mut script = self.script();
        script
            .calls
            .push(RecordedCall::StatementBatch(statements.to_vec()));
        if let Some(bad) = statements.iter().find(|s| script.failing.contains(s)) {
            return Err(SqlFluentError::ExecutionError(format!("scripted failure: {bad}")));
        }
        Ok(vec![script.rows_affected; statements.len()])
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), SqlFluentError> {
        self.record(RecordedCall::SetAutoCommit(enabled));
        self.auto_commit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlFluentError> {
        self.record(RecordedCall::Commit);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlFluentError> {
        self.record(RecordedCall::Rollback);
        Ok(())
    }

    async fn set_savepoint(&mut self, name: &str) -> Result<Savepoint, SqlFluentError> {
        self.record(RecordedCall::SetSavepoint(name.to_owned()));
        Ok(Savepoint::new(name))
    }

    async fn rollback_to_savepoint(
        &mut self,
        savepoint: &Savepoint,
    ) -> Result<(), SqlFluentError> {
        self.record(RecordedCall::RollbackToSavepoint(savepoint.name().to_owned()));
        Ok(())
    }

    async fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), SqlFluentError> {
        self.record(RecordedCall::ReleaseSavepoint(savepoint.name().to_owned()));
        Ok(())
    }
}

#[async_trait]
impl ConnectionProvider for RecordingSession {
    type Connection = RecordingSession;

    async fn connection(&self) -> Result<Self::Connection, SqlFluentError> {
        Ok(self.clone())
    }
}
