//! Multi-statement units of work with optional savepoint-scoped stages.
//!
//! A [`Transaction`] is a chain of deferred operations. Each stage after the first is
//! built from the previous stage's result, and the whole chain runs on one session under
//! one commit boundary:
//!
//! ```rust,no_run
//! use sql_fluent::prelude::*;
//!
//! # async fn demo(pool: &ConfigAndPool) -> Result<(), SqlFluentError> {
//! let title = Transaction::begin(
//!     prepare_sql("INSERT INTO director(id, name) VALUES (?, ?)")
//!         .param(1)
//!         .param("Nolan"),
//! )
//! .then_apply(|_| {
//!     prepare_sql("INSERT INTO movie(title, directed_by) VALUES (?, ?)")
//!         .param("Tenet")
//!         .param("Nolan")
//!         .query_generated_keys(|row| row.try_get_i64(0))
//! })
//! .then_apply(|id| {
//!     prepare_sql("SELECT title FROM movie WHERE id = ?")
//!         .param(id.unwrap_or_default())
//!         .query_for_one(|row| row.try_get_string(0))
//! })
//! .execute_with(pool)
//! .await?;
//! # let _ = title;
//! # Ok(())
//! # }
//! ```
//!
//! A failure in an ordinary stage rolls back the whole chain. A failure inside a
//! [`Transaction::save_point`] stage only undoes that stage's work; the stage yields
//! `None` and the chain goes on to commit what came before.

use async_trait::async_trait;

use crate::error::SqlFluentError;
use crate::session::{ConnectionProvider, Session};
use crate::sql::Sql;

type Continuation<T, R> = Box<dyn Fn(T) -> Box<dyn Sql<R>> + Send + Sync>;

fn continuation<T, R, S, F>(f: F) -> Continuation<T, R>
where
    R: Send + 'static,
    S: Sql<R> + 'static,
    F: Fn(T) -> S + Send + Sync + 'static,
{
    Box::new(move |value| Box::new(f(value)) as Box<dyn Sql<R>>)
}

/// A chain of operations that runs on one connection and commits once.
pub struct Transaction<T> {
    stage: Box<dyn Sql<T>>,
    stages: usize,
}

impl<T: Send + 'static> Transaction<T> {
    /// Chain with a single stage.
    #[must_use]
    pub fn begin<S>(op: S) -> Self
    where
        S: Sql<T> + 'static,
    {
        Self {
            stage: Box::new(op),
            stages: 1,
        }
    }

    /// Number of stages in the chain.
    #[must_use]
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// Append a stage built from the previous stage's result.
    #[must_use]
    pub fn then_apply<R, S, F>(self, f: F) -> Transaction<R>
    where
        R: Send + 'static,
        S: Sql<R> + 'static,
        F: Fn(T) -> S + Send + Sync + 'static,
    {
        let index = self.stages;
        Transaction {
            stage: Box::new(ThenApply {
                prior: self.stage,
                next: continuation(f),
                index,
            }),
            stages: index + 1,
        }
    }

    /// Append a stage that runs behind the savepoint `name`.
    ///
    /// If the stage fails, its effects are rolled back to the savepoint and it yields
    /// `None`; earlier stages are kept. If it succeeds the savepoint is released and the
    /// result is wrapped in `Some`.
    #[must_use]
    pub fn save_point<R, S, F>(self, name: impl Into<String>, f: F) -> Transaction<Option<R>>
    where
        R: Send + 'static,
        S: Sql<R> + 'static,
        F: Fn(T) -> S + Send + Sync + 'static,
    {
        let index = self.stages;
        Transaction {
            stage: Box::new(SavePointStage {
                prior: self.stage,
                name: name.into(),
                next: continuation(f),
                index,
            }),
            stages: index + 1,
        }
    }

    /// Run every stage on `session` inside one transaction and commit.
    ///
    /// Per-statement commit is switched off for the duration and switched back on
    /// afterwards if it was on before. On failure the transaction is rolled back and the
    /// original error returned.
    ///
    /// # Errors
    /// Returns the first error raised outside a savepoint stage, or a commit error.
    pub async fn execute(self, session: &mut dyn Session) -> Result<T, SqlFluentError> {
        let restore_auto_commit = session.auto_commit();
        if restore_auto_commit {
            session.set_auto_commit(false).await?;
        }
        tracing::debug!(stages = self.stages, "transaction started");

        let outcome = match self.stage.execute(session).await {
            Ok(value) => session.commit().await.map(|()| value),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => {
                tracing::debug!(stages = self.stages, "transaction committed");
                if restore_auto_commit {
                    session.set_auto_commit(true).await?;
                }
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, "transaction aborted");
                if let Err(rollback_err) = session.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback after failed transaction failed");
                }
                if restore_auto_commit {
                    if let Err(restore_err) = session.set_auto_commit(true).await {
                        tracing::error!(error = %restore_err, "could not restore auto-commit");
                    }
                }
                Err(err)
            }
        }
    }

    /// Acquire a connection from `provider`, run the chain on it, and release it.
    ///
    /// # Errors
    /// Returns the acquisition error or the chain's error.
    pub async fn execute_with<P>(self, provider: &P) -> Result<T, SqlFluentError>
    where
        P: ConnectionProvider,
    {
        let mut conn = provider.connection().await?;
        self.execute(&mut conn).await
    }
}

struct ThenApply<T, R> {
    prior: Box<dyn Sql<T>>,
    next: Continuation<T, R>,
    index: usize,
}

#[async_trait]
impl<T: Send + 'static, R: Send + 'static> Sql<R> for ThenApply<T, R> {
    async fn execute(&self, session: &mut dyn Session) -> Result<R, SqlFluentError> {
        let value = self.prior.execute(session).await?;
        tracing::debug!(stage = self.index, "transaction stage");
        let op = (self.next)(value);
        op.execute(session).await
    }
}

struct SavePointStage<T, R> {
    prior: Box<dyn Sql<T>>,
    name: String,
    next: Continuation<T, R>,
    index: usize,
}

#[async_trait]
impl<T: Send + 'static, R: Send + 'static> Sql<Option<R>> for SavePointStage<T, R> {
    async fn execute(&self, session: &mut dyn Session) -> Result<Option<R>, SqlFluentError> {
        let value = self.prior.execute(session).await?;
        tracing::debug!(stage = self.index, savepoint = %self.name, "savepoint stage");
        let op = (self.next)(value);
        let savepoint = session.set_savepoint(&self.name).await?;

        match op.execute(session).await {
            Ok(result) => {
                session.release_savepoint(&savepoint).await?;
                Ok(Some(result))
            }
            Err(err) => {
                tracing::warn!(
                    savepoint = %self.name,
                    error = %err,
                    "rolling back to savepoint"
                );
                if let Err(rollback_err) = session.rollback_to_savepoint(&savepoint).await {
                    tracing::error!(
                        savepoint = %self.name,
                        error = %rollback_err,
                        "rollback to savepoint failed"
                    );
                    return Err(rollback_err);
                }
                session.release_savepoint(&savepoint).await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::runtime::Runtime;

    use super::*;
    use crate::builder::{Queryable, prepare_sql, sql};
    use crate::statement::BindParams;
    use crate::test_utils::{RecordedCall, RecordingSession, result_set_of};
    use crate::types::RowValues;

    #[test]
    fn stages_run_in_order_under_one_commit() {
        let rt = Runtime::new().unwrap();
        let mut session = RecordingSession::new()
            .with_result("SELECT 7", result_set_of(&["n"], vec![vec![RowValues::Int(7)]]));

        let result = rt
            .block_on(
                Transaction::begin(sql("SELECT 7").query_for_one(|r| r.try_get_i64(0)))
                    .then_apply(|n| prepare_sql("UPDATE a SET n = ?").param(n.unwrap_or(0)))
                    .then_apply(|count| sql(format!("UPDATE b SET c = {count}")))
                    .execute(&mut session),
            )
            .unwrap();

        assert_eq!(result, 1);
        assert_eq!(
            session.calls(),
            vec![
                RecordedCall::SetAutoCommit(false),
                RecordedCall::Query("SELECT 7".into()),
                RecordedCall::Update("UPDATE a SET n = ?".into()),
                RecordedCall::Update("UPDATE b SET c = 1".into()),
                RecordedCall::Commit,
                RecordedCall::SetAutoCommit(true),
            ]
        );
    }

    #[test]
    fn failure_outside_savepoint_rolls_back_everything() {
        let rt = Runtime::new().unwrap();
        let mut session = RecordingSession::new().failing_on("BROKEN");

        let err = rt
            .block_on(
                Transaction::begin(sql("INSERT ONE"))
                    .then_apply(|_| sql("BROKEN"))
                    .then_apply(|_| sql("NEVER"))
                    .execute(&mut session),
            )
            .unwrap_err();

        assert!(err.to_string().contains("BROKEN"));
        let calls = session.calls();
        assert!(!calls.contains(&RecordedCall::Commit));
        assert!(!calls.contains(&RecordedCall::Update("NEVER".into())));
        assert_eq!(
            &calls[calls.len() - 2..],
            &[RecordedCall::Rollback, RecordedCall::SetAutoCommit(true)]
        );
    }

    #[test]
    fn savepoint_failure_is_contained() {
        let rt = Runtime::new().unwrap();
        let mut session = RecordingSession::new().failing_on("BROKEN");

        let result = rt
            .block_on(
                Transaction::begin(sql("INSERT DIRECTOR"))
                    .save_point("movies", |_| sql("BROKEN"))
                    .execute(&mut session),
            )
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(
            session.calls(),
            vec![
                RecordedCall::SetAutoCommit(false),
                RecordedCall::Update("INSERT DIRECTOR".into()),
                RecordedCall::SetSavepoint("movies".into()),
                RecordedCall::Update("BROKEN".into()),
                RecordedCall::RollbackToSavepoint("movies".into()),
                RecordedCall::ReleaseSavepoint("movies".into()),
                RecordedCall::Commit,
                RecordedCall::SetAutoCommit(true),
            ]
        );
    }

    #[test]
    fn savepoint_success_releases_marker() {
        let rt = Runtime::new().unwrap();
        let mut session = RecordingSession::new();

        let result = rt
            .block_on(
                Transaction::begin(sql("A"))
                    .save_point("sp", |_| sql("B"))
                    .then_apply(|inner| sql(format!("C {}", inner.unwrap_or(0))))
                    .execute(&mut session),
            )
            .unwrap();

        assert_eq!(result, 1);
        let calls = session.calls();
        assert!(calls.contains(&RecordedCall::ReleaseSavepoint("sp".into())));
        assert!(!calls.contains(&RecordedCall::RollbackToSavepoint("sp".into())));
        assert!(calls.contains(&RecordedCall::Update("C 1".into())));
    }

    #[test]
    fn manual_commit_session_is_left_manual() {
        let rt = Runtime::new().unwrap();
        let mut session = RecordingSession::new();
        rt.block_on(session.set_auto_commit(false)).unwrap();

        rt.block_on(Transaction::begin(sql("A")).execute(&mut session))
            .unwrap();

        assert!(!session.auto_commit());
        assert_eq!(
            session.calls(),
            vec![
                RecordedCall::SetAutoCommit(false),
                RecordedCall::Update("A".into()),
                RecordedCall::Commit,
            ]
        );
    }

    #[test]
    fn execute_with_borrows_a_connection() {
        let rt = Runtime::new().unwrap();
        let provider = RecordingSession::new();
        let chain = Transaction::begin(sql("A")).then_apply(|_| sql("B"));
        assert_eq!(chain.stages(), 2);

        rt.block_on(chain.execute_with(&provider)).unwrap();
        assert_eq!(provider.round_trips(), 2);
    }
}
