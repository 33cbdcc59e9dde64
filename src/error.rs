use thiserror::Error;

#[cfg(feature = "postgres")]
use tokio_postgres;

#[cfg(feature = "sqlite")]
use rusqlite;

#[derive(Debug, Error)]
pub enum SqlFluentError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// A batch row was closed with a different binder count than the template row.
    ///
    /// This is the only error raised from local bookkeeping; it is always reported
    /// before the batch reaches the database.
    #[error(
        "Parameters do not match with first set of parameters: expected {expected}, found {actual}"
    )]
    BatchMismatch { expected: usize, actual: usize },

    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlFluentError {
    /// True when the error came from batch arity validation rather than the database.
    #[must_use]
    pub fn is_batch_mismatch(&self) -> bool {
        matches!(self, Self::BatchMismatch { .. })
    }
}

impl<E: std::error::Error + 'static> From<bb8::RunError<E>> for SqlFluentError {
    fn from(err: bb8::RunError<E>) -> Self {
        SqlFluentError::PoolError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_run_errors_become_pool_errors() {
        let err: SqlFluentError = bb8::RunError::<SqlFluentError>::TimedOut.into();
        assert!(matches!(err, SqlFluentError::PoolError(_)));

        let inner = SqlFluentError::ConnectionError("refused".into());
        let err: SqlFluentError = bb8::RunError::User(inner).into();
        assert!(err.to_string().contains("refused"));
    }
}
