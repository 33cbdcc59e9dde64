use std::sync::Arc;

use bb8::{ManageConnection, Pool, PooledConnection};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SqlFluentError;
use crate::pool::{ConfigAndPool, MiddlewarePool};
use crate::types::DatabaseType;

/// A `SQLite` connection shared between the pool and blocking worker tasks.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// A connection checked out of the `SQLite` pool.
pub type SqlitePooledConnection = PooledConnection<'static, SqliteManager>;

const MEMORY_PATH: &str = ":memory:";

fn default_pool_size() -> u32 {
    4
}

fn default_wal() -> bool {
    true
}

/// Options for configuring a `SQLite` pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Switch the journal to write-ahead logging on every new connection.
    #[serde(default = "default_wal")]
    pub wal: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            pool_size: default_pool_size(),
            wal: default_wal(),
        }
    }

    #[must_use]
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    /// Pool size actually used. An in-memory database exists once per connection, so it
    /// is always served by a single connection.
    #[must_use]
    pub fn effective_pool_size(&self) -> u32 {
        if self.db_path == MEMORY_PATH {
            1
        } else {
            self.pool_size.max(1)
        }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: u32) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError` if pool creation or the initial connection fails.
    pub async fn build(self) -> Result<ConfigAndPool, SqlFluentError> {
        ConfigAndPool::new_sqlite(self.finish()).await
    }
}

/// bb8 manager for `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    db_path: String,
    wal: bool,
}

impl SqliteManager {
    #[must_use]
    pub fn new(opts: &SqliteOptions) -> Self {
        Self {
            db_path: opts.db_path.clone(),
            wal: opts.wal && opts.db_path != MEMORY_PATH,
        }
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if the first connection cannot be opened.
    pub async fn build_pool(self, max_size: u32) -> Result<Pool<SqliteManager>, SqlFluentError> {
        Pool::builder().max_size(max_size).build(self).await
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlFluentError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let db_path = self.db_path.clone();
        let wal = self.wal;
        async move {
            let conn = tokio::task::spawn_blocking(move || {
                let conn = rusqlite::Connection::open(&db_path)?;
                if wal {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                Ok::<_, SqlFluentError>(conn)
            })
            .await
            .map_err(|e| {
                SqlFluentError::ConnectionError(format!("sqlite open join error: {e}"))
            })??;
            tracing::debug!("sqlite connection opened");
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            super::connection::run_blocking(handle, |guard| {
                if !guard.is_autocommit() {
                    tracing::warn!("sqlite connection checked out inside a transaction; rolling back");
                    guard.execute_batch("ROLLBACK")?;
                }
                guard.execute_batch("SELECT 1")?;
                Ok(())
            })
            .await
        }
    }

    /// A connection still locked by abandoned blocking work, or left inside a
    /// transaction, is discarded instead of returning to the pool.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        match conn.try_lock() {
            Ok(guard) => !guard.is_autocommit(),
            Err(_) => true,
        }
    }
}

impl ConfigAndPool {
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Asynchronous initializer for `ConfigAndPool` with `SQLite` on bb8.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConnectionError` if pool creation or the connection test fails.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, SqlFluentError> {
        let max_size = opts.effective_pool_size();
        let pool = SqliteManager::new(&opts).build_pool(max_size).await?;

        // Fail fast on an unopenable path.
        {
            let _conn = pool.get().await?;
        }

        tracing::debug!(path = %opts.db_path, max_size, "sqlite pool ready");
        Ok(ConfigAndPool {
            pool: MiddlewarePool::Sqlite(pool),
            db_type: DatabaseType::Sqlite,
            translate_placeholders: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_database_uses_one_connection() {
        let opts = SqliteOptions::new(":memory:".into()).with_pool_size(8);
        assert_eq!(opts.effective_pool_size(), 1);
        assert!(!SqliteManager::new(&opts).wal);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: SqliteOptions = serde_json::from_str(r#"{"db_path":"movies.db"}"#).unwrap();
        assert_eq!(opts, SqliteOptions::new("movies.db".into()));
        assert!(opts.wal);
    }
}
