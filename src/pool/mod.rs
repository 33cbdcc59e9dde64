pub mod connection;
pub mod types;

pub use connection::MiddlewarePoolConnection;
pub use types::MiddlewarePool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SqlFluentError;
use crate::session::ConnectionProvider;
use crate::types::DatabaseType;

#[cfg(feature = "postgres")]
use crate::postgres::PostgresOptions;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteOptions;

/// Configuration and connection pool for a database
///
/// This struct holds both the configuration and the connection pool
/// for a database, and hands out connections to deferred operations.
#[derive(Clone, Debug)]
pub struct ConfigAndPool {
    /// The connection pool
    pub pool: MiddlewarePool,
    /// The database type
    pub db_type: DatabaseType,
    /// Rewrite `?` placeholders for backends that number their parameters
    pub translate_placeholders: bool,
}

/// Serializable pool configuration, tagged by backend.
///
/// ```rust
/// use sql_fluent::prelude::*;
///
/// let cfg: DatabaseConfig =
///     serde_json::from_str(r#"{"type":"sqlite","db_path":"movies.db"}"#).unwrap();
/// assert_eq!(cfg.database_type(), DatabaseType::Sqlite);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    #[cfg(feature = "postgres")]
    Postgres(PostgresOptions),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteOptions),
}

impl DatabaseConfig {
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            DatabaseConfig::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            DatabaseConfig::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

impl ConfigAndPool {
    /// Build a pool for whichever backend `config` names.
    ///
    /// # Errors
    /// Returns the backend's configuration or connection error.
    pub async fn from_config(config: DatabaseConfig) -> Result<Self, SqlFluentError> {
        match config {
            #[cfg(feature = "postgres")]
            DatabaseConfig::Postgres(opts) => Self::new_postgres(opts).await,
            #[cfg(feature = "sqlite")]
            DatabaseConfig::Sqlite(opts) => Self::new_sqlite(opts).await,
        }
    }

    /// Check a connection out of the pool.
    ///
    /// # Errors
    /// Returns `SqlFluentError::PoolError` if the pool fails to provide a connection.
    pub async fn get_connection(&self) -> Result<MiddlewarePoolConnection, SqlFluentError> {
        MiddlewarePool::get_connection(&self.pool, self.translate_placeholders).await
    }
}

#[async_trait]
impl ConnectionProvider for ConfigAndPool {
    type Connection = MiddlewarePoolConnection;

    async fn connection(&self) -> Result<Self::Connection, SqlFluentError> {
        self.get_connection().await
    }
}
