//! Convenient imports for common functionality.
//!
//! This module re-exports the builders, traits, and types most callers need.

pub use crate::batch::{BatchGroup, CallableBatch, PreparedBatch, StatementBatch};
pub use crate::binder::{ParamDirection, ParameterBinder};
pub use crate::builder::{
    CallableSqlBuilder, CallableWithOutputs, PreparedSqlBuilder, Queryable, SqlBuilder,
    prepare_call, prepare_sql, sql,
};
pub use crate::error::SqlFluentError;
pub use crate::pool::{ConfigAndPool, DatabaseConfig, MiddlewarePool, MiddlewarePoolConnection};
pub use crate::results::{CustomDbRow, OutputRegister, ResultSet};
pub use crate::session::{ConnectionProvider, Savepoint, Session};
pub use crate::sql::{Sql, SqlExt};
pub use crate::statement::{BindParams, StatementKind, StatementSpec};
pub use crate::transaction::Transaction;
pub use crate::types::{DatabaseType, RowValues, SqlType};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresOptions, PostgresOptionsBuilder, PostgresSession};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder, SqliteSession};
