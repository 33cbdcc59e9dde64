#![doc = include_str!("../README.md")]

pub mod batch;
pub mod binder;
pub mod builder;
pub mod error;
pub mod execution;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod session;
pub mod sql;
pub mod statement;
pub mod transaction;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use builder::{prepare_call, prepare_sql, sql};
pub use error::SqlFluentError;
pub use transaction::Transaction;
