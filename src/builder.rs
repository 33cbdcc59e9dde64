//! Statement builders: the entry points of the fluent API.
//!
//! ```rust
//! use sql_fluent::prelude::*;
//!
//! let count = prepare_sql("SELECT COUNT(*) FROM movie WHERE directed_by = ?")
//!     .param("Nolan")
//!     .query_for_one(|row| row.try_get_i64(0));
//! # let _ = count;
//! ```
//!
//! Nothing here touches a database. Each builder, or the variant it is turned into, is a
//! [`Sql`](crate::sql::Sql) operation that runs once it is executed on a session.

use crate::error::SqlFluentError;
use crate::execution::{Exists, GeneratedKey, GeneratedKeys, QueryForList, QueryForOne, Update};
use crate::results::CustomDbRow;
use crate::statement::{StatementKind, StatementSpec};

mod callable;
mod plain;
mod prepared;

pub use callable::{CallableSqlBuilder, CallableWithOutputs};
pub use plain::SqlBuilder;
pub use prepared::PreparedSqlBuilder;

/// Plain statement with no binders.
#[must_use]
pub fn sql(text: impl Into<String>) -> SqlBuilder {
    SqlBuilder::new(StatementSpec::new(text.into(), StatementKind::Plain))
}

/// Prepared statement; bind IN values with [`BindParams`](crate::statement::BindParams).
#[must_use]
pub fn prepare_sql(text: impl Into<String>) -> PreparedSqlBuilder {
    PreparedSqlBuilder::new(StatementSpec::new(text.into(), StatementKind::Prepared))
}

/// Stored-routine invocation with IN, OUT, and INOUT parameters.
#[must_use]
pub fn prepare_call(text: impl Into<String>) -> CallableSqlBuilder {
    CallableSqlBuilder::new(StatementSpec::new(text.into(), StatementKind::Callable))
}

/// Result-reading variants shared by plain and prepared builders.
pub trait Queryable: Sized {
    /// Give up the builder and keep its statement.
    fn into_spec(self) -> StatementSpec;

    /// Borrow the statement built so far.
    fn spec(&self) -> &StatementSpec;

    /// Run as an update; yields the affected row count.
    #[must_use]
    fn update(self) -> Update {
        Update::new(self.into_spec())
    }

    /// True iff the query produces at least one row.
    #[must_use]
    fn query_for_exists(self) -> Exists {
        Exists::new(self.into_spec())
    }

    /// First row mapped, `None` when the query is empty.
    #[must_use]
    fn query_for_one<T, F>(self, mapper: F) -> QueryForOne<T>
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        QueryForOne::new(self.into_spec(), mapper)
    }

    /// Every row mapped, in cursor order.
    #[must_use]
    fn query_for_list<T, F>(self, mapper: F) -> QueryForList<T>
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        QueryForList::new(self.into_spec(), mapper)
    }

    /// Run as an update and map the first generated key row.
    #[must_use]
    fn query_generated_keys<T, F>(self, mapper: F) -> GeneratedKey<T>
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        GeneratedKey::new(self.into_spec(), mapper)
    }

    /// Run as an update and map every generated key row, in insertion order.
    #[must_use]
    fn query_generated_keys_as_list<T, F>(self, mapper: F) -> GeneratedKeys<T>
    where
        F: Fn(&CustomDbRow) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        GeneratedKeys::new(self.into_spec(), mapper)
    }
}
