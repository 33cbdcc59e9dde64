use async_trait::async_trait;

use crate::batch::{BatchGroup, PreparedBatch};
use crate::binder::ParameterBinder;
use crate::error::SqlFluentError;
use crate::session::Session;
use crate::sql::Sql;
use crate::statement::{BindParams, StatementSpec};

use super::Queryable;

/// Builder for a prepared statement with positional IN parameters.
///
/// Executing it directly runs an update.
#[derive(Debug, Clone)]
pub struct PreparedSqlBuilder {
    spec: StatementSpec,
}

impl PreparedSqlBuilder {
    pub(crate) fn new(spec: StatementSpec) -> Self {
        Self { spec }
    }

    /// Freeze the binders bound so far as the first batch row.
    ///
    /// Their count becomes the cardinality every later row must match.
    #[must_use]
    pub fn add_batch(self) -> PreparedBatch {
        BatchGroup::from_template(&self.spec)
    }
}

impl BindParams for PreparedSqlBuilder {
    fn push_binder(&mut self, binder: ParameterBinder) {
        self.spec.append(binder);
    }
}

impl Queryable for PreparedSqlBuilder {
    fn into_spec(self) -> StatementSpec {
        self.spec
    }

    fn spec(&self) -> &StatementSpec {
        &self.spec
    }
}

#[async_trait]
impl Sql<u64> for PreparedSqlBuilder {
    async fn execute(&self, session: &mut dyn Session) -> Result<u64, SqlFluentError> {
        tracing::debug!(binders = self.spec.len(), "prepared update");
        session.execute_update(&self.spec).await
    }
}
