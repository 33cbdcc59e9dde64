use async_trait::async_trait;

use crate::batch::StatementBatch;
use crate::error::SqlFluentError;
use crate::session::Session;
use crate::sql::Sql;
use crate::statement::StatementSpec;

use super::Queryable;

/// Builder for fixed SQL text. Executing it directly runs an update.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    spec: StatementSpec,
}

impl SqlBuilder {
    pub(crate) fn new(spec: StatementSpec) -> Self {
        Self { spec }
    }

    /// Start a batch of distinct statements with this one first.
    #[must_use]
    pub fn add_batch(self, sql: impl Into<String>) -> StatementBatch {
        StatementBatch::new(self.spec.sql().to_owned(), sql)
    }
}

impl Queryable for SqlBuilder {
    fn into_spec(self) -> StatementSpec {
        self.spec
    }

    fn spec(&self) -> &StatementSpec {
        &self.spec
    }
}

#[async_trait]
impl Sql<u64> for SqlBuilder {
    async fn execute(&self, session: &mut dyn Session) -> Result<u64, SqlFluentError> {
        session.execute_update(&self.spec).await
    }
}
