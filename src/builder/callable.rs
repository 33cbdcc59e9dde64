use async_trait::async_trait;

use crate::batch::{BatchGroup, CallableBatch};
use crate::binder::ParameterBinder;
use crate::error::SqlFluentError;
use crate::execution::{Call, OutParams};
use crate::results::OutputRegister;
use crate::session::Session;
use crate::sql::Sql;
use crate::statement::{BindParams, StatementSpec};
use crate::types::{RowValues, SqlType};

/// Callable statement that so far carries only IN parameters.
///
/// This is the only callable surface that can open a batch. Registering an OUT or INOUT
/// parameter turns it into a [`CallableWithOutputs`], which cannot.
///
/// ```rust
/// use sql_fluent::prelude::*;
///
/// let call = prepare_call("INSERT INTO movie(title, directed_by) VALUES (?, ?) RETURNING id")
///     .param("Tenet")
///     .param("Nolan")
///     .out_param(SqlType::BigInt)
///     .query_out_params(|out| out.get_i64(3));
/// # let _ = call;
/// ```
#[derive(Debug, Clone)]
pub struct CallableSqlBuilder {
    spec: StatementSpec,
}

impl CallableSqlBuilder {
    pub(crate) fn new(spec: StatementSpec) -> Self {
        Self { spec }
    }

    #[must_use]
    pub fn spec(&self) -> &StatementSpec {
        &self.spec
    }

    /// Register the next position as a pure OUT slot of `sql_type`.
    #[must_use]
    pub fn out_param(self, sql_type: SqlType) -> CallableWithOutputs {
        CallableWithOutputs { spec: self.spec }.out_param(sql_type)
    }

    /// Send `value` at the next position and read the same position back as `sql_type`.
    #[must_use]
    pub fn inout_param(self, sql_type: SqlType, value: impl Into<RowValues>) -> CallableWithOutputs {
        CallableWithOutputs { spec: self.spec }.inout_param(sql_type, value)
    }

    /// Freeze the IN binders bound so far as the first batch row.
    #[must_use]
    pub fn add_batch(self) -> CallableBatch {
        BatchGroup::from_template(&self.spec)
    }

    /// Invoke; yields true iff the call produced a result row.
    #[must_use]
    pub fn call(self) -> Call {
        Call::new(self.spec)
    }

    /// Invoke and map the output register.
    #[must_use]
    pub fn query_out_params<T, F>(self, mapper: F) -> OutParams<T>
    where
        F: Fn(&OutputRegister) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        OutParams::new(self.spec, mapper)
    }
}

impl BindParams for CallableSqlBuilder {
    fn push_binder(&mut self, binder: ParameterBinder) {
        self.spec.append(binder);
    }
}

#[async_trait]
impl Sql<bool> for CallableSqlBuilder {
    async fn execute(&self, session: &mut dyn Session) -> Result<bool, SqlFluentError> {
        Ok(session.execute_call(&self.spec).await?.produced_rows())
    }
}

/// Callable statement with at least one OUT or INOUT parameter. Has no batch surface.
#[derive(Debug, Clone)]
pub struct CallableWithOutputs {
    spec: StatementSpec,
}

impl CallableWithOutputs {
    #[must_use]
    pub fn spec(&self) -> &StatementSpec {
        &self.spec
    }

    #[must_use]
    pub fn out_param(mut self, sql_type: SqlType) -> Self {
        self.spec.append(ParameterBinder::output(sql_type));
        self
    }

    #[must_use]
    pub fn inout_param(mut self, sql_type: SqlType, value: impl Into<RowValues>) -> Self {
        self.spec.append(ParameterBinder::in_out(sql_type, value));
        self
    }

    #[must_use]
    pub fn call(self) -> Call {
        Call::new(self.spec)
    }

    #[must_use]
    pub fn query_out_params<T, F>(self, mapper: F) -> OutParams<T>
    where
        F: Fn(&OutputRegister) -> Result<T, SqlFluentError> + Send + Sync + 'static,
    {
        OutParams::new(self.spec, mapper)
    }
}

impl BindParams for CallableWithOutputs {
    fn push_binder(&mut self, binder: ParameterBinder) {
        self.spec.append(binder);
    }
}

#[async_trait]
impl Sql<bool> for CallableWithOutputs {
    async fn execute(&self, session: &mut dyn Session) -> Result<bool, SqlFluentError> {
        Ok(session.execute_call(&self.spec).await?.produced_rows())
    }
}
