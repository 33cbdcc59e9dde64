use async_trait::async_trait;

use crate::error::SqlFluentError;
use crate::session::{ConnectionProvider, Session};

/// A deferred operation: a function from a live session to a typed result.
///
/// Nothing touches the database until `execute` is awaited. Every statement
/// variant, batch, and transaction stage is one of these.
#[async_trait]
pub trait Sql<T: Send>: Send + Sync {
    /// Run the operation on a session the caller already owns.
    ///
    /// # Errors
    /// Returns whatever the execution layer reports; nothing is retried.
    async fn execute(&self, session: &mut dyn Session) -> Result<T, SqlFluentError>;
}

#[async_trait]
impl<T: Send, S: Sql<T> + ?Sized> Sql<T> for Box<S> {
    async fn execute(&self, session: &mut dyn Session) -> Result<T, SqlFluentError> {
        (**self).execute(session).await
    }
}

/// Run any operation against a connection borrowed from a provider.
#[async_trait]
pub trait SqlExt<T: Send>: Sql<T> {
    /// Acquire a connection, run the operation, and release the connection on every
    /// exit path.
    ///
    /// # Errors
    /// Returns the acquisition error or the operation's error.
    async fn execute_with<P>(&self, provider: &P) -> Result<T, SqlFluentError>
    where
        P: ConnectionProvider;
}

#[async_trait]
impl<T: Send, S: Sql<T> + ?Sized> SqlExt<T> for S {
    async fn execute_with<P>(&self, provider: &P) -> Result<T, SqlFluentError>
    where
        P: ConnectionProvider,
    {
        let mut conn = provider.connection().await?;
        self.execute(&mut conn).await
    }
}
