// PostgreSQL backend
//
// - config: options, the bb8 connection manager, and pool setup
// - params: `ToSql` for row values
// - query: result set extraction
// - connection: the `Session` implementation

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{PgManager, PostgresOptions, PostgresOptionsBuilder};
pub use connection::PostgresSession;
pub use params::Params;
pub use query::build_result_set_from_statement;
