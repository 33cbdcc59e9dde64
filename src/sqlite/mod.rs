// SQLite backend
//
// - config: options, the bb8 connection manager, and pool setup
// - params: binder values to rusqlite values
// - query: result set extraction
// - connection: the `Session` implementation

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SqliteManager, SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteSession;
pub use params::Params;
pub use query::build_result_set;
