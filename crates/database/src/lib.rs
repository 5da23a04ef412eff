// crates/database/src/lib.rs
//! Rampart Database Layer
//!
//! Runs caller-supplied units of work against freshly acquired sessions,
//! retrying only when the connection itself failed. Sessions come from a
//! [`SessionSource`]; [`SqliteSessionSource`] provides one over a sqlx SQLite
//! pool.
//!
//! ```no_run
//! use rampart_database::{DbResult, SqliteSessionSource, UnitOfWork};
//! use std::time::Duration;
//!
//! # fn main() -> DbResult<()> {
//! let uow = UnitOfWork::new(SqliteSessionSource::in_memory()?);
//! let rows = uow.execute(
//!     |session| session.execute("CREATE TABLE IF NOT EXISTS suppliers (name TEXT)"),
//!     3,
//!     Duration::from_secs(1),
//! )?;
//! assert_eq!(rows, 0);
//! # Ok(())
//! # }
//! ```

mod connection;
mod error;
mod executor;
mod session;

pub use connection::{PoolConfig, DbPool, SqliteSession, SqliteSessionSource};
pub use error::{is_transient_message, DbError, DbResult, TRANSIENT_PHRASES};
pub use executor::{execute_with_retry, UnitOfWork, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
pub use session::{Session, SessionSource};
