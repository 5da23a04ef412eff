// crates/database/src/connection.rs
//! SQLite sessions backed by a sqlx connection pool
//!
//! The pool is async; this module drives it from an owned tokio runtime so
//! that units of work stay plain blocking closures.

use crate::error::{DbError, DbResult};
use crate::session::{Session, SessionSource};
use futures::future::BoxFuture;
use rampart_resilience::Retry;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Connection, Pool, Sqlite};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};

/// Database connection pool
pub type DbPool = Pool<Sqlite>;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connection URL, e.g. `sqlite:rampart.db`
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long to wait for a connection before giving up
    pub connect_timeout: Duration,
    /// Enable Write-Ahead Logging (WAL) mode
    pub enable_wal: bool,
    /// Create database if it doesn't exist
    pub create_if_missing: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:rampart.db".to_string(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(10),
            enable_wal: true,
            create_if_missing: true,
        }
    }
}

impl PoolConfig {
    /// Creates a new configuration with a custom URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the maximum number of connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables or disables WAL mode
    pub fn with_wal(mut self, enable: bool) -> Self {
        self.enable_wal = enable;
        self
    }

    /// Sets whether to create the database if missing
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        if !self.url.starts_with("sqlite:") {
            return Err(DbError::Configuration(format!(
                "{}: expected a sqlite: URL",
                self.url
            )));
        }
        let mut options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| DbError::Configuration(format!("{}: {}", self.url, e)))?
            .create_if_missing(self.create_if_missing)
            .foreign_keys(true);

        if self.enable_wal {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        Ok(options)
    }
}

fn block_on<F: Future>(runtime: &Runtime, future: F) -> DbResult<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(DbError::BlockingInAsyncContext);
    }
    Ok(runtime.block_on(future))
}

/// Hands out pooled SQLite connections as blocking sessions
#[derive(Debug)]
pub struct SqliteSessionSource {
    runtime: Arc<Runtime>,
    pool: DbPool,
}

impl SqliteSessionSource {
    /// Opens a connection pool described by `config`
    ///
    /// Fails with [`DbError::BlockingInAsyncContext`] when called from inside
    /// a tokio runtime.
    pub fn connect(config: &PoolConfig) -> DbResult<Self> {
        if Handle::try_current().is_ok() {
            return Err(DbError::BlockingInAsyncContext);
        }

        let options = config.connect_options()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("rampart-db")
            .enable_all()
            .build()
            .map_err(DbError::Runtime)?;

        let pool = runtime.block_on(
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(config.connect_timeout)
                .connect_with(options),
        )?;

        log::info!(
            "Connected to {} (max {} connections)",
            config.url,
            config.max_connections
        );

        Ok(Self {
            runtime: Arc::new(runtime),
            pool,
        })
    }

    /// Opens a connection pool, retrying connection-class failures with `retry`
    ///
    /// Configuration and other fatal errors are returned on the first attempt.
    pub fn connect_with_retry(config: &PoolConfig, retry: &Retry) -> DbResult<Self> {
        retry.run_classified(|| Self::connect(config))
    }

    /// Opens a private in-memory database on a single connection
    pub fn in_memory() -> DbResult<Self> {
        let config = PoolConfig::new("sqlite::memory:")
            .with_max_connections(1)
            .with_wal(false);
        Self::connect(&config)
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Closes every pooled connection
    pub fn close(&self) -> DbResult<()> {
        block_on(&self.runtime, self.pool.close())
    }

    fn checkout(&self) -> DbResult<SqliteSession> {
        let conn = block_on(&self.runtime, self.pool.acquire())??;
        Ok(SqliteSession {
            conn,
            runtime: Arc::clone(&self.runtime),
        })
    }
}

impl SessionSource for SqliteSessionSource {
    type Session = SqliteSession;

    /// Checks out a connection and verifies it with `SELECT 1`
    ///
    /// A connection that fails the check is discarded and replaced once; the
    /// replacement is handed out without a second check.
    fn acquire(&self) -> DbResult<SqliteSession> {
        let mut session = self.checkout()?;
        if let Err(e) = session.ping() {
            log::warn!("Discarding unusable database connection: {}", e);
            session.discard();
            session = self.checkout()?;
        }
        Ok(session)
    }
}

/// A pooled SQLite connection
pub struct SqliteSession {
    conn: PoolConnection<Sqlite>,
    runtime: Arc<Runtime>,
}

impl fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSession").finish_non_exhaustive()
    }
}

impl SqliteSession {
    /// Runs an async sqlx operation against the connection, blocking until done
    ///
    /// ```no_run
    /// # use rampart_database::{DbResult, SessionSource, SqliteSessionSource};
    /// # fn main() -> DbResult<()> {
    /// let source = SqliteSessionSource::in_memory()?;
    /// let mut session = source.acquire()?;
    /// let one: i64 = session.run(|conn| {
    ///     Box::pin(async move { sqlx::query_scalar("SELECT 1").fetch_one(conn).await })
    /// })?;
    /// assert_eq!(one, 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run<T, F>(&mut self, operation: F) -> DbResult<T>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        let conn: &mut SqliteConnection = &mut self.conn;
        Ok(block_on(&self.runtime, operation(conn))??)
    }

    /// Executes a statement, returning the number of rows affected
    pub fn execute(&mut self, sql: &str) -> DbResult<u64> {
        let conn: &mut SqliteConnection = &mut self.conn;
        let done = block_on(&self.runtime, sqlx::query(sql).execute(conn))??;
        Ok(done.rows_affected())
    }

    /// Runs a query returning a single integer
    pub fn fetch_i64(&mut self, sql: &str) -> DbResult<i64> {
        let conn: &mut SqliteConnection = &mut self.conn;
        Ok(block_on(
            &self.runtime,
            sqlx::query_scalar::<_, i64>(sql).fetch_one(conn),
        )??)
    }

    fn ping(&mut self) -> DbResult<()> {
        self.execute("SELECT 1").map(|_| ())
    }

    fn discard(self) {
        let conn = self.conn.detach();
        if let Ok(Err(e)) = block_on(&self.runtime, conn.close()) {
            log::debug!("Error closing discarded connection: {}", e);
        }
    }
}

impl Session for SqliteSession {
    fn close(self) -> DbResult<()> {
        drop(self.conn);
        Ok(())
    }
}
