//! Connection pool, migrations and the single writer actor.

pub mod write_actor;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use trimlog_core::errors::{Error, Result};

use crate::config::StoreConfig;
use crate::errors::StorageError;

pub use write_actor::{spawn_writer, WriteHandle};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA journal_mode = WAL; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(r2d2::Error::QueryError)
    }
}

/// Makes sure the database directory exists and returns the database file path.
pub fn init(config: &StoreConfig) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.db_dir).map_err(StorageError::from)?;
    Ok(config.db_path())
}

/// The writer holds one connection for its whole life; readers need at least one more.
pub const MIN_POOL_SIZE: u32 = 2;

pub fn create_pool(db_path: &std::path::Path, config: &StoreConfig) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
    let pool = Pool::builder()
        .max_size(config.pool_size.max(MIN_POOL_SIZE))
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: config.busy_timeout,
        }))
        .build(manager)
        .map_err(StorageError::from)?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    Ok(pool.get().map_err(StorageError::from)?)
}

pub fn run_migrations(pool: &DbPool) -> std::result::Result<(), StorageError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    if !applied.is_empty() {
        debug!("Applied {} store migration(s)", applied.len());
    }
    Ok(())
}

/// Runs blocking database work off the async executor.
pub async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| Error::connection(format!("Database worker failed: {}", e)))?
}
