use diesel::Connection;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use trimlog_core::errors::{Error, Result};
use trimlog_core::reporting::{self, ErrorReporter};
use trimlog_core::stores::{StoreKey, TxMode};

use super::model::StoreCatalogDB;
use super::transaction::StoreTx;
use super::upgrade;
use crate::config::StoreConfig;
use crate::db::{self, get_connection, run_blocking, spawn_writer, DbPool, WriteHandle};
use crate::errors::StorageError;

/// Lifecycle of the local connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Closed,
    Opening,
    Upgrading,
    Open,
    Blocked,
    Errored,
}

struct StoreHandle {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

/// Owner of the single local connection (pool + writer), opened lazily by the first caller.
pub struct LocalStoreManager {
    config: StoreConfig,
    reporter: Arc<dyn ErrorReporter>,
    handle: Mutex<Option<Arc<StoreHandle>>>,
    state: RwLock<ConnectionState>,
}

fn owned_scope(stores: &[&str]) -> Vec<String> {
    stores.iter().map(|s| s.to_string()).collect()
}

impl LocalStoreManager {
    pub fn new(config: StoreConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            config,
            reporter,
            handle: Mutex::new(None),
            state: RwLock::new(ConnectionState::Closed),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn reporter(&self) -> Arc<dyn ErrorReporter> {
        Arc::clone(&self.reporter)
    }

    pub fn state(&self) -> ConnectionState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        debug!("Local store state {:?} -> {:?}", *guard, next);
        *guard = next;
    }

    fn reported(&self, context: &str, err: Error) -> Error {
        reporting::reported(self.reporter.as_ref(), context, err)
    }

    /// Opens the connection if needed. Concurrent callers share the single open attempt.
    pub async fn open(&self) -> Result<()> {
        self.handle().await.map(|_| ())
    }

    /// Drops the connection; the next operation reopens it.
    pub async fn close(&self) {
        let mut slot = self.handle.lock().await;
        if slot.take().is_some() {
            info!("Local store closed");
        }
        self.set_state(ConnectionState::Closed);
    }

    async fn handle(&self) -> Result<Arc<StoreHandle>> {
        let mut slot = self.handle.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }

        self.set_state(ConnectionState::Opening);
        match self.open_handle().await {
            Ok(handle) => {
                *slot = Some(Arc::clone(&handle));
                self.set_state(ConnectionState::Open);
                info!("Local store open at {}", self.config.db_path().display());
                Ok(handle)
            }
            Err(err) => {
                let state = match err {
                    Error::Blocked(_) => ConnectionState::Blocked,
                    _ => ConnectionState::Errored,
                };
                self.set_state(state);
                Err(self.reported("open local store", err))
            }
        }
    }

    async fn open_handle(&self) -> Result<Arc<StoreHandle>> {
        let config = self.config.clone();
        let pool = run_blocking(move || {
            let db_path = db::init(&config)?;
            let pool = db::create_pool(&db_path, &config)?;
            db::run_migrations(&pool).map_err(upgrade::upgrade_error)?;
            Ok(pool)
        })
        .await?;

        let version_pool = Arc::clone(&pool);
        let current = run_blocking(move || {
            let mut conn = get_connection(&version_pool)?;
            upgrade::stored_version(&mut conn)
        })
        .await?;

        let target = self.config.schema_version;
        if current > target {
            return Err(Error::connection(format!(
                "stored schema version {} is newer than supported version {}",
                current, target
            )));
        }
        if current < target {
            self.set_state(ConnectionState::Upgrading);
            let upgrade_pool = Arc::clone(&pool);
            let created = run_blocking(move || {
                let mut conn = get_connection(&upgrade_pool)?;
                upgrade::upgrade(&mut conn, target).map_err(upgrade::upgrade_error)
            })
            .await?;
            upgrade::log_upgrade(current, target, created);
        }

        let writer = spawn_writer(pool.as_ref().clone())?;
        Ok(Arc::new(StoreHandle { pool, writer }))
    }

    /// Runs `f` in a read-only transaction over `stores` on a pooled connection.
    pub async fn read<T, F>(&self, stores: &[&str], f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreTx<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.handle().await?;
        let scope = owned_scope(stores);
        let pool = Arc::clone(&handle.pool);
        run_blocking(move || {
            let mut conn = get_connection(&pool)?;
            conn.transaction::<T, StorageError, _>(|conn| {
                let mut tx = StoreTx::new(conn, &scope, TxMode::ReadOnly)?;
                f(&mut tx).map_err(StorageError::from)
            })
            .map_err(Error::from)
        })
        .await
    }

    /// Runs `f` in one read-write transaction over `stores` on the writer.
    /// Any error rolls back every write `f` made.
    pub async fn write<T, F>(&self, stores: &[&str], f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreTx<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.handle().await?;
        let scope = owned_scope(stores);
        handle
            .writer
            .exec(move |conn| {
                let mut tx = StoreTx::new(conn, &scope, TxMode::ReadWrite)?;
                f(&mut tx)
            })
            .await
    }

    async fn read_reported<T, F>(&self, context: String, stores: &[&str], f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreTx<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.read(stores, f)
            .await
            .map_err(|err| self.reported(&context, err))
    }

    async fn write_reported<T, F>(&self, context: String, stores: &[&str], f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreTx<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.write(stores, f)
            .await
            .map_err(|err| self.reported(&context, err))
    }

    pub async fn add(&self, store: &str, record: Value) -> Result<StoreKey> {
        let name = store.to_string();
        self.write_reported(format!("add to '{}'", store), &[store], move |tx| {
            tx.add(&name, record, None)
        })
        .await
    }

    pub async fn put(&self, store: &str, record: Value, clear_first: bool) -> Result<StoreKey> {
        let name = store.to_string();
        self.write_reported(format!("put into '{}'", store), &[store], move |tx| {
            if clear_first {
                tx.put_clear_first(&name, record, None)
            } else {
                tx.put(&name, record, None)
            }
        })
        .await
    }

    pub async fn get(&self, store: &str, key: StoreKey) -> Result<Option<Value>> {
        let name = store.to_string();
        self.read_reported(format!("get from '{}'", store), &[store], move |tx| {
            tx.get(&name, &key)
        })
        .await
    }

    pub async fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        let name = store.to_string();
        self.read_reported(format!("get all from '{}'", store), &[store], move |tx| {
            tx.get_all(&name)
        })
        .await
    }

    pub async fn get_all_entries(&self, store: &str) -> Result<Vec<(StoreKey, Value)>> {
        let name = store.to_string();
        self.read_reported(format!("get entries from '{}'", store), &[store], move |tx| {
            tx.get_all_entries(&name)
        })
        .await
    }

    pub async fn get_all_by_index(
        &self,
        store: &str,
        index: &str,
        value: Value,
    ) -> Result<Vec<Value>> {
        let name = store.to_string();
        let index_name = index.to_string();
        self.read_reported(
            format!("query '{}' by index '{}'", store, index),
            &[store],
            move |tx| tx.get_all_by_index(&name, &index_name, &value),
        )
        .await
    }

    pub async fn clear(&self, store: &str) -> Result<()> {
        let name = store.to_string();
        self.write_reported(format!("clear '{}'", store), &[store], move |tx| {
            tx.clear(&name)
        })
        .await
    }

    pub async fn delete(&self, key: StoreKey, store: &str) -> Result<bool> {
        let name = store.to_string();
        self.write_reported(format!("delete from '{}'", store), &[store], move |tx| {
            tx.delete(&name, &key)
        })
        .await
    }

    pub async fn last_key(&self, store: &str) -> Result<Option<StoreKey>> {
        let name = store.to_string();
        self.read_reported(format!("last key of '{}'", store), &[store], move |tx| {
            tx.last_key(&name)
        })
        .await
    }

    pub async fn count(&self, store: &str) -> Result<usize> {
        let name = store.to_string();
        self.read_reported(format!("count '{}'", store), &[store], move |tx| {
            tx.count(&name)
        })
        .await
    }

    /// Rows of `store_catalog`, one per store created by an upgrade.
    pub async fn created_stores(&self) -> Result<Vec<StoreCatalogDB>> {
        let handle = self.handle().await?;
        let pool = Arc::clone(&handle.pool);
        run_blocking(move || {
            let mut conn = get_connection(&pool)?;
            upgrade::created_stores(&mut conn)
        })
        .await
    }

    /// Schema version stamped in the database file.
    pub async fn schema_version(&self) -> Result<i64> {
        let handle = self.handle().await?;
        let pool = Arc::clone(&handle.pool);
        run_blocking(move || {
            let mut conn = get_connection(&pool)?;
            upgrade::stored_version(&mut conn)
        })
        .await
    }
}
