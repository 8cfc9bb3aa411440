//! SQLite implementation of the trimlog local store.
//!
//! Each logical store is a `record_key`/`record_value` table; writes are serialized through one
//! writer actor and every multi-store mutation runs in a single transaction.

pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod records;
pub mod schema;
pub mod settings;
pub mod store;
pub mod sync;

pub use config::StoreConfig;
pub use context::ServiceContext;
pub use errors::StorageError;
pub use store::{ConnectionState, LocalStoreManager, StoreTx};
