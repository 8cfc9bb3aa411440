//! Local Store Manager: logical stores mapped onto SQLite tables.

mod ids;
mod manager;
mod model;
mod transaction;
mod upgrade;

pub use ids::{next_id, record_issued_id};
pub use manager::{ConnectionState, LocalStoreManager};
pub use model::StoreCatalogDB;
pub use transaction::StoreTx;
pub(crate) use transaction::set_path;
