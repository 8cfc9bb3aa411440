//! Store access for the push/pull synchronizers and the error queue.

mod error_queue;
mod repository;

pub use error_queue::ErrorQueueRepository;
pub use repository::SyncStoreRepository;
