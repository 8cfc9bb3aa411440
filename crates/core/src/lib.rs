//! Domain layer of trimlog: store catalog, coordinators and the sync model.
//!
//! Storage and transport live in `trimlog-storage-sqlite` and `trimlog-sync`, which implement
//! the repository and collaborator traits declared here.

pub mod clients;
pub mod errors;
pub mod notes;
pub mod records;
pub mod reporting;
pub mod settings;
pub mod stores;
pub mod sync;
pub mod trimming;

pub use errors::{Error, Result, ValidationError};
