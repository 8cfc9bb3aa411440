//! Transactional update coordinator for keyed entity families.

mod records_model;
mod records_service;
mod records_traits;

pub use records_model::*;
pub use records_service::RecordCoordinator;
pub use records_traits::RecordRepositoryTrait;

#[cfg(test)]
pub(crate) use records_service::tests::MemoryRecordRepository;
