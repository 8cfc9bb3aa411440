//! Sync domain: wire shapes, outcomes, indicator colors and collaborator contracts.

mod sync_engine;
mod sync_model;
mod sync_traits;

pub use sync_engine::*;
pub use sync_model::*;
pub use sync_traits::*;
