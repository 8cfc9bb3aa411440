//! Trimming sessions recorded against a client.

mod trimming_model;
mod trimming_service;

pub use trimming_model::*;
pub use trimming_service::TrimmingService;
