//! Clients and the horses they own.

mod clients_model;
mod clients_service;

pub use clients_model::*;
pub use clients_service::ClientService;
