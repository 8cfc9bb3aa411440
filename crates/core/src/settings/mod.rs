//! Settings aggregate: model, cache and transactional coordinator.

mod settings_cache;
mod settings_model;
mod settings_service;
mod settings_traits;

pub use settings_cache::SettingsCache;
pub use settings_model::*;
pub use settings_service::SettingsService;
pub use settings_traits::{SettingsRepositoryTrait, SettingsServiceTrait};
