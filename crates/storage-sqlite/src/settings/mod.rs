mod repository;

pub use repository::SettingsRepository;
