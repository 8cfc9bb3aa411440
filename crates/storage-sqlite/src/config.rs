use std::path::PathBuf;
use std::time::Duration;

use trimlog_core::stores::SCHEMA_VERSION;

pub const DB_DIR_ENV: &str = "TRIMLOG_DB_DIR";
const DEFAULT_DB_FILE_NAME: &str = "trimlog.db";

/// Where and how the local store is opened.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_dir: PathBuf,
    pub db_file_name: String,
    /// Version the schema is upgraded to on open.
    pub schema_version: i64,
    pub pool_size: u32,
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from("."),
            db_file_name: DEFAULT_DB_FILE_NAME.to_string(),
            schema_version: SCHEMA_VERSION,
            pool_size: 4,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl StoreConfig {
    pub fn new(db_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_dir: db_dir.into(),
            ..Default::default()
        }
    }

    /// Reads `TRIMLOG_DB_DIR`; everything else keeps its default.
    pub fn from_env() -> Self {
        match std::env::var(DB_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Self::new(dir.trim()),
            _ => Self::default(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.join(&self.db_file_name)
    }
}
