//! Wiring of the local store, repositories and coordinators for one process.

use std::sync::Arc;

use trimlog_core::clients::ClientService;
use trimlog_core::notes::NoteService;
use trimlog_core::records::RecordCoordinator;
use trimlog_core::reporting::ErrorReporter;
use trimlog_core::settings::{SettingsService, SettingsServiceTrait};
use trimlog_core::sync::{ErrorQueueRepositoryTrait, SyncStoreRepositoryTrait};
use trimlog_core::trimming::TrimmingService;

use crate::config::StoreConfig;
use crate::records::RecordRepository;
use crate::settings::SettingsRepository;
use crate::store::LocalStoreManager;
use crate::sync::{ErrorQueueRepository, SyncStoreRepository};

pub struct ServiceContext {
    /// The single lazily opened connection; nothing touches disk until first use.
    pub store: Arc<LocalStoreManager>,

    // Services
    pub settings_service: Arc<dyn SettingsServiceTrait>,
    pub client_service: Arc<ClientService>,
    pub trimming_service: Arc<TrimmingService>,
    pub note_service: Arc<NoteService>,

    // Sync-side repositories
    pub sync_repository: Arc<dyn SyncStoreRepositoryTrait>,
    pub error_queue: Arc<dyn ErrorQueueRepositoryTrait>,
}

impl ServiceContext {
    pub fn new(config: StoreConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        let store = Arc::new(LocalStoreManager::new(config, Arc::clone(&reporter)));

        let settings_repository = Arc::new(SettingsRepository::new(Arc::clone(&store)));
        let settings_service: Arc<dyn SettingsServiceTrait> = Arc::new(SettingsService::new(
            settings_repository,
            Arc::clone(&reporter),
        ));

        let record_repository = Arc::new(RecordRepository::new(Arc::clone(&store)));
        let records = RecordCoordinator::new(record_repository, Arc::clone(&reporter));

        Self {
            settings_service,
            client_service: Arc::new(ClientService::new(records.clone())),
            trimming_service: Arc::new(TrimmingService::new(records.clone())),
            note_service: Arc::new(NoteService::new(records)),
            sync_repository: Arc::new(SyncStoreRepository::new(Arc::clone(&store))),
            error_queue: Arc::new(ErrorQueueRepository::new(Arc::clone(&store))),
            store,
        }
    }

    pub fn from_env(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::new(StoreConfig::from_env(), reporter)
    }
}
