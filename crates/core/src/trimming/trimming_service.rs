use serde_json::{json, Value};

use super::{NewTrimmingSession, TrimmingSession};
use crate::errors::Result;
use crate::records::{MutationOptions, RecordCoordinator, TRIMMING_FAMILY};
use crate::stores::StoreKey;

fn decode(record: Value) -> Result<TrimmingSession> {
    Ok(serde_json::from_value(record)?)
}

pub struct TrimmingService {
    records: RecordCoordinator,
}

impl TrimmingService {
    pub fn new(records: RecordCoordinator) -> Self {
        Self { records }
    }

    pub async fn add_trimming(
        &self,
        session: NewTrimmingSession,
        options: MutationOptions,
    ) -> Result<TrimmingSession> {
        let record = serde_json::to_value(session)?;
        decode(self.records.insert(&TRIMMING_FAMILY, record, options).await?)
    }

    pub async fn update_trimming(
        &self,
        session: TrimmingSession,
        options: MutationOptions,
    ) -> Result<TrimmingSession> {
        let key = StoreKey::Int(session.trim_id);
        let patch = serde_json::to_value(session)?;
        decode(self.records.update(&TRIMMING_FAMILY, key, patch, options).await?)
    }

    pub async fn delete_trimming(
        &self,
        trim_id: i64,
        options: MutationOptions,
    ) -> Result<Option<TrimmingSession>> {
        self.records
            .delete(&TRIMMING_FAMILY, StoreKey::Int(trim_id), options)
            .await?
            .map(decode)
            .transpose()
    }

    /// All sessions for one client, via the `cID` index.
    pub async fn list_trimmings_for_client(&self, c_id: i64) -> Result<Vec<TrimmingSession>> {
        self.records
            .list_by_index(&TRIMMING_FAMILY, "cID", json!(c_id))
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordRepository;
    use crate::reporting::LogErrorReporter;
    use std::sync::Arc;

    #[tokio::test]
    async fn sessions_are_listed_per_client() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let service = TrimmingService::new(RecordCoordinator::new(
            repository.clone(),
            Arc::new(LogErrorReporter),
        ));

        let first = service
            .add_trimming(NewTrimmingSession::new(1, "2024-03-01"), MutationOptions::default())
            .await
            .unwrap();
        service
            .add_trimming(NewTrimmingSession::new(2, "2024-03-02"), MutationOptions::default())
            .await
            .unwrap();
        service
            .add_trimming(NewTrimmingSession::new(1, "2024-04-12"), MutationOptions::default())
            .await
            .unwrap();

        assert_eq!(first.trim_id, 1);
        let dates: Vec<_> = service
            .list_trimmings_for_client(1)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.trim_date)
            .collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-04-12"]);
        assert_eq!(repository.mirrors.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_keeps_the_session_key() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let service = TrimmingService::new(RecordCoordinator::new(
            repository.clone(),
            Arc::new(LogErrorReporter),
        ));
        let mut session = service
            .add_trimming(NewTrimmingSession::new(4, "2024-05-05"), MutationOptions::local_only())
            .await
            .unwrap();
        session.trim_date = "2024-05-06".to_string();

        let updated = service
            .update_trimming(session, MutationOptions::default().verified())
            .await
            .unwrap();
        assert_eq!(updated.trim_id, 1);
        assert_eq!(updated.trim_date, "2024-05-06");
        assert_eq!(repository.mirrors.lock().unwrap()[0].0.store, "EDITTRIMMING");
    }
}
