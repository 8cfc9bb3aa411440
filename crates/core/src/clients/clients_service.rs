use serde_json::{json, Value};

use super::{Client, NewClient};
use crate::errors::Result;
use crate::records::{MutationOptions, RecordCoordinator, CLIENT_FAMILY};
use crate::stores::StoreKey;

fn decode(record: Value) -> Result<Client> {
    Ok(serde_json::from_value(record)?)
}

/// Client operations on top of the record coordinator.
pub struct ClientService {
    records: RecordCoordinator,
}

impl ClientService {
    pub fn new(records: RecordCoordinator) -> Self {
        Self { records }
    }

    /// Allocates `cID` and one `hID` per new horse, writing everything and the `ADDCLIENT`
    /// mirror in one transaction.
    pub async fn add_client(&self, client: NewClient, options: MutationOptions) -> Result<Client> {
        let record = serde_json::to_value(client)?;
        decode(self.records.insert(&CLIENT_FAMILY, record, options).await?)
    }

    /// Replaces the stored client with `client`. Horses without an `hID` get one.
    pub async fn update_client(&self, client: Client, options: MutationOptions) -> Result<Client> {
        let key = StoreKey::Int(client.c_id);
        let patch = serde_json::to_value(client)?;
        decode(self.records.update(&CLIENT_FAMILY, key, patch, options).await?)
    }

    pub async fn delete_client(&self, c_id: i64, options: MutationOptions) -> Result<Option<Client>> {
        self.records
            .delete(&CLIENT_FAMILY, StoreKey::Int(c_id), options)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn get_client(&self, c_id: i64) -> Result<Option<Client>> {
        self.records
            .get(&CLIENT_FAMILY, StoreKey::Int(c_id))
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>> {
        self.records
            .list(&CLIENT_FAMILY)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_clients_by_name(&self, client_name: &str) -> Result<Vec<Client>> {
        self.records
            .list_by_index(&CLIENT_FAMILY, "client_name", json!(client_name))
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Horse;
    use crate::records::MemoryRecordRepository;
    use crate::reporting::LogErrorReporter;
    use std::sync::Arc;

    fn service(repository: Arc<MemoryRecordRepository>) -> ClientService {
        ClientService::new(RecordCoordinator::new(repository, Arc::new(LogErrorReporter)))
    }

    #[tokio::test]
    async fn add_client_assigns_client_and_horse_ids() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let clients = service(repository.clone());

        let added = clients
            .add_client(
                NewClient::new("Ada")
                    .with_phone("555-0101")
                    .with_horse(Horse::named("Comet"))
                    .with_horse(Horse::named("Dancer")),
                MutationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(added.c_id, 1);
        let ids: Vec<_> = added.horses.iter().map(|h| h.h_id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
        assert_eq!(repository.mirrors.lock().unwrap()[0].0.store, "ADDCLIENT");
    }

    #[tokio::test]
    async fn update_then_delete_mirror_to_edit_and_delete_stores() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let clients = service(repository.clone());
        let mut client = clients
            .add_client(NewClient::new("Ada"), MutationOptions::local_only())
            .await
            .unwrap();

        client.client_name = "Ada Lovelace".to_string();
        clients
            .update_client(client.clone(), MutationOptions::default())
            .await
            .unwrap();
        let removed = clients
            .delete_client(client.c_id, MutationOptions::default().verified())
            .await
            .unwrap();

        assert_eq!(removed.map(|c| c.client_name), Some("Ada Lovelace".to_string()));
        let mirrors = repository.mirrors.lock().unwrap();
        let stores: Vec<_> = mirrors.iter().map(|(t, _)| t.store.as_str()).collect();
        assert_eq!(stores, vec!["EDITCLIENT", "DELETECLIENT"]);
        assert_eq!(mirrors[1].1["client_name"], json!("Ada Lovelace"));
        assert!(clients.get_client(client.c_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_name_uses_the_name_index() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let clients = service(repository);
        for name in ["Ada", "Grace", "Ada"] {
            clients
                .add_client(NewClient::new(name), MutationOptions::local_only())
                .await
                .unwrap();
        }
        assert_eq!(clients.find_clients_by_name("Ada").await.unwrap().len(), 2);
        assert_eq!(clients.list_clients().await.unwrap().len(), 3);
    }
}
