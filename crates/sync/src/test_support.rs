use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use trimlog_core::errors::{Error, Result};
use trimlog_core::reporting::LogErrorReporter;
use trimlog_core::sync::{RemoteCollaborator, RemoteRequest, SyncIndicator};
use trimlog_storage_sqlite::{ServiceContext, StoreConfig};

use crate::session::SyncSession;

/// Remote collaborator answering from per-target scripts. The target is the payload's
/// `store` or `table`, falling back to the endpoint. Unscripted calls fail as offline.
#[derive(Default)]
pub(crate) struct ScriptedRemote {
    responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
    requests: Mutex<Vec<RemoteRequest>>,
}

impl ScriptedRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, target: &str, response: Result<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn target_of(request: &RemoteRequest) -> String {
        request
            .payload
            .as_ref()
            .and_then(|payload| payload.get("store").or_else(|| payload.get("table")))
            .and_then(Value::as_str)
            .unwrap_or(request.endpoint.as_str())
            .to_string()
    }
}

#[async_trait]
impl RemoteCollaborator for ScriptedRemote {
    async fn request(&self, request: RemoteRequest) -> Result<Value> {
        let target = Self::target_of(&request);
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .get_mut(&target)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(Error::Network(format!("no response scripted for {}", target))))
    }
}

pub(crate) fn context(dir: &Path) -> ServiceContext {
    ServiceContext::new(StoreConfig::new(dir), Arc::new(LogErrorReporter))
}

pub(crate) fn session(
    remote: Arc<dyn RemoteCollaborator>,
    indicator: Arc<dyn SyncIndicator>,
) -> SyncSession {
    SyncSession::new(remote, indicator, Arc::new(LogErrorReporter)).with_auth_token("test-token")
}
