//! Error reporter that ships entries to the remote error log and parks them locally when offline.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::runtime::Handle;
use tokio::task::JoinSet;

use trimlog_core::errors::{Error, Result};
use trimlog_core::reporting::{ErrorLogEntry, ErrorReporter, LogErrorReporter};
use trimlog_core::sync::{
    ErrorQueueRepositoryTrait, RemoteCollaborator, RemoteRequest, ERROR_LOG_ENDPOINT,
};

tokio::task_local! {
    /// Set while an entry is being shipped, so failures of the shipping itself stay local.
    static SHIPPING: ();
}

fn shipping() -> bool {
    SHIPPING.try_with(|_| ()).is_ok()
}

/// Sending half of the reporter, cloned into every background delivery.
#[derive(Clone)]
struct Shipper {
    remote: Arc<dyn RemoteCollaborator>,
    queue: Arc<OnceLock<Arc<dyn ErrorQueueRepositoryTrait>>>,
    auth_token: Option<String>,
}

impl Shipper {
    async fn send(&self, entry: &ErrorLogEntry) -> Result<()> {
        self.remote
            .request(
                RemoteRequest::new(ERROR_LOG_ENDPOINT)
                    .payload(serde_json::to_value(entry)?)
                    .auth_token(self.auth_token.clone())
                    .raw(),
            )
            .await
            .map(|_| ())
    }

    /// Sends `entry`, parking it in the error queue when the remote log is unreachable.
    async fn deliver(&self, entry: ErrorLogEntry) -> Result<()> {
        let Err(e) = self.send(&entry).await else {
            return Ok(());
        };
        let Some(queue) = self.queue.get() else {
            warn!(
                "Could not send error {} to the remote log ({}) and no error queue is attached",
                entry.id, e
            );
            return Ok(());
        };
        warn!("Could not send error {} to the remote log ({}); queueing", entry.id, e);
        queue.enqueue(entry).await.map(|_| ())
    }
}

/// Reporter that logs locally and forwards every reported failure to the remote error log.
///
/// `log` is synchronous, so forwarding runs as a background task on the current runtime;
/// `flush` waits for the outstanding ones. The error queue lives in the local store, which
/// itself needs a reporter, so it can be attached after construction.
pub struct RemoteErrorReporter {
    shipper: Shipper,
    local: Arc<dyn ErrorReporter>,
    pending: Mutex<JoinSet<()>>,
}

impl RemoteErrorReporter {
    pub fn new(remote: Arc<dyn RemoteCollaborator>) -> Self {
        Self {
            shipper: Shipper {
                remote,
                queue: Arc::new(OnceLock::new()),
                auth_token: None,
            },
            local: Arc::new(LogErrorReporter),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_queue(self, queue: Arc<dyn ErrorQueueRepositoryTrait>) -> Self {
        self.attach_queue(queue);
        self
    }

    /// Reporter used for `log` and `display`; defaults to the `log` facade.
    pub fn with_local(mut self, local: Arc<dyn ErrorReporter>) -> Self {
        self.local = local;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.shipper.auth_token = Some(token.into());
        self
    }

    /// Attaches the error queue. Only the first attached queue is kept.
    pub fn attach_queue(&self, queue: Arc<dyn ErrorQueueRepositoryTrait>) -> bool {
        let attached = self.shipper.queue.set(queue).is_ok();
        if !attached {
            warn!("Error queue already attached; ignoring the new one");
        }
        attached
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Logs `error` and forwards it to the remote log, waiting for the delivery.
    pub async fn report(&self, error: &Error, context: &str) -> Result<()> {
        self.local.log(error, context);
        self.queue_for_retry(ErrorLogEntry::from_error(error, context))
            .await
    }

    /// Waits for every background delivery started by `log`.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!("Error log delivery task failed: {}", e);
            }
        }
    }

    /// Resends queued entries and removes the delivered ones. Returns how many were delivered.
    pub async fn replay_queued_errors(&self) -> Result<usize> {
        let Some(queue) = self.shipper.queue.get() else {
            debug!("No error queue attached; nothing to replay");
            return Ok(0);
        };
        let queued = queue.queued().await?;
        if queued.is_empty() {
            return Ok(0);
        }

        let mut delivered = Vec::new();
        for (key, entry) in queued {
            match self.shipper.send(&entry).await {
                Ok(()) => delivered.push(key),
                Err(e) if e.is_transport() => {
                    debug!("Remote error log unreachable, stopping replay: {}", e);
                    break;
                }
                Err(e) => warn!("Queued error {} was rejected: {}", entry.id, e),
            }
        }

        let count = delivered.len();
        if count > 0 {
            queue.remove(delivered).await?;
            info!("Replayed {} queued error log entries", count);
        }
        Ok(count)
    }
}

#[async_trait]
impl ErrorReporter for RemoteErrorReporter {
    fn log(&self, error: &Error, context: &str) {
        self.local.log(error, context);
        if shipping() {
            return;
        }
        let entry = ErrorLogEntry::from_error(error, context);
        let Ok(runtime) = Handle::try_current() else {
            debug!("No async runtime; error {} stays in the local log", entry.id);
            return;
        };
        let shipper = self.shipper.clone();
        let mut pending = self.pending();
        while pending.try_join_next().is_some() {}
        pending.spawn_on(
            SHIPPING.scope((), async move {
                if let Err(e) = shipper.deliver(entry).await {
                    warn!("Could not queue error log entry: {}", e);
                }
            }),
            &runtime,
        );
    }

    fn display(&self, message: &str) {
        self.local.display(message);
    }

    async fn queue_for_retry(&self, entry: ErrorLogEntry) -> Result<()> {
        SHIPPING.scope((), self.shipper.deliver(entry)).await
    }
}
