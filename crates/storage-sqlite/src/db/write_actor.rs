//! Single writer: every write job runs on one dedicated connection inside an immediate
//! transaction, so this process never has two writers racing for the SQLite lock.

use diesel::sqlite::SqliteConnection;
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use trimlog_core::errors::{Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Cloneable handle to the writer thread.
#[derive(Clone)]
pub struct WriteHandle {
    sender: mpsc::UnboundedSender<Job>,
}

impl WriteHandle {
    /// Runs `job` in an immediate transaction. Any `Err` rolls the whole job back.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let wrapped: Job = Box::new(move |conn: &mut SqliteConnection| {
            let result = conn
                .immediate_transaction::<T, StorageError, _>(|conn| {
                    job(conn).map_err(StorageError::from)
                })
                .map_err(Error::from);
            let _ = reply.send(result);
        });

        self.sender
            .send(wrapped)
            .map_err(|_| Error::connection("Writer has stopped"))?;
        response
            .await
            .map_err(|_| Error::connection("Writer dropped the job without a reply"))?
    }
}

/// Starts the writer thread. It exits once every `WriteHandle` is dropped.
pub fn spawn_writer(pool: DbPool) -> Result<WriteHandle> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
    std::thread::Builder::new()
        .name("trimlog-writer".to_string())
        .spawn(move || {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Writer could not acquire a connection: {}", e);
                    return;
                }
            };
            while let Some(job) = receiver.blocking_recv() {
                job(&mut *conn);
            }
            debug!("Writer stopped");
        })
        .map_err(StorageError::from)?;
    Ok(WriteHandle { sender })
}
