//! Remote side of trimlog: the HTTP collaborator client, the push and pull synchronizers,
//! the sync indicator panel and the remote error reporter.

pub mod client;
pub mod config;
pub mod error;
pub mod indicator;
pub mod pull;
pub mod push;
pub mod reporter;
pub mod session;

#[cfg(test)]
mod test_support;

pub use client::RemoteClient;
pub use config::RemoteConfig;
pub use error::{RemoteError, Result};
pub use indicator::IndicatorPanel;
pub use pull::PullSynchronizer;
pub use push::PushSynchronizer;
pub use reporter::RemoteErrorReporter;
pub use session::SyncSession;
