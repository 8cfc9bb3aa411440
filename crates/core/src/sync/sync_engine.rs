//! Outcome classification shared by the push and pull synchronizers.

use super::{PullStatus, SyncOutcome};
use crate::errors::Error;

/// Maps an HTTP status of a failed remote call onto the outcome it produces.
pub fn classify_http_status(status: u16) -> SyncOutcome {
    match status {
        401 | 403 => SyncOutcome::AuthError,
        _ => SyncOutcome::ServerError,
    }
}

/// Outcome of a table whose remote call or local write failed.
pub fn outcome_for_error(error: &Error) -> SyncOutcome {
    match error {
        Error::Auth(_) => SyncOutcome::AuthError,
        Error::Server(_) => SyncOutcome::ServerError,
        _ => SyncOutcome::Failed,
    }
}

/// Outcome implied by a pull status before any local write. `None` means data should be written.
pub fn outcome_for_pull_status(status: PullStatus) -> Option<SyncOutcome> {
    match status {
        PullStatus::Success => None,
        PullStatus::NoData => Some(SyncOutcome::NoData),
        PullStatus::Error => Some(SyncOutcome::Failed),
        PullStatus::ServerError => Some(SyncOutcome::ServerError),
        PullStatus::AuthError => Some(SyncOutcome::AuthError),
    }
}

/// Classifies `completed` out of `expected` items: all, some or none.
pub fn classify_completion(completed: usize, expected: usize) -> SyncOutcome {
    if expected == 0 {
        SyncOutcome::NoData
    } else if completed >= expected {
        SyncOutcome::Success
    } else if completed > 0 {
        SyncOutcome::Partial
    } else {
        SyncOutcome::Failed
    }
}
