use thiserror::Error;

use crate::domain::FetchError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("View already unmounted")]
    Unmounted,
    #[error("Operation already in progress")]
    Busy,
}
