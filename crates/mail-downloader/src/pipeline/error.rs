use thiserror::Error;

use crate::email::EmailError;
use crate::error::StorageError;

/// Conditions that abort the whole run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Mailbox session failed: {0}")]
    Session(#[source] EmailError),

    #[error("Fetch failed: {0}")]
    Fetch(#[source] EmailError),

    #[error("Fetch task ended abnormally: {0}")]
    Producer(String),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid pipeline configuration: {0}")]
    Config(String),
}
