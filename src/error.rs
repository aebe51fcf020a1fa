//! Error types for recording reconciliation
//!
//! Errors are classified by where they stop:
//! - Validation: a single recording is rejected, the batch may go on
//! - Store: the database itself failed
//! - Aborted: the failure policy stopped the batch at one recording

use std::path::PathBuf;
use thiserror::Error;

use crate::db::DbError;

/// Errors raised while reconciling recordings.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Invalid recording descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Sync aborted at recording {recordid}: {source}")]
    Aborted {
        recordid: String,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Returns true if the error rejects a single recording's data rather than
    /// signalling a broken store.
    pub fn is_validation(&self) -> bool {
        match self {
            SyncError::InvalidDescriptor(_) => true,
            SyncError::Db(e) => e.is_validation(),
            SyncError::Aborted { source, .. } => source.is_validation(),
        }
    }
}

/// Errors loading the sync configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Config file not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors handing a task to a queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task queue is closed")]
    Closed,
}
