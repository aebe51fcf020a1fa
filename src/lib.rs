//! Reconciles the recordings a BigBlueButton server reports into a local
//! SQLite store: recordings, their metadata and playback formats, and the
//! meetings they came from.

pub mod config;
pub mod db;
pub mod error;
mod migrations;
pub mod recordings;
pub mod rooms;

pub use config::{FailurePolicy, SyncConfig};
pub use db::RecordingsDb;
pub use error::{ConfigError, QueueError, SyncError};
pub use recordings::{RecordingSync, SyncMode, SyncReport};
