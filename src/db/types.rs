use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    /// True when the error comes from a constraint or field validation rather
    /// than from the store being unreachable.
    pub fn is_validation(&self) -> bool {
        match self {
            DbError::Validation(_) => true,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

/// One participant of a recording, as reported by the server.
///
/// External ids that parse as integers are stored as numbers, anything else
/// is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordingUser {
    Id(i64),
    External(String),
}

/// A row from the `recordings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbRecording {
    pub id: i64,
    pub server_id: i64,
    pub room_id: Option<i64>,
    pub meeting_id: Option<i64>,
    pub recordid: String,
    pub meetingid: Option<String>,
    pub name: Option<String>,
    pub published: bool,
    pub available: bool,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub size: i64,
    pub description: Option<String>,
    pub recording_users: Vec<RecordingUser>,
    pub created_at: String,
    pub updated_at: String,
}

impl DbRecording {
    /// A not-yet-persisted recording (`id == 0`) for `server_id`.
    pub fn new(server_id: i64, recordid: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0,
            server_id,
            room_id: None,
            meeting_id: None,
            recordid: recordid.to_string(),
            meetingid: None,
            name: None,
            published: false,
            available: true,
            start_time: None,
            end_time: None,
            size: 0,
            description: None,
            recording_users: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Owner of a metadata row. Stored as `(owner_type, owner_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataOwner {
    Recording(i64),
    Room(i64),
}

impl MetadataOwner {
    pub fn owner_type(&self) -> &'static str {
        match self {
            MetadataOwner::Recording(_) => "recording",
            MetadataOwner::Room(_) => "room",
        }
    }

    pub fn owner_id(&self) -> i64 {
        match self {
            MetadataOwner::Recording(id) | MetadataOwner::Room(id) => *id,
        }
    }
}

/// A row from the `metadata` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMetadata {
    pub id: i64,
    pub name: String,
    pub content: Option<String>,
}

/// A row from the `playback_types` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPlaybackType {
    pub id: i64,
    pub identifier: String,
    pub visible: bool,
    pub is_default: bool,
    pub downloadable: bool,
}

/// A row from the `playback_formats` table, joined with its type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPlaybackFormat {
    pub id: i64,
    pub recording_id: i64,
    pub playback_type_id: Option<i64>,
    /// Identifier of the playback type (`presentation`, `video`, ...).
    pub format_type: Option<String>,
    pub url: Option<String>,
    /// Length in minutes.
    pub length: i64,
}

impl DbPlaybackFormat {
    /// The playback URL with `token=<token>` appended, or `None` when there is
    /// no usable URL or token.
    pub fn url_with_token(&self, token: &str) -> Option<String> {
        if token.trim().is_empty() {
            return None;
        }
        let raw = self.url.as_deref()?;
        let parsed = url::Url::parse(raw).ok()?;
        let separator = match parsed.query() {
            Some(q) if !q.is_empty() => "&",
            _ if raw.ends_with('?') => "",
            _ => "?",
        };
        Some(format!("{raw}{separator}token={token}"))
    }
}

/// A row from the `meetings` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMeeting {
    pub id: i64,
    pub room_id: Option<i64>,
    pub meetingid: String,
    pub name: Option<String>,
    pub create_time: i64,
    pub running: bool,
    pub recorded: bool,
    pub ended: bool,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
    pub finish_time: Option<i64>,
}

impl DbMeeting {
    /// Whether the meeting was created by the user identified by `user_id`.
    pub fn created_by(&self, user_id: Option<&str>) -> bool {
        match (user_id, self.creator_id.as_deref()) {
            (Some(user), Some(creator)) => user == creator,
            _ => false,
        }
    }
}

/// A row from the `rooms` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbRoom {
    pub id: i64,
    pub meetingid: String,
    pub name: Option<String>,
}
