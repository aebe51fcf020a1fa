//! SQLite-backed store for recordings, their metadata and playback formats,
//! and the meetings and rooms they are correlated with.
//!
//! The database lives at `~/.bbb-recordings/recordings.db` unless a path is
//! configured. Every table family has its own file with an `impl RecordingsDb`
//! block; this module owns the connection and transaction scoping.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

mod meetings;
mod metadata;
mod playback;
mod recordings;
mod rooms;
pub mod types;
pub use meetings::CreateTimeRule;
pub use types::*;

pub struct RecordingsDb {
    conn: Connection,
}

impl RecordingsDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(DbError::from)?;
        match f(self) {
            Ok(val) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(DbError::from(e).into());
                }
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the default location and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.bbb-recordings/recordings.db`.
    pub fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".bbb-recordings").join("recordings.db"))
    }
}
