use rusqlite::{params, OptionalExtension, Row};

use super::*;

const RECORDING_COLUMNS: &str = "id, server_id, room_id, meeting_id, recordid, meetingid, name,
     published, available, start_time, end_time, size, description,
     recording_users, created_at, updated_at";

fn map_recording_row(row: &Row<'_>) -> rusqlite::Result<DbRecording> {
    let users_json: String = row.get(13)?;
    let recording_users = serde_json::from_str(&users_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(DbRecording {
        id: row.get(0)?,
        server_id: row.get(1)?,
        room_id: row.get(2)?,
        meeting_id: row.get(3)?,
        recordid: row.get(4)?,
        meetingid: row.get(5)?,
        name: row.get(6)?,
        published: row.get(7)?,
        available: row.get(8)?,
        start_time: row.get(9)?,
        end_time: row.get(10)?,
        size: row.get(11)?,
        description: row.get(12)?,
        recording_users,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

impl RecordingsDb {
    // =========================================================================
    // Recordings
    // =========================================================================

    /// Look up a recording by its server-assigned `recordid`.
    pub fn get_recording_by_recordid(&self, recordid: &str) -> Result<Option<DbRecording>, DbError> {
        let sql = format!("SELECT {RECORDING_COLUMNS} FROM recordings WHERE recordid = ?1");
        let recording = self
            .conn
            .query_row(&sql, params![recordid], map_recording_row)
            .optional()?;
        Ok(recording)
    }

    /// Look up a recording by its local row id.
    pub fn get_recording(&self, id: i64) -> Result<Option<DbRecording>, DbError> {
        let sql = format!("SELECT {RECORDING_COLUMNS} FROM recordings WHERE id = ?1");
        let recording = self
            .conn
            .query_row(&sql, params![id], map_recording_row)
            .optional()?;
        Ok(recording)
    }

    /// All recordings fetched from `server_id`, oldest first.
    pub fn list_recordings_for_server(&self, server_id: i64) -> Result<Vec<DbRecording>, DbError> {
        let sql = format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings
             WHERE server_id = ?1
             ORDER BY start_time, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![server_id], map_recording_row)?;

        let mut recordings = Vec::new();
        for row in rows {
            recordings.push(row?);
        }
        Ok(recordings)
    }

    /// Published recordings across all servers, newest first.
    pub fn list_published_recordings(&self) -> Result<Vec<DbRecording>, DbError> {
        let sql = format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings
             WHERE published = 1
             ORDER BY start_time DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_recording_row)?;

        let mut recordings = Vec::new();
        for row in rows {
            recordings.push(row?);
        }
        Ok(recordings)
    }

    /// Insert a new recording row and return its id.
    pub fn insert_recording(&self, recording: &DbRecording) -> Result<i64, DbError> {
        if recording.recordid.trim().is_empty() {
            return Err(DbError::Validation("recordid can't be blank".to_string()));
        }
        let users_json = serde_json::to_string(&recording.recording_users)?;

        self.conn.execute(
            "INSERT INTO recordings (
                server_id, room_id, meeting_id, recordid, meetingid, name,
                published, available, start_time, end_time, size, description,
                recording_users, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                recording.server_id,
                recording.room_id,
                recording.meeting_id,
                recording.recordid,
                recording.meetingid,
                recording.name,
                recording.published,
                recording.available,
                recording.start_time,
                recording.end_time,
                recording.size,
                recording.description,
                users_json,
                recording.created_at,
                recording.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Persist every mutable column of an existing recording.
    pub fn update_recording(&self, recording: &DbRecording) -> Result<(), DbError> {
        if recording.recordid.trim().is_empty() {
            return Err(DbError::Validation("recordid can't be blank".to_string()));
        }
        let users_json = serde_json::to_string(&recording.recording_users)?;
        let now = chrono::Utc::now().to_rfc3339();

        let affected = self.conn.execute(
            "UPDATE recordings
             SET server_id = ?1,
                 room_id = ?2,
                 meeting_id = ?3,
                 recordid = ?4,
                 meetingid = ?5,
                 name = ?6,
                 published = ?7,
                 available = ?8,
                 start_time = ?9,
                 end_time = ?10,
                 size = ?11,
                 description = ?12,
                 recording_users = ?13,
                 updated_at = ?14
             WHERE id = ?15",
            params![
                recording.server_id,
                recording.room_id,
                recording.meeting_id,
                recording.recordid,
                recording.meetingid,
                recording.name,
                recording.published,
                recording.available,
                recording.start_time,
                recording.end_time,
                recording.size,
                recording.description,
                users_json,
                now,
                recording.id,
            ],
        )?;
        if affected == 0 {
            return Err(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        }
        Ok(())
    }

    /// Mark every available recording of `server_id` whose recordid is not in
    /// `keep` as unavailable. An empty `keep` marks all of them.
    ///
    /// Returns the number of recordings marked.
    pub fn mark_unavailable_except(&self, server_id: i64, keep: &[String]) -> Result<usize, DbError> {
        let keep_json = serde_json::to_string(keep)?;
        let affected = self.conn.execute(
            "UPDATE recordings
             SET available = 0, updated_at = ?3
             WHERE available = 1
               AND server_id = ?1
               AND recordid NOT IN (SELECT value FROM json_each(?2))",
            params![server_id, keep_json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(affected)
    }

    /// Delete a recording together with its metadata and playback formats.
    pub fn delete_recording(&self, id: i64) -> Result<bool, DbError> {
        self.with_transaction(|db| db.delete_recording_rows(id))
    }

    pub(super) fn delete_recording_rows(&self, id: i64) -> Result<bool, DbError> {
        self.delete_all_metadata(MetadataOwner::Recording(id))?;
        self.conn.execute(
            "DELETE FROM playback_formats WHERE recording_id = ?1",
            params![id],
        )?;
        let affected = self
            .conn
            .execute("DELETE FROM recordings WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Average recording size in bytes across all recordings (0 when there are none).
    pub fn overall_average_size(&self) -> Result<f64, DbError> {
        let avg: Option<f64> = self
            .conn
            .query_row("SELECT AVG(size) FROM recordings", [], |row| row.get(0))?;
        Ok(avg.unwrap_or(0.0))
    }
}
