use rusqlite::{params, OptionalExtension, Row};

use super::*;

fn map_playback_type_row(row: &Row<'_>) -> rusqlite::Result<DbPlaybackType> {
    Ok(DbPlaybackType {
        id: row.get(0)?,
        identifier: row.get(1)?,
        visible: row.get(2)?,
        is_default: row.get(3)?,
        downloadable: row.get(4)?,
    })
}

fn map_playback_format_row(row: &Row<'_>) -> rusqlite::Result<DbPlaybackFormat> {
    Ok(DbPlaybackFormat {
        id: row.get(0)?,
        recording_id: row.get(1)?,
        playback_type_id: row.get(2)?,
        format_type: row.get(3)?,
        url: row.get(4)?,
        length: row.get(5)?,
    })
}

impl RecordingsDb {
    // =========================================================================
    // Playback types
    // =========================================================================

    pub fn find_playback_type(&self, identifier: &str) -> Result<Option<DbPlaybackType>, DbError> {
        let playback_type = self
            .conn
            .query_row(
                "SELECT id, identifier, visible, is_default, downloadable
                 FROM playback_types
                 WHERE identifier = ?1",
                params![identifier],
                map_playback_type_row,
            )
            .optional()?;
        Ok(playback_type)
    }

    /// Insert a playback type. New types are always visible.
    pub fn insert_playback_type(
        &self,
        identifier: &str,
        downloadable: bool,
    ) -> Result<DbPlaybackType, DbError> {
        if identifier.trim().is_empty() {
            return Err(DbError::Validation(
                "playback type identifier can't be blank".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO playback_types (identifier, visible, is_default, downloadable)
             VALUES (?1, 1, 0, ?2)",
            params![identifier, downloadable],
        )?;
        Ok(DbPlaybackType {
            id: self.conn.last_insert_rowid(),
            identifier: identifier.to_string(),
            visible: true,
            is_default: false,
            downloadable,
        })
    }

    pub fn list_playback_types(&self) -> Result<Vec<DbPlaybackType>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, identifier, visible, is_default, downloadable
             FROM playback_types
             ORDER BY identifier",
        )?;
        let rows = stmt.query_map([], map_playback_type_row)?;

        let mut types = Vec::new();
        for row in rows {
            types.push(row?);
        }
        Ok(types)
    }

    /// Flag `identifier` as the default playback type, clearing the flag on
    /// every other type. Returns false when no such type exists.
    pub fn set_default_playback_type(&self, identifier: &str) -> Result<bool, DbError> {
        self.with_transaction(|db| {
            let exists = db.find_playback_type(identifier)?.is_some();
            if !exists {
                return Ok(false);
            }
            db.conn.execute(
                "UPDATE playback_types SET is_default = (identifier = ?1)",
                params![identifier],
            )?;
            Ok(true)
        })
    }

    /// Delete every playback type no playback format references anymore.
    pub fn cleanup_playback_types(&self) -> Result<usize, DbError> {
        let affected = self.conn.execute(
            "DELETE FROM playback_types
             WHERE id NOT IN (
                 SELECT DISTINCT playback_type_id FROM playback_formats
                 WHERE playback_type_id IS NOT NULL
             )",
            [],
        )?;
        Ok(affected)
    }

    // =========================================================================
    // Playback formats
    // =========================================================================

    /// Formats of a recording with their type identifiers, in insertion order.
    pub fn get_playback_formats(&self, recording_id: i64) -> Result<Vec<DbPlaybackFormat>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.recording_id, f.playback_type_id, t.identifier, f.url, f.length
             FROM playback_formats f
             LEFT JOIN playback_types t ON t.id = f.playback_type_id
             WHERE f.recording_id = ?1
             ORDER BY f.id",
        )?;
        let rows = stmt.query_map(params![recording_id], map_playback_format_row)?;

        let mut formats = Vec::new();
        for row in rows {
            formats.push(row?);
        }
        Ok(formats)
    }

    pub fn insert_playback_format(
        &self,
        recording_id: i64,
        playback_type_id: i64,
        url: Option<&str>,
        length: i64,
    ) -> Result<i64, DbError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO playback_formats (recording_id, playback_type_id, url, length)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![recording_id, playback_type_id, url, length])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_playback_formats(&self, recording_id: i64) -> Result<usize, DbError> {
        let affected = self.conn.execute(
            "DELETE FROM playback_formats WHERE recording_id = ?1",
            params![recording_id],
        )?;
        Ok(affected)
    }

    /// The format of `recording_id` whose playback type is flagged default.
    pub fn default_playback_format(
        &self,
        recording_id: i64,
    ) -> Result<Option<DbPlaybackFormat>, DbError> {
        let format = self
            .conn
            .query_row(
                "SELECT f.id, f.recording_id, f.playback_type_id, t.identifier, f.url, f.length
                 FROM playback_formats f
                 INNER JOIN playback_types t ON t.id = f.playback_type_id
                 WHERE f.recording_id = ?1 AND t.is_default = 1
                 ORDER BY f.id
                 LIMIT 1",
                params![recording_id],
                map_playback_format_row,
            )
            .optional()?;
        Ok(format)
    }

    /// Average length of all recordings in seconds, measured on the default
    /// playback type. Lengths are stored in minutes; the minute average is
    /// truncated to two decimals before conversion. 0 when nothing qualifies.
    pub fn overall_average_length(&self) -> Result<f64, DbError> {
        let avg: Option<f64> = self.conn.query_row(
            "SELECT AVG(f.length)
             FROM playback_formats f
             INNER JOIN playback_types t ON t.id = f.playback_type_id
             WHERE t.is_default = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(avg
            .map(|minutes| (minutes * 100.0).trunc() / 100.0 * 60.0)
            .unwrap_or(0.0))
    }
}
