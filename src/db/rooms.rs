use rusqlite::{params, OptionalExtension, Row};

use super::*;
use crate::rooms::RoomOptions;

fn map_room_row(row: &Row<'_>) -> rusqlite::Result<DbRoom> {
    Ok(DbRoom {
        id: row.get(0)?,
        meetingid: row.get(1)?,
        name: row.get(2)?,
    })
}

impl RecordingsDb {
    // =========================================================================
    // Rooms
    // =========================================================================

    pub fn insert_room(&self, meetingid: &str, name: Option<&str>) -> Result<i64, DbError> {
        if meetingid.trim().is_empty() {
            return Err(DbError::Validation("room meetingid can't be blank".to_string()));
        }
        self.conn.execute(
            "INSERT INTO rooms (meetingid, name) VALUES (?1, ?2)",
            params![meetingid, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_room(&self, id: i64) -> Result<Option<DbRoom>, DbError> {
        let room = self
            .conn
            .query_row(
                "SELECT id, meetingid, name FROM rooms WHERE id = ?1",
                params![id],
                map_room_row,
            )
            .optional()?;
        Ok(room)
    }

    pub fn find_room_by_meetingid(&self, meetingid: &str) -> Result<Option<DbRoom>, DbError> {
        let room = self
            .conn
            .query_row(
                "SELECT id, meetingid, name FROM rooms WHERE meetingid = ?1",
                params![meetingid],
                map_room_row,
            )
            .optional()?;
        Ok(room)
    }

    // =========================================================================
    // Room options
    // =========================================================================

    pub fn get_room_options(&self, room_id: i64) -> Result<Option<RoomOptions>, DbError> {
        let options = self
            .conn
            .query_row(
                "SELECT room_id, default_layout FROM room_options WHERE room_id = ?1",
                params![room_id],
                |row| {
                    Ok(RoomOptions {
                        room_id: row.get(0)?,
                        default_layout: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(options)
    }

    /// Insert or replace the options of `options.room_id`.
    pub fn save_room_options(&self, options: &RoomOptions) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO room_options (room_id, default_layout)
             VALUES (?1, ?2)
             ON CONFLICT(room_id) DO UPDATE SET default_layout = excluded.default_layout",
            params![options.room_id, options.default_layout],
        )?;
        Ok(())
    }
}
