use rusqlite::{params, OptionalExtension, Row};

use super::*;

const MEETING_COLUMNS: &str = "id, room_id, meetingid, name, create_time, running, recorded,
     ended, creator_id, creator_name, finish_time";

/// Maximum length of a meeting id accepted by the server.
const MAX_MEETINGID_LEN: usize = 100;

/// How a meeting's `create_time` is compared against a recording's start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTimeRule {
    /// `create_time == start`
    Exact,
    /// `create_time / 1000 == start`: create time in milliseconds, start in seconds.
    Milliseconds,
    /// `create_time / 10 == start / 10`: both truncated to ten-second buckets.
    Coarse,
}

fn map_meeting_row(row: &Row<'_>) -> rusqlite::Result<DbMeeting> {
    Ok(DbMeeting {
        id: row.get(0)?,
        room_id: row.get(1)?,
        meetingid: row.get(2)?,
        name: row.get(3)?,
        create_time: row.get(4)?,
        running: row.get(5)?,
        recorded: row.get(6)?,
        ended: row.get(7)?,
        creator_id: row.get(8)?,
        creator_name: row.get(9)?,
        finish_time: row.get(10)?,
    })
}

impl RecordingsDb {
    // =========================================================================
    // Meetings
    // =========================================================================

    /// Insert a meeting and return its id. `meeting.id` is ignored.
    pub fn insert_meeting(&self, meeting: &DbMeeting) -> Result<i64, DbError> {
        let len = meeting.meetingid.chars().count();
        if len == 0 || len > MAX_MEETINGID_LEN {
            return Err(DbError::Validation(format!(
                "meetingid must be 1 to {MAX_MEETINGID_LEN} characters, got {len}"
            )));
        }

        self.conn.execute(
            "INSERT INTO meetings (
                room_id, meetingid, name, create_time, running, recorded,
                ended, creator_id, creator_name, finish_time
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                meeting.room_id,
                meeting.meetingid,
                meeting.name,
                meeting.create_time,
                meeting.running,
                meeting.recorded,
                meeting.ended,
                meeting.creator_id,
                meeting.creator_name,
                meeting.finish_time,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_meeting(&self, id: i64) -> Result<Option<DbMeeting>, DbError> {
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1");
        let meeting = self
            .conn
            .query_row(&sql, params![id], map_meeting_row)
            .optional()?;
        Ok(meeting)
    }

    /// The most recently created meeting with `meetingid` whose create time
    /// satisfies `rule` against `start_time`.
    pub fn find_meeting_by_create_time(
        &self,
        meetingid: &str,
        start_time: i64,
        rule: CreateTimeRule,
    ) -> Result<Option<DbMeeting>, DbError> {
        let predicate = match rule {
            CreateTimeRule::Exact => "create_time = ?2",
            CreateTimeRule::Milliseconds => "create_time / 1000 = ?2",
            CreateTimeRule::Coarse => "create_time / 10 = ?2 / 10",
        };
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings
             WHERE meetingid = ?1 AND {predicate}
             ORDER BY id DESC
             LIMIT 1"
        );
        let meeting = self
            .conn
            .query_row(&sql, params![meetingid, start_time], map_meeting_row)
            .optional()?;
        Ok(meeting)
    }

    /// Delete a meeting and the recording it produced.
    pub fn delete_meeting(&self, id: i64) -> Result<bool, DbError> {
        self.with_transaction(|db| {
            let recording_ids: Vec<i64> = {
                let mut stmt = db
                    .conn
                    .prepare("SELECT id FROM recordings WHERE meeting_id = ?1")?;
                let rows = stmt.query_map(params![id], |row| row.get(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };
            for recording_id in recording_ids {
                db.delete_recording_rows(recording_id)?;
            }
            let affected = db
                .conn
                .execute("DELETE FROM meetings WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
    }
}
