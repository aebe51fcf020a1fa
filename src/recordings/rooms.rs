//! Strategies for choosing the room a recording belongs to.

use crate::db::{DbError, RecordingsDb};

use super::descriptor::RecordingData;

/// Picks the room to associate with an incoming recording.
pub trait RoomMatcher: Send + Sync {
    fn match_room(&self, db: &RecordingsDb, data: &RecordingData) -> Result<Option<i64>, DbError>;
}

/// Any closure with the matcher's signature is a matcher.
impl<F> RoomMatcher for F
where
    F: Fn(&RecordingsDb, &RecordingData) -> Result<Option<i64>, DbError> + Send + Sync,
{
    fn match_room(&self, db: &RecordingsDb, data: &RecordingData) -> Result<Option<i64>, DbError> {
        self(db, data)
    }
}

/// The room whose meeting id equals the recording's meeting id.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoomByMeetingId;

impl RoomMatcher for RoomByMeetingId {
    fn match_room(&self, db: &RecordingsDb, data: &RecordingData) -> Result<Option<i64>, DbError> {
        let Some(meetingid) = data.meetingid.as_deref() else {
            return Ok(None);
        };
        Ok(db.find_room_by_meetingid(meetingid)?.map(|room| room.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use serde_json::json;

    fn data_for(meetingid: &str) -> RecordingData {
        let descriptor = json!({ "recordID": "rec-1", "meetingID": meetingid });
        match descriptor {
            serde_json::Value::Object(map) => RecordingData::from_descriptor(&map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_room_by_meeting_id() {
        let db = test_db();
        let room_id = db.insert_room("room-1", Some("Room 1")).expect("room");

        assert_eq!(
            RoomByMeetingId
                .match_room(&db, &data_for("room-1"))
                .expect("match"),
            Some(room_id)
        );
        assert_eq!(
            RoomByMeetingId
                .match_room(&db, &data_for("room-2"))
                .expect("match"),
            None
        );
    }

    #[test]
    fn test_closure_matcher() {
        let db = test_db();
        let fixed = |_: &RecordingsDb, _: &RecordingData| -> Result<Option<i64>, DbError> { Ok(Some(7)) };
        assert_eq!(
            fixed.match_room(&db, &data_for("anything")).expect("match"),
            Some(7)
        );
    }
}
