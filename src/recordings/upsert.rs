//! Create or update one recording together with its metadata and playback
//! formats, inside a single transaction.

use crate::config::SyncConfig;
use crate::db::{DbError, DbMeeting, DbRecording, MetadataOwner, RecordingsDb};
use crate::error::SyncError;

use super::descriptor::{FormatData, RecordingData};
use super::matcher::find_matching_meeting;
use super::rooms::RoomMatcher;

/// Result of persisting one recording.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub recording: DbRecording,
    /// True when the recording did not exist before.
    pub created: bool,
    /// Meeting correlated on creation. Always `None` for updates.
    pub meeting: Option<DbMeeting>,
}

/// Persist `data` for `server_id`, creating the recording when `existing` is
/// `None` and updating it otherwise.
///
/// Everything happens in one transaction: either the recording and both of
/// its child sets are written, or nothing is.
pub(crate) fn upsert_recording(
    db: &RecordingsDb,
    config: &SyncConfig,
    room_matcher: &dyn RoomMatcher,
    server_id: i64,
    existing: Option<DbRecording>,
    data: &RecordingData,
) -> Result<UpsertOutcome, SyncError> {
    let recordid = data
        .recordid
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| SyncError::InvalidDescriptor("missing recordID".to_string()))?;

    db.with_transaction(|db| {
        let room_id = room_matcher.match_room(db, data)?;

        let outcome = match existing {
            None => {
                let mut recording = DbRecording::new(server_id, recordid);
                apply_fields(&mut recording, data);
                recording.room_id = room_id;
                recording.description = config.describe_start(recording.start_time);

                let meeting = find_matching_meeting(db, &recording)?;
                recording.meeting_id = meeting.as_ref().map(|m| m.id);
                recording.id = db.insert_recording(&recording)?;
                log::info!("Recording sync: created recording {}", recording.recordid);

                UpsertOutcome {
                    recording,
                    created: true,
                    meeting,
                }
            }
            Some(mut recording) => {
                apply_fields(&mut recording, data);
                recording.server_id = server_id;
                recording.room_id = room_id;
                db.update_recording(&recording)?;
                log::info!("Recording sync: updated recording {}", recording.recordid);

                UpsertOutcome {
                    recording,
                    created: false,
                    meeting: None,
                }
            }
        };

        let recording_id = outcome.recording.id;
        db.sync_metadata(MetadataOwner::Recording(recording_id), &data.metadata)?;
        sync_playback_formats(db, config, recording_id, &data.formats)?;
        Ok(outcome)
    })
}

/// Copy the whitelisted fields the descriptor carries onto `recording`.
fn apply_fields(recording: &mut DbRecording, data: &RecordingData) {
    if let Some(meetingid) = &data.meetingid {
        recording.meetingid = Some(meetingid.clone());
    }
    if let Some(name) = &data.name {
        recording.name = Some(name.clone());
    }
    if let Some(published) = data.published {
        recording.published = published;
    }
    if let Some(start_time) = data.start_time {
        recording.start_time = Some(start_time);
    }
    if let Some(end_time) = data.end_time {
        recording.end_time = Some(end_time);
    }
    if let Some(size) = data.size_bytes() {
        recording.size = size;
    }
    recording.available = true;
    recording.recording_users = data.recording_users.clone().unwrap_or_default();
}

/// Replace every playback format of `recording_id` with `formats`, creating
/// playback types that were never seen before.
fn sync_playback_formats(
    db: &RecordingsDb,
    config: &SyncConfig,
    recording_id: i64,
    formats: &[FormatData],
) -> Result<(), DbError> {
    db.delete_playback_formats(recording_id)?;
    for format in formats {
        let playback_type = match db.find_playback_type(&format.format_type)? {
            Some(existing) => existing,
            None => {
                log::info!(
                    "Recording sync: new playback type {}",
                    format.format_type
                );
                db.insert_playback_type(
                    &format.format_type,
                    config.is_downloadable(&format.format_type),
                )?
            }
        };
        db.insert_playback_format(
            recording_id,
            playback_type.id,
            format.url.as_deref(),
            format.length,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{meeting, test_db};
    use crate::db::RecordingUser;
    use crate::recordings::rooms::RoomByMeetingId;
    use serde_json::{json, Value};

    fn data(value: Value) -> RecordingData {
        match value {
            Value::Object(map) => RecordingData::from_descriptor(&map),
            _ => panic!("descriptor fixtures must be objects"),
        }
    }

    fn create(db: &RecordingsDb, config: &SyncConfig, value: Value) -> UpsertOutcome {
        upsert_recording(db, config, &RoomByMeetingId, 1, None, &data(value)).expect("create")
    }

    #[test]
    fn test_create_sets_fields_and_children() {
        let db = test_db();
        let room_id = db.insert_room("meeting-1", None).expect("room");
        let meeting_id = db.insert_meeting(&meeting("meeting-1", 1_000)).expect("meeting");

        let outcome = create(
            &db,
            &SyncConfig::default(),
            json!({
                "recordID": "rec-1",
                "meetingID": "meeting-1",
                "name": "Weekly",
                "published": true,
                "startTime": 1000,
                "endTime": 2000,
                "size": "500",
                "metadata": {"title": "Weekly"},
                "playback": {"format": {"type": "presentation", "url": "p1", "length": 5}},
                "recordingUsers": {"user": [{"externalUserID": "42"}, {"externalUserID": "abc"}]}
            }),
        );

        assert!(outcome.created);
        assert_eq!(outcome.meeting.as_ref().map(|m| m.id), Some(meeting_id));

        let stored = db
            .get_recording_by_recordid("rec-1")
            .expect("query")
            .expect("stored");
        assert_eq!(stored.room_id, Some(room_id));
        assert_eq!(stored.meeting_id, Some(meeting_id));
        assert!(stored.available);
        assert!(stored.published);
        assert_eq!(stored.size, 500);
        assert_eq!(
            stored.description.as_deref(),
            Some("Meeting held on January 01, 1970 00:16")
        );
        assert_eq!(
            stored.recording_users,
            vec![RecordingUser::Id(42), RecordingUser::External("abc".to_string())]
        );

        let metadata = db
            .get_metadata(MetadataOwner::Recording(stored.id))
            .expect("metadata");
        assert_eq!(metadata.len(), 1);
        let formats = db.get_playback_formats(stored.id).expect("formats");
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].format_type.as_deref(), Some("presentation"));
    }

    #[test]
    fn test_update_keeps_absent_scalars_and_skips_meeting() {
        let db = test_db();
        let config = SyncConfig::default();
        let created = create(
            &db,
            &config,
            json!({"recordID": "rec-1", "name": "Weekly", "startTime": 1000, "size": 10}),
        );
        db.insert_meeting(&meeting("meeting-1", 1_000)).expect("meeting");

        let outcome = upsert_recording(
            &db,
            &config,
            &RoomByMeetingId,
            1,
            Some(created.recording),
            &data(json!({"recordID": "rec-1", "meetingID": "meeting-1", "published": true})),
        )
        .expect("update");

        assert!(!outcome.created);
        assert!(outcome.meeting.is_none());
        let stored = db
            .get_recording_by_recordid("rec-1")
            .expect("query")
            .expect("stored");
        assert_eq!(stored.name.as_deref(), Some("Weekly"));
        assert_eq!(stored.size, 10);
        assert!(stored.published);
        assert_eq!(stored.meetingid.as_deref(), Some("meeting-1"));
        assert_eq!(stored.meeting_id, None);
    }

    #[test]
    fn test_update_moves_recording_to_reporting_server() {
        let db = test_db();
        let config = SyncConfig::default();
        let created = create(&db, &config, json!({"recordID": "rec-1", "size": 10}));
        assert_eq!(created.recording.server_id, 1);

        let outcome = upsert_recording(
            &db,
            &config,
            &RoomByMeetingId,
            2,
            Some(created.recording),
            &data(json!({"recordID": "rec-1", "size": 20})),
        )
        .expect("update");

        assert_eq!(outcome.recording.server_id, 2);
        let stored = db
            .get_recording_by_recordid("rec-1")
            .expect("query")
            .expect("stored");
        assert_eq!(stored.server_id, 2);
    }

    #[test]
    fn test_new_playback_types_follow_downloadable_config() {
        let db = test_db();
        let config = SyncConfig {
            downloadable_playback_types: vec!["video".to_string()],
            ..SyncConfig::default()
        };
        create(
            &db,
            &config,
            json!({
                "recordID": "rec-1",
                "playback": {"format": [
                    {"type": "video", "url": "v1", "length": 1},
                    {"type": "presentation", "url": "p1", "length": 1}
                ]}
            }),
        );

        let video = db.find_playback_type("video").expect("query").expect("video");
        let presentation = db
            .find_playback_type("presentation")
            .expect("query")
            .expect("presentation");
        assert!(video.downloadable && video.visible);
        assert!(!presentation.downloadable && presentation.visible);
    }

    #[test]
    fn test_failure_rolls_back_whole_recording() {
        let db = test_db();
        let failing = |_: &RecordingsDb, _: &RecordingData| -> Result<Option<i64>, DbError> {
            Err(DbError::Validation("room lookup failed".to_string()))
        };

        let result = upsert_recording(
            &db,
            &SyncConfig::default(),
            &failing,
            1,
            None,
            &data(json!({"recordID": "rec-1", "metadata": {"a": "1"}})),
        );
        assert!(matches!(result, Err(SyncError::Db(DbError::Validation(_)))));
        assert!(db.get_recording_by_recordid("rec-1").expect("query").is_none());
    }

    #[test]
    fn test_missing_recordid_is_invalid() {
        let db = test_db();
        let result = upsert_recording(
            &db,
            &SyncConfig::default(),
            &RoomByMeetingId,
            1,
            None,
            &data(json!({"meetingID": "meeting-1"})),
        );
        assert!(matches!(result, Err(SyncError::InvalidDescriptor(_))));
    }
}
