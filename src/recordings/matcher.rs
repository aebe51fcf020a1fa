//! Meeting correlation: find the meeting that produced a recording.
//!
//! The server does not link recordings to meetings, so the link is inferred
//! from the meeting id plus the recording's start time compared with the
//! meeting's create time. Rules are tried from strictest to loosest and the
//! first one that finds a candidate wins; among candidates of one rule the
//! most recently created meeting is taken.

use crate::db::{CreateTimeRule, DbError, DbMeeting, DbRecording, RecordingsDb};

/// Rules in the order they are tried.
const MATCH_RULES: [CreateTimeRule; 3] = [
    CreateTimeRule::Exact,
    CreateTimeRule::Milliseconds,
    CreateTimeRule::Coarse,
];

/// Find the meeting that generated `recording`.
///
/// Returns `None` when the recording has no meeting id or start time, or when
/// no rule finds a candidate.
pub fn find_matching_meeting(
    db: &RecordingsDb,
    recording: &DbRecording,
) -> Result<Option<DbMeeting>, DbError> {
    let (Some(meetingid), Some(start_time)) = (recording.meetingid.as_deref(), recording.start_time)
    else {
        return Ok(None);
    };

    for rule in MATCH_RULES {
        if let Some(meeting) = db.find_meeting_by_create_time(meetingid, start_time, rule)? {
            log::info!(
                "Recording sync: meeting {} matched recording {} ({:?})",
                meeting.id,
                recording.recordid,
                rule
            );
            return Ok(Some(meeting));
        }
    }

    log::info!(
        "Recording sync: no meeting found for recording {}",
        recording.recordid
    );
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{meeting, test_db};

    fn recording(meetingid: Option<&str>, start_time: Option<i64>) -> DbRecording {
        let mut rec = DbRecording::new(1, "rec-1");
        rec.meetingid = meetingid.map(String::from);
        rec.start_time = start_time;
        rec
    }

    #[test]
    fn test_exact_match_preferred_over_milliseconds() {
        let db = test_db();
        // Inserted first so the millisecond candidate is the more recent row.
        let exact = db.insert_meeting(&meeting("m-1", 1_000)).expect("exact");
        db.insert_meeting(&meeting("m-1", 1_000_000)).expect("ms");

        let found = find_matching_meeting(&db, &recording(Some("m-1"), Some(1_000)))
            .expect("match")
            .expect("a meeting");
        assert_eq!(found.id, exact);
    }

    #[test]
    fn test_milliseconds_preferred_over_coarse() {
        let db = test_db();
        let ms = db.insert_meeting(&meeting("m-1", 1_000_500)).expect("ms");
        db.insert_meeting(&meeting("m-1", 1_003)).expect("coarse");

        let found = find_matching_meeting(&db, &recording(Some("m-1"), Some(1_000)))
            .expect("match")
            .expect("a meeting");
        assert_eq!(found.id, ms);
    }

    #[test]
    fn test_coarse_match_tolerates_skew() {
        let db = test_db();
        let coarse = db.insert_meeting(&meeting("m-1", 1_007)).expect("coarse");

        let found = find_matching_meeting(&db, &recording(Some("m-1"), Some(1_002)))
            .expect("match")
            .expect("a meeting");
        assert_eq!(found.id, coarse);

        assert!(find_matching_meeting(&db, &recording(Some("m-1"), Some(1_010)))
            .expect("match")
            .is_none());
    }

    #[test]
    fn test_ties_take_most_recent_meeting() {
        let db = test_db();
        db.insert_meeting(&meeting("m-1", 1_001)).expect("first");
        let latest = db.insert_meeting(&meeting("m-1", 1_004)).expect("second");

        let found = find_matching_meeting(&db, &recording(Some("m-1"), Some(1_000)))
            .expect("match")
            .expect("a meeting");
        assert_eq!(found.id, latest);
    }

    #[test]
    fn test_other_meetingid_never_matches() {
        let db = test_db();
        db.insert_meeting(&meeting("m-2", 1_000)).expect("other");
        assert!(find_matching_meeting(&db, &recording(Some("m-1"), Some(1_000)))
            .expect("match")
            .is_none());
    }

    #[test]
    fn test_missing_start_time_or_meetingid() {
        let db = test_db();
        db.insert_meeting(&meeting("m-1", 1_000)).expect("meeting");
        assert!(find_matching_meeting(&db, &recording(Some("m-1"), None))
            .expect("match")
            .is_none());
        assert!(find_matching_meeting(&db, &recording(None, Some(1_000)))
            .expect("match")
            .is_none());
    }
}
