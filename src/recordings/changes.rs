//! Change detection between a stored recording and an incoming descriptor.
//!
//! Only the fields a sync actually writes and that are worth comparing are
//! considered: end_time, meetingid, metadata, playback, published, recordid,
//! size and start_time. Both sides are reduced to the same sorted, typed
//! shape and compared by value. Reporting "changed" when nothing changed only
//! costs a write; reporting "unchanged" for a real difference in one of these
//! fields would lose data, so every reduction errs towards "changed".

use crate::db::{DbError, DbMetadata, DbPlaybackFormat, DbRecording, MetadataOwner, RecordingsDb};

use super::descriptor::RecordingData;

/// The compared projection of a recording.
#[derive(Debug, PartialEq, Eq)]
struct Comparable {
    end_time: Option<i64>,
    meetingid: Option<String>,
    metadata: Vec<(String, Option<String>)>,
    /// (length, type, url), sorted.
    playback: Vec<(i64, String, Option<String>)>,
    published: bool,
    recordid: String,
    /// Bytes, so numeric and string sizes agree.
    size: i64,
    start_time: Option<i64>,
}

impl Comparable {
    fn from_stored(
        stored: &DbRecording,
        metadata: &[DbMetadata],
        formats: &[DbPlaybackFormat],
    ) -> Self {
        let mut meta: Vec<(String, Option<String>)> = metadata
            .iter()
            .map(|m| (m.name.clone(), m.content.clone()))
            .collect();
        meta.sort();

        let mut playback: Vec<(i64, String, Option<String>)> = formats
            .iter()
            .map(|f| {
                (
                    f.length,
                    f.format_type.clone().unwrap_or_default(),
                    f.url.clone(),
                )
            })
            .collect();
        playback.sort();

        Self {
            end_time: stored.end_time,
            meetingid: stored.meetingid.clone(),
            metadata: meta,
            playback,
            published: stored.published,
            recordid: stored.recordid.clone(),
            size: stored.size,
            start_time: stored.start_time,
        }
    }

    /// The projection `stored` would have after applying `incoming`. Scalar
    /// fields the descriptor does not carry keep their stored value, exactly
    /// as an update leaves them.
    fn from_incoming(incoming: &RecordingData, stored: &Comparable) -> Self {
        let mut metadata: Vec<(String, Option<String>)> = incoming
            .metadata
            .iter()
            .map(|(name, content)| (name.clone(), content.clone()))
            .collect();
        metadata.sort();

        let mut playback: Vec<(i64, String, Option<String>)> = incoming
            .formats
            .iter()
            .map(|f| (f.length, f.format_type.clone(), f.url.clone()))
            .collect();
        playback.sort();

        Self {
            end_time: incoming.end_time.or(stored.end_time),
            meetingid: incoming.meetingid.clone().or_else(|| stored.meetingid.clone()),
            metadata,
            playback,
            published: incoming.published.unwrap_or(stored.published),
            recordid: incoming
                .recordid
                .clone()
                .unwrap_or_else(|| stored.recordid.clone()),
            size: incoming.size_bytes().unwrap_or(stored.size),
            start_time: incoming.start_time.or(stored.start_time),
        }
    }
}

/// Whether `incoming` differs from the stored recording, its metadata and its
/// playback formats.
pub fn recording_changed(
    stored: &DbRecording,
    metadata: &[DbMetadata],
    formats: &[DbPlaybackFormat],
    incoming: &RecordingData,
) -> bool {
    let current = Comparable::from_stored(stored, metadata, formats);
    let wanted = Comparable::from_incoming(incoming, &current);
    current != wanted
}

/// Load the children of `stored` and run [`recording_changed`].
pub fn stored_recording_changed(
    db: &RecordingsDb,
    stored: &DbRecording,
    incoming: &RecordingData,
) -> Result<bool, DbError> {
    let metadata = db.get_metadata(MetadataOwner::Recording(stored.id))?;
    let formats = db.get_playback_formats(stored.id)?;
    Ok(recording_changed(stored, &metadata, &formats, incoming))
}
