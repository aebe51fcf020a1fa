//! The reconciliation driver.
//!
//! One pass walks the descriptor batch in order: normalize, look up the stored
//! recording, skip it when nothing changed, upsert it otherwise. Each recording
//! commits on its own. After the batch, unreferenced playback types are removed
//! and, for a full sync, recordings the server no longer reports are marked
//! unavailable.
//!
//! Passes against the same server must be serialized by the caller.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{FailurePolicy, SyncConfig};
use crate::db::{DbRecording, RecordingsDb};
use crate::error::SyncError;

use super::changes::stored_recording_changed;
use super::descriptor::{Descriptor, RecordingData};
use super::queue::{MeetingStatsTask, StatsTaskQueue};
use super::rooms::{RoomByMeetingId, RoomMatcher};
use super::upsert::{upsert_recording, UpsertOutcome};

/// Whether a batch is the server's complete recording list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// A page or subset; nothing is marked unavailable.
    Partial,
    /// The complete list; stored recordings missing from it become unavailable.
    Full,
}

/// A recording the pass could not persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub recordid: Option<String>,
    pub error: String,
}

/// What one sync pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: usize,
    pub failed: Vec<SyncFailure>,
    pub playback_types_removed: usize,
    pub marked_unavailable: usize,
    pub stats_tasks_enqueued: usize,
}

impl SyncReport {
    /// Number of recordings written by the pass.
    pub fn written(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Reconciles recording descriptors from one server against the store.
pub struct RecordingSync {
    config: SyncConfig,
    queue: Arc<dyn StatsTaskQueue>,
    room_matcher: Box<dyn RoomMatcher>,
}

impl RecordingSync {
    /// A driver matching rooms by meeting id and publishing statistics tasks
    /// to `queue`.
    pub fn new(config: SyncConfig, queue: Arc<dyn StatsTaskQueue>) -> Self {
        Self {
            config,
            queue,
            room_matcher: Box::new(RoomByMeetingId),
        }
    }

    pub fn with_room_matcher(mut self, matcher: impl RoomMatcher + 'static) -> Self {
        self.room_matcher = Box::new(matcher);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Create or update the recording `descriptor` describes, without change
    /// detection.
    pub fn upsert(
        &self,
        db: &RecordingsDb,
        server_id: i64,
        descriptor: &Descriptor,
    ) -> Result<DbRecording, SyncError> {
        let data = RecordingData::from_descriptor(descriptor);
        let recordid = required_recordid(&data)?;
        let existing = db.get_recording_by_recordid(recordid)?;
        let (outcome, _) = self.persist(db, server_id, existing, &data)?;
        Ok(outcome.recording)
    }

    /// Run one reconciliation pass over `descriptors` for `server_id`.
    ///
    /// Per-recording failures are handled by the configured
    /// [`FailurePolicy`]. Cleanup and sweep failures end the pass with an
    /// error.
    pub fn sync(
        &self,
        db: &RecordingsDb,
        server_id: i64,
        descriptors: &[Descriptor],
        mode: SyncMode,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let mut seen: Vec<String> = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let data = RecordingData::from_descriptor(descriptor);
            log::debug!("Recording sync: processing {:?}", data.normalized);
            if let Some(recordid) = &data.recordid {
                seen.push(recordid.clone());
            }

            if let Err(e) = self.sync_one(db, server_id, &data, &mut report) {
                let recordid = data.recordid.clone();
                match self.config.failure_policy {
                    FailurePolicy::Continue => {
                        log::warn!(
                            "Recording sync: failed to sync {}: {}",
                            recordid.as_deref().unwrap_or("<no recordID>"),
                            e
                        );
                        report.failed.push(SyncFailure {
                            recordid,
                            error: e.to_string(),
                        });
                    }
                    FailurePolicy::Abort => {
                        return Err(SyncError::Aborted {
                            recordid: recordid.unwrap_or_default(),
                            source: Box::new(e),
                        });
                    }
                }
            }
        }

        report.playback_types_removed = db.cleanup_playback_types()?;

        if mode == SyncMode::Full {
            report.marked_unavailable = db.mark_unavailable_except(server_id, &seen)?;
            if report.marked_unavailable > 0 {
                log::info!(
                    "Recording sync: marked {} recordings of server {} unavailable",
                    report.marked_unavailable,
                    server_id
                );
            }
        }

        Ok(report)
    }

    fn sync_one(
        &self,
        db: &RecordingsDb,
        server_id: i64,
        data: &RecordingData,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let recordid = required_recordid(data)?;
        let existing = db.get_recording_by_recordid(recordid)?;

        let changed = match &existing {
            None => true,
            Some(stored) => {
                !stored.available
                    || stored.server_id != server_id
                    || stored_recording_changed(db, stored, data)?
            }
        };
        if !changed {
            log::debug!("Recording sync: {} unchanged", recordid);
            report.unchanged += 1;
            return Ok(());
        }

        let (outcome, queued) = self.persist(db, server_id, existing, data)?;
        if queued {
            report.stats_tasks_enqueued += 1;
        }
        if outcome.created {
            report.created.push(outcome.recording.recordid);
        } else {
            report.updated.push(outcome.recording.recordid);
        }
        Ok(())
    }

    /// Upsert, then hand the statistics task off once the recording is
    /// committed. A task that cannot be queued is logged, not fatal.
    ///
    /// The flag is true when a new statistics task reached the queue.
    fn persist(
        &self,
        db: &RecordingsDb,
        server_id: i64,
        existing: Option<DbRecording>,
        data: &RecordingData,
    ) -> Result<(UpsertOutcome, bool), SyncError> {
        let outcome = upsert_recording(
            db,
            &self.config,
            self.room_matcher.as_ref(),
            server_id,
            existing,
            data,
        )?;

        let queued = match &outcome.meeting {
            Some(meeting) => match self.queue.enqueue(MeetingStatsTask::new(meeting.id)) {
                Ok(queued) => queued,
                Err(e) => {
                    log::warn!(
                        "Recording sync: could not queue stats for meeting {}: {}",
                        meeting.id,
                        e
                    );
                    false
                }
            },
            None => false,
        };
        Ok((outcome, queued))
    }
}

fn required_recordid(data: &RecordingData) -> Result<&str, SyncError> {
    data.recordid
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| SyncError::InvalidDescriptor("missing recordID".to_string()))
}
