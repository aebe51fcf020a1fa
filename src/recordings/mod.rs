//! Recording reconciliation.
//!
//! Keeps the local recording store consistent with the list of recordings a
//! conferencing server reports. See [`RecordingSync`] for the driver.

pub mod changes;
pub mod descriptor;
pub mod matcher;
pub mod queue;
pub mod rooms;
pub mod sync;
mod upsert;

pub use changes::{recording_changed, stored_recording_changed};
pub use descriptor::{normalize_descriptor, Descriptor, FormatData, RecordingData};
pub use matcher::find_matching_meeting;
pub use queue::{InMemoryStatsQueue, MeetingStatsTask, StatsTaskQueue, STATS_TASK_RETRIES};
pub use rooms::{RoomByMeetingId, RoomMatcher};
pub use sync::{RecordingSync, SyncFailure, SyncMode, SyncReport};
pub use upsert::UpsertOutcome;
