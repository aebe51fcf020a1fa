//! Hand-off of "fetch meeting statistics" work to an external worker.
//!
//! The sync only publishes tasks; it never waits for them. Hosts plug in
//! whatever queue their worker drains by implementing [`StatsTaskQueue`].

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Retries granted to a statistics task published by the sync.
pub const STATS_TASK_RETRIES: u32 = 2;

/// Request to fetch the statistics of one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingStatsTask {
    pub meeting_id: i64,
    pub retries: u32,
}

impl MeetingStatsTask {
    pub fn new(meeting_id: i64) -> Self {
        Self {
            meeting_id,
            retries: STATS_TASK_RETRIES,
        }
    }
}

/// Destination for statistics tasks.
pub trait StatsTaskQueue: Send + Sync {
    /// Hand `task` to the worker. `Ok(false)` means an equivalent task was
    /// already waiting and nothing new was queued.
    fn enqueue(&self, task: MeetingStatsTask) -> Result<bool, QueueError>;
}

/// Feeds an async worker running on the same runtime.
impl StatsTaskQueue for tokio::sync::mpsc::UnboundedSender<MeetingStatsTask> {
    fn enqueue(&self, task: MeetingStatsTask) -> Result<bool, QueueError> {
        self.send(task).map_err(|_| QueueError::Closed)?;
        Ok(true)
    }
}

/// Thread-safe FIFO of statistics tasks, drained by the host.
///
/// Duplicate requests for a meeting already waiting in the queue are dropped.
#[derive(Default)]
pub struct InMemoryStatsQueue {
    queue: Mutex<VecDeque<MeetingStatsTask>>,
}

impl InMemoryStatsQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued task, oldest first.
    pub fn drain(&self) -> Vec<MeetingStatsTask> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatsTaskQueue for InMemoryStatsQueue {
    fn enqueue(&self, task: MeetingStatsTask) -> Result<bool, QueueError> {
        let mut queue = self.queue.lock();
        if queue.iter().any(|t| t.meeting_id == task.meeting_id) {
            log::debug!("StatsQueue: meeting {} already queued", task.meeting_id);
            return Ok(false);
        }
        log::info!("StatsQueue: enqueued meeting {}", task.meeting_id);
        queue.push_back(task);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_queue_fifo_and_dedup() {
        let queue = InMemoryStatsQueue::new();
        assert!(queue.enqueue(MeetingStatsTask::new(1)).expect("enqueue"));
        assert!(queue.enqueue(MeetingStatsTask::new(2)).expect("enqueue"));
        assert!(!queue.enqueue(MeetingStatsTask::new(1)).expect("enqueue dup"));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![MeetingStatsTask::new(1), MeetingStatsTask::new(2)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_task_carries_fixed_retries() {
        assert_eq!(MeetingStatsTask::new(9).retries, 2);
    }

    #[test]
    fn test_unbounded_sender_queue() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(tx.enqueue(MeetingStatsTask::new(5)).expect("send"));
        assert_eq!(rx.try_recv().expect("task"), MeetingStatsTask::new(5));

        drop(rx);
        assert!(matches!(
            tx.enqueue(MeetingStatsTask::new(6)),
            Err(QueueError::Closed)
        ));
    }
}
