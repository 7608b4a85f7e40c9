//! Flush scheduling.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Spaces outbound flushes at least `interval` apart.
///
/// The first edit after a quiet period flushes at once; edits arriving
/// within the interval are coalesced into one trailing flush at the end of
/// it. Scheduling while a flush is already due is a no-op, so a trailing
/// flush is never lost and never duplicated.
#[derive(Debug, Clone)]
pub struct FlushThrottle {
    interval: Duration,
    last_flush: Option<Instant>,
    deadline: Option<Instant>,
}

impl FlushThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_flush: None,
            deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Asks for a flush no earlier than the interval allows.
    pub fn schedule(&mut self, now: Instant) {
        if self.deadline.is_some() {
            return;
        }
        let earliest = self.last_flush.map_or(now, |last| last + self.interval);
        self.deadline = Some(earliest.max(now));
    }

    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a scheduled flush is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// Completes when the scheduled flush is due. Never completes when
    /// nothing is scheduled.
    pub async fn wait(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    /// Records a flush at `now` and clears the schedule.
    pub fn flushed(&mut self, now: Instant) {
        self.deadline = None;
        self.last_flush = Some(now);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
