//! Replica state tracking.
//!
//! Tracks where a replica stands relative to the authority: the last
//! confirmed version, the local steps the authority has not confirmed yet,
//! and how many of those are currently on their way to it.

use crate::error::{CollabError, CollabResult};
use crate::protocol::LocalBatchMessage;
use folio_transform::{Rebaseable, Transaction};
use folio_types::{ClientId, Timestamp, Version};
use std::fmt;

/// Lifecycle of a collaboration client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first snapshot.
    Unsynced,
    Synced,
    /// Closed; pending steps were discarded.
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Unsynced => "unsynced",
            Phase::Synced => "synced",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Confirmed version and unconfirmed steps of one replica.
#[derive(Debug, Clone)]
pub struct ReplicaState {
    client_id: ClientId,
    version: Version,
    pending: Vec<Rebaseable>,
    /// Leading pending steps sent and awaiting their echo.
    in_flight: usize,
    rejections: u32,
    persisted: Option<(Version, Timestamp)>,
}

impl ReplicaState {
    pub fn new(client_id: ClientId, version: Version) -> Self {
        Self {
            client_id,
            version,
            pending: Vec::new(),
            in_flight: 0,
            rejections: 0,
            persisted: None,
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Last version confirmed by the authority.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Unconfirmed local steps, oldest first.
    pub fn pending(&self) -> &[Rebaseable] {
        &self.pending
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether a batch could be sent now: steps are pending and none are
    /// in flight.
    pub fn ready_to_send(&self) -> bool {
        self.in_flight == 0 && !self.pending.is_empty()
    }

    pub fn rejections(&self) -> u32 {
        self.rejections
    }

    /// Version and time of the last save the peer reported.
    pub fn persisted(&self) -> Option<(Version, Timestamp)> {
        self.persisted
    }

    /// Queues the steps of every document-changing transaction in `applied`.
    ///
    /// Returns the number of steps queued. Nothing is queued if any step
    /// cannot be inverted.
    pub fn queue(&mut self, applied: &[Transaction]) -> CollabResult<usize> {
        let steps = Self::rebaseable(applied)?;
        let queued = steps.len();
        self.pending.extend(steps);
        Ok(queued)
    }

    /// The steps of every document-changing transaction in `applied`, ready
    /// to be queued.
    pub fn rebaseable(applied: &[Transaction]) -> CollabResult<Vec<Rebaseable>> {
        let mut steps = Vec::new();
        for tr in applied.iter().filter(|tr| tr.doc_changed()) {
            for (step, doc) in tr.steps().iter().zip(tr.docs()) {
                let rebaseable = Rebaseable::new(step.clone(), doc, tr.id())
                    .map_err(|e| CollabError::Protocol(format!("local step not invertible: {e}")))?;
                steps.push(rebaseable);
            }
        }
        Ok(steps)
    }

    /// Builds the next outbound batch and marks it in flight.
    ///
    /// Returns `None` while a batch is in flight or nothing is pending.
    pub fn take_sendable(&mut self, max_steps: usize) -> Option<LocalBatchMessage> {
        if self.in_flight > 0 || self.pending.is_empty() {
            return None;
        }
        let count = self.pending.len().min(max_steps.max(1));
        self.in_flight = count;
        Some(LocalBatchMessage {
            version: self.version,
            steps: self.pending[..count].iter().map(|r| r.step.to_json()).collect(),
        })
    }

    /// The peer accepted the in-flight batch; its echo is on the way.
    pub fn accepted(&mut self) {
        self.rejections = 0;
    }

    /// The peer rejected the in-flight batch. Returns the number of
    /// consecutive rejections so far.
    pub fn rejected(&mut self) -> u32 {
        self.in_flight = 0;
        self.rejections += 1;
        self.rejections
    }

    /// The in-flight batch never reached the peer.
    pub fn send_failed(&mut self) {
        self.in_flight = 0;
    }

    /// Drops the first `count` pending steps, confirmed by the authority.
    pub fn confirm(&mut self, count: usize) -> Vec<Rebaseable> {
        self.in_flight = self.in_flight.saturating_sub(count);
        self.pending.drain(..count.min(self.pending.len())).collect()
    }

    /// Replaces the pending steps after a rebase.
    pub fn set_pending(&mut self, pending: Vec<Rebaseable>) {
        self.pending = pending;
    }

    pub fn extend_pending(&mut self, steps: impl IntoIterator<Item = Rebaseable>) {
        self.pending.extend(steps);
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn set_persisted(&mut self, version: Version, at: Timestamp) {
        self.persisted = Some((version, at));
    }

    /// Discards every pending step.
    pub fn clear(&mut self) -> usize {
        self.in_flight = 0;
        self.pending.drain(..).count()
    }
}
