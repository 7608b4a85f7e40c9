//! The collaboration client: one replica's side of the step protocol.
//!
//! [`CollabClient`] is a plain state machine. It never does I/O; the
//! session (or a test) feeds it inbound messages and asks it for outbound
//! batches. Every handler runs to completion on `&mut self`, so there is no
//! interleaving to reason about.

use crate::config::CollabConfig;
use crate::error::{CollabError, CollabResult};
use crate::protocol::{
    Ack, InboundMessage, LocalBatchMessage, PersistenceNotice, RemoteBatchMessage, SaveRequest, SnapshotMessage,
};
use crate::state::{Phase, ReplicaState};
use folio_extension::{Command, Editor, EditorConfig, Extension, ExtensionResult, PlainExtension};
use folio_model::Node;
use folio_transform::{rebase_steps, Step, Transaction, META_ADD_TO_HISTORY, META_REBASED, META_REMOTE};
use folio_types::{ClientId, Version};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the extension the client adds to gate local edits.
pub const COLLAB_EXTENSION: &str = "collab";

/// What a remote batch did to the replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteOutcome {
    /// Steps skipped because the replica had already seen them.
    pub skipped: usize,
    /// Pending local steps confirmed by the batch.
    pub confirmed: usize,
    /// Steps from other clients applied to the document.
    pub applied: usize,
    /// Pending steps that survived rebasing.
    pub rebased: usize,
    /// Pending steps dropped because they no longer applied.
    pub dropped: usize,
    /// Steps appended by plugins in reaction, queued as local steps.
    pub appended: usize,
}

impl RemoteOutcome {
    pub fn doc_changed(&self) -> bool {
        self.applied > 0 || self.appended > 0
    }
}

/// Result of feeding an inbound message to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientUpdate {
    Synced,
    Remote(RemoteOutcome),
    Persisted { editable_changed: bool },
}

enum Replica {
    Unsynced,
    Synced { editor: Editor, state: ReplicaState },
    Closed,
}

/// A collaborating replica of one document.
///
/// Created unsynced; the first snapshot builds the editor. Local edits go
/// through [`edit`](CollabClient::edit) and friends so their steps are
/// queued for the authority.
pub struct CollabClient {
    extensions: Vec<Extension>,
    editor_config: EditorConfig,
    config: CollabConfig,
    writable: Arc<AtomicBool>,
    replica: Replica,
}

impl CollabClient {
    pub fn new(extensions: Vec<Extension>, editor_config: EditorConfig, config: CollabConfig) -> Self {
        Self {
            extensions,
            editor_config,
            config,
            writable: Arc::new(AtomicBool::new(false)),
            replica: Replica::Unsynced,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.replica {
            Replica::Unsynced => Phase::Unsynced,
            Replica::Synced { .. } => Phase::Synced,
            Replica::Closed => Phase::Closed,
        }
    }

    pub fn config(&self) -> &CollabConfig {
        &self.config
    }

    /// Whether the peer currently allows local edits.
    pub fn writable(&self) -> bool {
        self.writable.load(Ordering::Acquire)
    }

    pub fn editor(&self) -> Option<&Editor> {
        match &self.replica {
            Replica::Synced { editor, .. } => Some(editor),
            _ => None,
        }
    }

    pub fn doc(&self) -> Option<&Node> {
        self.editor().map(Editor::doc)
    }

    pub fn state(&self) -> Option<&ReplicaState> {
        match &self.replica {
            Replica::Synced { state, .. } => Some(state),
            _ => None,
        }
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.state().map(ReplicaState::client_id)
    }

    pub fn version(&self) -> Option<Version> {
        self.state().map(ReplicaState::version)
    }

    /// Whether pending steps are waiting and no batch is in flight.
    pub fn ready_to_send(&self) -> bool {
        self.state().is_some_and(ReplicaState::ready_to_send)
    }

    fn unavailable(&self) -> CollabError {
        match self.replica {
            Replica::Closed => CollabError::Closed,
            _ => CollabError::NotSynced,
        }
    }

    fn synced_mut(&mut self) -> CollabResult<(&mut Editor, &mut ReplicaState)> {
        match &mut self.replica {
            Replica::Synced { editor, state } => Ok((editor, state)),
            Replica::Unsynced => Err(CollabError::NotSynced),
            Replica::Closed => Err(CollabError::Closed),
        }
    }

    /// Feeds one inbound message to the matching handler.
    pub fn receive(&mut self, message: InboundMessage) -> CollabResult<ClientUpdate> {
        match message {
            InboundMessage::Snapshot(snapshot) => self.receive_snapshot(snapshot).map(|()| ClientUpdate::Synced),
            InboundMessage::RemoteBatch(batch) => self.receive_remote_batch(batch).map(ClientUpdate::Remote),
            InboundMessage::PersistenceNotice(notice) => self
                .receive_persistence_notice(notice)
                .map(|editable_changed| ClientUpdate::Persisted { editable_changed }),
        }
    }

    /// Builds the editor from a snapshot and starts tracking its version.
    ///
    /// A later snapshot replaces the replica, but only while no local step
    /// is waiting for confirmation.
    pub fn receive_snapshot(&mut self, snapshot: SnapshotMessage) -> CollabResult<()> {
        match &self.replica {
            Replica::Closed => return Err(CollabError::Closed),
            Replica::Synced { state, .. } if !state.pending().is_empty() => {
                return Err(CollabError::ResyncRequired {
                    pending: state.pending().len(),
                });
            }
            _ => {}
        }

        let writable = Arc::clone(&self.writable);
        let gate = PlainExtension::new(COLLAB_EXTENSION).editable(move |_| writable.load(Ordering::Acquire));
        let mut extensions = Vec::with_capacity(self.extensions.len() + 1);
        extensions.push(Extension::from(gate));
        extensions.extend(self.extensions.iter().cloned());
        let editor = Editor::with_document(extensions, self.editor_config.clone(), snapshot.doc)?;

        self.writable.store(snapshot.writable, Ordering::Release);
        info!(
            client_id = %snapshot.client_id,
            version = %snapshot.version,
            writable = snapshot.writable,
            "snapshot received"
        );
        self.replica = Replica::Synced {
            editor,
            state: ReplicaState::new(snapshot.client_id, snapshot.version),
        };
        Ok(())
    }

    /// Applies a batch of confirmed steps.
    ///
    /// Already-seen steps are skipped. The batch's leading steps from this
    /// client confirm pending steps; the rest are applied with the pending
    /// steps rebased on top. Nothing changes if any step is malformed.
    pub fn receive_remote_batch(&mut self, batch: RemoteBatchMessage) -> CollabResult<RemoteOutcome> {
        let (editor, state) = self.synced_mut()?;

        if batch.steps.len() != batch.client_ids.len() {
            return Err(CollabError::Protocol(format!(
                "batch has {} steps but {} client IDs",
                batch.steps.len(),
                batch.client_ids.len()
            )));
        }
        let base = batch.base().ok_or_else(|| {
            CollabError::Protocol(format!("{} steps cannot end at {}", batch.steps.len(), batch.version))
        })?;
        let local = state.version();
        if batch.version <= local {
            debug!(version = %batch.version, local = %local, "batch already seen");
            return Ok(RemoteOutcome {
                skipped: batch.steps.len(),
                ..RemoteOutcome::default()
            });
        }
        let skipped = local.steps_since(base).ok_or(CollabError::VersionGap { local, base })?;

        let steps = batch.steps[skipped..]
            .iter()
            .map(|json| Step::from_json(editor.schema(), json))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CollabError::Protocol(format!("invalid remote step: {e}")))?;
        let client_id = state.client_id();
        let own = batch.client_ids[skipped..]
            .iter()
            .take_while(|id| **id == client_id)
            .count();
        if own > state.pending().len() {
            return Err(CollabError::Protocol(format!(
                "batch confirms {own} steps but only {} are pending",
                state.pending().len()
            )));
        }

        let foreign = &steps[own..];
        let remaining = &state.pending()[own..];
        let mut outcome = RemoteOutcome {
            skipped,
            confirmed: own,
            applied: foreign.len(),
            ..RemoteOutcome::default()
        };

        // Everything fallible runs before the replica is touched.
        let mut update = None;
        let mut follow_ups = Vec::new();
        if !foreign.is_empty() {
            let mut tr = editor.state().tr();
            let survivors = if remaining.is_empty() {
                for step in foreign {
                    tr.step(step.clone())
                        .map_err(|e| CollabError::Protocol(format!("remote step does not apply: {e}")))?;
                }
                Vec::new()
            } else {
                rebase_steps(remaining, foreign, &mut tr)
                    .map_err(|e| CollabError::Protocol(format!("remote step does not apply: {e}")))?
            };
            tr.set_meta(META_REMOTE, true)
                .set_meta(META_REBASED, remaining.len())
                .set_meta(META_ADD_TO_HISTORY, false);
            outcome.rebased = survivors.len();
            outcome.dropped = remaining.len() - survivors.len();
            // a read-only editor appends nothing, so a reader never queues steps
            let (next, applied) = editor.remote_state(tr)?;
            follow_ups = ReplicaState::rebaseable(applied.get(1..).unwrap_or_default())?;
            update = Some((next, survivors));
        }

        if let Some((next, survivors)) = update {
            editor.update_state(next)?;
            state.confirm(own);
            state.set_pending(survivors);
        } else {
            state.confirm(own);
        }
        state.set_version(batch.version);
        outcome.appended = follow_ups.len();
        state.extend_pending(follow_ups);

        debug!(
            version = %batch.version,
            confirmed = outcome.confirmed,
            applied = outcome.applied,
            rebased = outcome.rebased,
            dropped = outcome.dropped,
            "remote batch applied"
        );
        Ok(outcome)
    }

    /// Records a save and the current writability. Returns whether
    /// editability changed.
    pub fn receive_persistence_notice(&mut self, notice: PersistenceNotice) -> CollabResult<bool> {
        let (_, state) = self.synced_mut()?;
        state.set_persisted(notice.version, notice.updated_at);
        let was = self.writable.swap(notice.writable, Ordering::AcqRel);
        let changed = was != notice.writable;
        if changed {
            info!(writable = notice.writable, "editability changed");
        }
        debug!(version = %notice.version, updated_at = %notice.updated_at, "document persisted");
        Ok(changed)
    }

    /// Runs a local edit against the editor and queues the steps of every
    /// transaction it applied.
    ///
    /// Edits that change the document are refused with
    /// [`CollabError::ReadOnly`] while the peer disallows writing.
    pub fn edit<F>(&mut self, f: F) -> CollabResult<Vec<Transaction>>
    where
        F: FnOnce(&mut Editor) -> ExtensionResult<Vec<Transaction>>,
    {
        let (editor, state) = self.synced_mut()?;
        let applied = f(editor)?;
        let queued = state.queue(&applied)?;
        if queued > 0 {
            debug!(queued, pending = state.pending().len(), "local steps queued");
        }
        Ok(applied)
    }

    pub fn dispatch(&mut self, tr: Transaction) -> CollabResult<Vec<Transaction>> {
        self.edit(|editor| editor.dispatch(tr))
    }

    pub fn handle_text_input(&mut self, from: usize, to: usize, text: &str) -> CollabResult<Vec<Transaction>> {
        self.edit(|editor| editor.handle_text_input(from, to, text))
    }

    /// Handles a key press; an unbound key applies nothing.
    pub fn handle_key(&mut self, key: &str) -> CollabResult<Vec<Transaction>> {
        self.edit(|editor| editor.handle_key(key).map(Option::unwrap_or_default))
    }

    pub fn run(&mut self, command: &Command) -> CollabResult<Vec<Transaction>> {
        self.edit(|editor| editor.run(command).map(Option::unwrap_or_default))
    }

    /// The next batch to send, if one may be sent now. The batch is in
    /// flight until the peer answers it.
    pub fn flush(&mut self) -> Option<LocalBatchMessage> {
        let max = self.config.max_batch_steps;
        let (_, state) = self.synced_mut().ok()?;
        let batch = state.take_sendable(max)?;
        debug!(version = %batch.version, steps = batch.steps.len(), "flushing local steps");
        Some(batch)
    }

    /// Handles the peer's answer to the in-flight batch.
    ///
    /// Fails with [`CollabError::Rejected`] once the peer has rejected
    /// `max_consecutive_rejections` batches in a row.
    pub fn ack(&mut self, ack: Ack) -> CollabResult<()> {
        let max = self.config.max_consecutive_rejections;
        let (_, state) = self.synced_mut()?;
        match ack {
            Ack::Ok => {
                state.accepted();
                Ok(())
            }
            Ack::Error { message } => {
                let attempts = state.rejected();
                warn!(attempts, %message, "batch rejected");
                if attempts >= max {
                    return Err(CollabError::Rejected { attempts, message });
                }
                Ok(())
            }
        }
    }

    /// The in-flight batch could not be sent; it is retried on the next flush.
    pub fn send_failed(&mut self) {
        if let Ok((_, state)) = self.synced_mut() {
            state.send_failed();
        }
    }

    pub fn save_request(&self) -> CollabResult<SaveRequest> {
        match self.replica {
            Replica::Synced { .. } => Ok(SaveRequest::default()),
            _ => Err(self.unavailable()),
        }
    }

    /// Closes the client, discarding unconfirmed steps.
    pub fn close(&mut self) {
        if let Replica::Synced { state, .. } = &mut self.replica {
            let discarded = state.clear();
            if discarded > 0 {
                warn!(discarded, "closing with unconfirmed steps");
            }
        }
        self.replica = Replica::Closed;
        info!("collab client closed");
    }
}

impl fmt::Debug for CollabClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollabClient")
            .field("phase", &self.phase())
            .field("writable", &self.writable())
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}
