//! Async collaboration session.
//!
//! [`CollabSession`] owns a [`CollabClient`] and a transport and drives them
//! from one task: inbound messages, host commands and the flush timer are
//! handled one at a time in a `tokio::select!` loop. The host talks to the
//! session through a [`SessionHandle`] and listens for [`SessionEvent`]s.

use crate::client::{ClientUpdate, CollabClient};
use crate::error::{CollabError, CollabResult};
use crate::protocol::{Ack, ContentHandle, CreateAuxiliaryResource, InboundMessage};
use crate::throttle::FlushThrottle;
use crate::transport::CollabTransport;
use folio_extension::Command;
use folio_transform::Transaction;
use folio_types::{ClientId, Timestamp, Version};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the host command channel.
const COMMAND_BUFFER: usize = 64;

/// Requests from the host.
pub enum SessionCommand {
    /// Runs an editor command as a local edit.
    Dispatch(Command),
    /// Text typed over `from..to`.
    TextInput { from: usize, to: usize, text: String },
    /// A key press, e.g. `"Mod-b"`.
    Key(String),
    /// Flushes pending steps, then asks the peer to persist.
    Save,
    CreateAuxiliary {
        request: CreateAuxiliaryResource,
        reply: oneshot::Sender<CollabResult<ContentHandle>>,
    },
    Close,
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Synced {
        client_id: ClientId,
        version: Version,
        writable: bool,
    },
    /// The document changed, locally or remotely. `doc` is its JSON wire form.
    DocumentChanged {
        version: Version,
        pending: usize,
        doc: Value,
    },
    Persisted {
        version: Version,
        updated_at: Timestamp,
    },
    EditableChanged(bool),
    /// A send or save failed; the session carries on.
    TransportError(String),
    /// The session stopped because of an unrecoverable error.
    Terminated(String),
}

/// The host's end of a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn send(&self, command: SessionCommand) -> CollabResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CollabError::ChannelClosed)
    }

    pub async fn dispatch(&self, command: Command) -> CollabResult<()> {
        self.send(SessionCommand::Dispatch(command)).await
    }

    pub async fn text_input(&self, from: usize, to: usize, text: impl Into<String>) -> CollabResult<()> {
        self.send(SessionCommand::TextInput {
            from,
            to,
            text: text.into(),
        })
        .await
    }

    pub async fn key(&self, key: impl Into<String>) -> CollabResult<()> {
        self.send(SessionCommand::Key(key.into())).await
    }

    pub async fn save(&self) -> CollabResult<()> {
        self.send(SessionCommand::Save).await
    }

    /// Stores a binary resource through the peer and returns its handle.
    pub async fn create_auxiliary(&self, request: CreateAuxiliaryResource) -> CollabResult<ContentHandle> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::CreateAuxiliary { request, reply }).await?;
        response.await.map_err(|_| CollabError::ChannelClosed)?
    }

    pub async fn close(&self) -> CollabResult<()> {
        self.send(SessionCommand::Close).await
    }
}

/// Drives one client over one transport.
pub struct CollabSession<T> {
    client: CollabClient,
    transport: T,
    throttle: FlushThrottle,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<T: CollabTransport> CollabSession<T> {
    /// Creates a session, the handle to control it and the event stream.
    pub fn new(client: CollabClient, transport: T) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events, event_rx) = mpsc::unbounded_channel();
        let throttle = FlushThrottle::new(client.config().flush_interval());
        let session = Self {
            client,
            transport,
            throttle,
            commands,
            events,
        };
        (session, SessionHandle { commands: command_tx }, event_rx)
    }

    /// Runs until the host closes the session, the peer goes away or an
    /// unrecoverable error occurs. Returns the client, closed.
    pub async fn run(mut self) -> (CollabClient, CollabResult<()>) {
        info!("collab session started");
        let result = self.event_loop().await;
        match &result {
            Ok(()) => info!("collab session closed"),
            Err(err) => {
                warn!(error = %err, "collab session terminated");
                self.emit(SessionEvent::Terminated(err.to_string()));
            }
        }
        self.client.close();
        (self.client, result)
    }

    /// Branches are polled in order: inbound messages, then a due flush, then
    /// host commands. The leading flush of a burst carries only the edits
    /// handled before it became due.
    async fn event_loop(&mut self) -> CollabResult<()> {
        loop {
            tokio::select! {
                biased;

                message = self.transport.recv() => match message {
                    Some(message) => self.handle_inbound(message)?,
                    None => return Err(CollabError::ChannelClosed),
                },
                () = self.throttle.wait(), if self.throttle.is_scheduled() => self.flush().await?,
                command = self.commands.recv() => match command {
                    None | Some(SessionCommand::Close) => return Ok(()),
                    Some(command) => self.handle_command(command).await?,
                },
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // A host that stopped listening does not stop the session.
        let _ = self.events.send(event);
    }

    fn emit_document_changed(&self) -> CollabResult<()> {
        let (Some(state), Some(doc)) = (self.client.state(), self.client.doc()) else {
            return Ok(());
        };
        self.emit(SessionEvent::DocumentChanged {
            version: state.version(),
            pending: state.pending().len(),
            doc: doc.to_value()?,
        });
        Ok(())
    }

    fn schedule_flush(&mut self) {
        if self.client.ready_to_send() {
            self.throttle.schedule(Instant::now());
        }
    }

    fn handle_inbound(&mut self, message: InboundMessage) -> CollabResult<()> {
        match self.client.receive(message)? {
            ClientUpdate::Synced => {
                if let Some(state) = self.client.state() {
                    self.emit(SessionEvent::Synced {
                        client_id: state.client_id(),
                        version: state.version(),
                        writable: self.client.writable(),
                    });
                }
            }
            ClientUpdate::Remote(outcome) => {
                if outcome.doc_changed() {
                    self.emit_document_changed()?;
                }
                self.schedule_flush();
            }
            ClientUpdate::Persisted { editable_changed } => {
                if let Some((version, updated_at)) = self.client.state().and_then(|s| s.persisted()) {
                    self.emit(SessionEvent::Persisted { version, updated_at });
                }
                if editable_changed {
                    self.emit(SessionEvent::EditableChanged(self.client.writable()));
                }
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: SessionCommand) -> CollabResult<()> {
        let edited = match command {
            SessionCommand::Dispatch(command) => self.client.run(&command),
            SessionCommand::TextInput { from, to, text } => self.client.handle_text_input(from, to, &text),
            SessionCommand::Key(key) => self.client.handle_key(&key),
            SessionCommand::Save => return self.save().await,
            SessionCommand::CreateAuxiliary { request, reply } => {
                let result = self
                    .transport
                    .create_auxiliary_resource(request)
                    .await
                    .map(|created| created.handle);
                if let Err(err) = &result {
                    self.emit(SessionEvent::TransportError(err.to_string()));
                }
                let _ = reply.send(result);
                return Ok(());
            }
            SessionCommand::Close => return Ok(()),
        };
        self.after_edit(edited)
    }

    fn after_edit(&mut self, edited: CollabResult<Vec<Transaction>>) -> CollabResult<()> {
        match edited {
            Ok(applied) => {
                if applied.iter().any(|tr| tr.doc_changed()) {
                    self.emit_document_changed()?;
                    self.schedule_flush();
                }
                Ok(())
            }
            Err(CollabError::ReadOnly) => {
                debug!("local edit dropped: document is read-only");
                Ok(())
            }
            Err(CollabError::NotSynced) => {
                debug!("local edit dropped: no snapshot yet");
                Ok(())
            }
            Err(CollabError::Extension(err)) => {
                warn!(error = %err, "local edit failed");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn flush(&mut self) -> CollabResult<()> {
        self.throttle.flushed(Instant::now());
        let Some(batch) = self.client.flush() else {
            return Ok(());
        };
        let steps = batch.steps.len();
        match self.transport.send_batch(batch).await {
            Ok(ack) => {
                let accepted = ack.is_ok();
                self.client.ack(ack)?;
                debug!(steps, accepted, "batch answered");
            }
            Err(err) => {
                warn!(error = %err, steps, "batch send failed");
                self.client.send_failed();
                self.emit(SessionEvent::TransportError(err.to_string()));
            }
        }
        self.schedule_flush();
        Ok(())
    }

    async fn save(&mut self) -> CollabResult<()> {
        self.flush().await?;
        let Ok(request) = self.client.save_request() else {
            debug!("save dropped: no snapshot yet");
            return Ok(());
        };
        match self.transport.save(request).await {
            Ok(Ack::Ok) => debug!("save requested"),
            Ok(Ack::Error { message }) => self.emit(SessionEvent::TransportError(message)),
            Err(err) => self.emit(SessionEvent::TransportError(err.to_string())),
        }
        Ok(())
    }
}
