//! Transport layer abstraction.
//!
//! A session exchanges messages with exactly one peer, the step authority.
//! How the bytes travel (a websocket, an in-process channel) is up to the
//! implementation; reconnecting is too.

use crate::error::CollabResult;
use crate::protocol::{
    Ack, AuxiliaryResourceCreated, CreateAuxiliaryResource, InboundMessage, LocalBatchMessage, SaveRequest,
};
use async_trait::async_trait;

/// A connection to the collaboration peer.
#[async_trait]
pub trait CollabTransport: Send {
    /// Sends unconfirmed steps and waits for the peer's answer.
    ///
    /// An `Err` means the batch never arrived; an [`Ack::Error`] means the
    /// peer refused it.
    async fn send_batch(&mut self, batch: LocalBatchMessage) -> CollabResult<Ack>;

    /// Asks the peer to persist the document.
    async fn save(&mut self, request: SaveRequest) -> CollabResult<Ack>;

    /// Stores a binary resource and returns its handle.
    async fn create_auxiliary_resource(
        &mut self,
        request: CreateAuxiliaryResource,
    ) -> CollabResult<AuxiliaryResourceCreated>;

    /// Receives the next message pushed by the peer.
    /// Returns `None` once the connection is gone.
    ///
    /// Must be cancel safe: the session polls it alongside other events.
    async fn recv(&mut self) -> Option<InboundMessage>;
}

/// An in-process transport for testing.
pub mod mock {
    use super::*;
    use crate::authority::Authority;
    use crate::error::CollabError;
    use crate::protocol::{ContentHandle, PersistenceNotice};
    use folio_types::{ClientId, Version};
    use serde_json::Value;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct Connection {
        client_id: ClientId,
        writable: bool,
        sender: mpsc::UnboundedSender<InboundMessage>,
    }

    struct HubState {
        authority: Authority,
        connections: Vec<Connection>,
        failing_sends: usize,
        refusals: usize,
        batches: usize,
        resources: Vec<(ContentHandle, CreateAuxiliaryResource)>,
    }

    impl HubState {
        fn broadcast(&mut self, message: &InboundMessage) {
            self.connections.retain(|c| c.sender.send(message.clone()).is_ok());
        }

        fn notice(&self, writable: bool) -> InboundMessage {
            let (version, updated_at) = self
                .authority
                .persisted()
                .unwrap_or((self.authority.version(), Default::default()));
            InboundMessage::PersistenceNotice(PersistenceNotice {
                version,
                updated_at,
                writable,
            })
        }
    }

    /// A step authority shared by any number of mock connections.
    ///
    /// Accepted batches are pushed to every connection, the sender included,
    /// before the sender's [`Ack`] returns.
    #[derive(Clone)]
    pub struct MockHub {
        inner: Arc<Mutex<HubState>>,
    }

    impl MockHub {
        pub fn new(authority: Authority) -> Self {
            Self {
                inner: Arc::new(Mutex::new(HubState {
                    authority,
                    connections: Vec::new(),
                    failing_sends: 0,
                    refusals: 0,
                    batches: 0,
                    resources: Vec::new(),
                })),
            }
        }

        fn lock(&self) -> MutexGuard<'_, HubState> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Connects a new client. Its snapshot is the first message it receives.
        pub fn connect(&self, writable: bool) -> CollabResult<MockTransport> {
            self.connect_as(ClientId::new(), writable)
        }

        pub fn connect_as(&self, client_id: ClientId, writable: bool) -> CollabResult<MockTransport> {
            let (sender, inbound) = mpsc::unbounded_channel();
            let mut hub = self.lock();
            let snapshot = hub.authority.snapshot(client_id, writable)?;
            sender
                .send(InboundMessage::Snapshot(snapshot))
                .map_err(|_| CollabError::ChannelClosed)?;
            hub.connections.push(Connection {
                client_id,
                writable,
                sender,
            });
            Ok(MockTransport {
                client_id,
                hub: self.clone(),
                inbound,
            })
        }

        /// Drops the connection; the client's `recv` then returns `None`.
        pub fn disconnect(&self, client_id: ClientId) {
            self.lock().connections.retain(|c| c.client_id != client_id);
        }

        /// Changes a client's writability and tells it so.
        pub fn set_writable(&self, client_id: ClientId, writable: bool) {
            let mut hub = self.lock();
            let notice = hub.notice(writable);
            hub.connections.retain_mut(|c| {
                if c.client_id != client_id {
                    return true;
                }
                c.writable = writable;
                c.sender.send(notice.clone()).is_ok()
            });
        }

        /// Pushes an arbitrary message to one client.
        pub fn inject(&self, client_id: ClientId, message: InboundMessage) {
            let hub = self.lock();
            for connection in hub.connections.iter().filter(|c| c.client_id == client_id) {
                let _ = connection.sender.send(message.clone());
            }
        }

        /// Makes the next `n` batch sends fail before reaching the authority.
        pub fn fail_sends(&self, n: usize) {
            self.lock().failing_sends = n;
        }

        /// Makes the authority refuse the next `n` batches. Batches from
        /// read-only or disconnected clients are always refused.
        pub fn refuse_batches(&self, n: usize) {
            self.lock().refusals = n;
        }

        /// Number of batch sends attempted so far.
        pub fn batches(&self) -> usize {
            self.lock().batches
        }

        pub fn version(&self) -> Version {
            self.lock().authority.version()
        }

        pub fn doc_json(&self) -> CollabResult<Value> {
            Ok(self.lock().authority.doc().to_value()?)
        }

        pub fn resources(&self) -> Vec<ContentHandle> {
            self.lock().resources.iter().map(|(handle, _)| handle.clone()).collect()
        }

        fn submit(&self, client_id: ClientId, batch: LocalBatchMessage) -> CollabResult<Ack> {
            let mut hub = self.lock();
            hub.batches += 1;
            if hub.failing_sends > 0 {
                hub.failing_sends -= 1;
                return Err(CollabError::Transport("connection reset".into()));
            }
            if !hub.connections.iter().any(|c| c.client_id == client_id && c.writable) {
                return Ok(Ack::Error {
                    message: "document is read-only".into(),
                });
            }
            if hub.refusals > 0 {
                hub.refusals -= 1;
                return Ok(Ack::Error {
                    message: "batch refused".into(),
                });
            }
            match hub.authority.receive(client_id, &batch) {
                Ok(remote) => {
                    hub.broadcast(&InboundMessage::RemoteBatch(remote));
                    Ok(Ack::Ok)
                }
                Err(err) => Ok(Ack::Error {
                    message: err.to_string(),
                }),
            }
        }

        fn save(&self) -> Ack {
            let mut hub = self.lock();
            hub.authority.persist();
            let notices: Vec<_> = hub.connections.iter().map(|c| hub.notice(c.writable)).collect();
            let mut notices = notices.into_iter();
            hub.connections
                .retain(|c| notices.next().is_none_or(|notice| c.sender.send(notice).is_ok()));
            Ack::Ok
        }
    }

    /// One client's end of a [`MockHub`].
    pub struct MockTransport {
        client_id: ClientId,
        hub: MockHub,
        inbound: mpsc::UnboundedReceiver<InboundMessage>,
    }

    impl MockTransport {
        pub fn client_id(&self) -> ClientId {
            self.client_id
        }

        pub fn hub(&self) -> &MockHub {
            &self.hub
        }

        /// Takes the next pushed message without waiting.
        pub fn try_recv(&mut self) -> Option<InboundMessage> {
            self.inbound.try_recv().ok()
        }
    }

    #[async_trait]
    impl CollabTransport for MockTransport {
        async fn send_batch(&mut self, batch: LocalBatchMessage) -> CollabResult<Ack> {
            self.hub.submit(self.client_id, batch)
        }

        async fn save(&mut self, _request: SaveRequest) -> CollabResult<Ack> {
            Ok(self.hub.save())
        }

        async fn create_auxiliary_resource(
            &mut self,
            request: CreateAuxiliaryResource,
        ) -> CollabResult<AuxiliaryResourceCreated> {
            let handle = ContentHandle::new(format!("blob:{}", Uuid::new_v4()));
            self.hub.lock().resources.push((handle.clone(), request));
            Ok(AuxiliaryResourceCreated { handle })
        }

        async fn recv(&mut self) -> Option<InboundMessage> {
            self.inbound.recv().await
        }
    }
}
