//! Collaboration wire messages.
//!
//! A session talks to one peer, the step authority, which orders every
//! client's steps into a single history:
//!
//! 1. The peer sends a [`SnapshotMessage`] with the document, its version and
//!    the client's ID
//! 2. The client sends [`LocalBatchMessage`]s of unconfirmed steps based on
//!    its version; the peer answers each with an [`Ack`]
//! 3. The peer broadcasts every accepted batch as a [`RemoteBatchMessage`],
//!    including back to the client that sent it
//!
//! Persistence and auxiliary resources travel over the same connection.

use folio_transform::StepJson;
use folio_types::{ClientId, Timestamp, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Initial state of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    pub version: Version,
    /// Document in its JSON wire form.
    pub doc: Value,
    pub writable: bool,
}

/// Steps confirmed by the authority.
///
/// `version` is the authority version after the batch, so the batch starts
/// at `version - steps.len()`. `client_ids` names the origin of each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBatchMessage {
    pub version: Version,
    pub steps: Vec<StepJson>,
    #[serde(rename = "clientIDs")]
    pub client_ids: Vec<ClientId>,
}

impl RemoteBatchMessage {
    /// The version the batch starts at, or `None` if it claims more steps
    /// than its version allows.
    pub fn base(&self) -> Option<Version> {
        self.version.rewind(self.steps.len()).ok()
    }
}

/// The document was saved. Also carries the current writability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceNotice {
    pub version: Version,
    pub updated_at: Timestamp,
    pub writable: bool,
}

/// Unconfirmed local steps, based on `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBatchMessage {
    pub version: Version,
    pub steps: Vec<StepJson>,
}

/// Asks the peer to persist the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {}

/// Asks the peer to store a binary resource (an image, a video) and hand
/// back a handle nodes can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuxiliaryResource {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Opaque reference to an auxiliary resource, stored in node attributes
/// such as an image's `src`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHandle(String);

impl ContentHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxiliaryResourceCreated {
    pub handle: ContentHandle,
}

/// The peer's answer to a local batch or save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Ack {
    Ok,
    Error { message: String },
}

impl Ack {
    pub fn is_ok(&self) -> bool {
        matches!(self, Ack::Ok)
    }
}

/// Messages the peer pushes to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum InboundMessage {
    Snapshot(SnapshotMessage),
    RemoteBatch(RemoteBatchMessage),
    PersistenceNotice(PersistenceNotice),
}

/// Messages a client sends to the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundMessage {
    LocalBatch(LocalBatchMessage),
    SaveRequest(SaveRequest),
    CreateAuxiliaryResource(CreateAuxiliaryResource),
}
