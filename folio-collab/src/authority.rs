//! In-memory step authority.
//!
//! Holds the canonical document and the ordered history of confirmed steps.
//! A batch is accepted only when it is based on the current head; anything
//! else is stale and the client has to catch up and rebase first.

use crate::error::{CollabError, CollabResult};
use crate::protocol::{LocalBatchMessage, RemoteBatchMessage, SnapshotMessage};
use folio_model::{Node, Schema};
use folio_transform::{Step, StepJson};
use folio_types::{ClientId, Timestamp, Version};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Confirmed {
    step: StepJson,
    client_id: ClientId,
}

/// Orders every client's steps into one history.
#[derive(Debug, Clone)]
pub struct Authority {
    schema: Arc<Schema>,
    doc: Node,
    history: Vec<Confirmed>,
    persisted: Option<(Version, Timestamp)>,
}

impl Authority {
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        Self {
            schema,
            doc,
            history: Vec::new(),
            persisted: None,
        }
    }

    /// Starts from a document in its JSON wire form.
    pub fn from_json(schema: Arc<Schema>, doc: Value) -> CollabResult<Self> {
        let doc = Node::from_value(&schema, doc)?;
        Ok(Self::new(schema, doc))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Number of confirmed steps.
    pub fn version(&self) -> Version {
        Version::ZERO.advance(self.history.len())
    }

    pub fn persisted(&self) -> Option<(Version, Timestamp)> {
        self.persisted
    }

    /// The document as a new client should first see it.
    pub fn snapshot(&self, client_id: ClientId, writable: bool) -> CollabResult<SnapshotMessage> {
        Ok(SnapshotMessage {
            client_id,
            version: self.version(),
            doc: self.doc.to_value()?,
            writable,
        })
    }

    /// Accepts a batch from `client_id` if it is based on the head.
    ///
    /// Returns the batch as every client should receive it. A batch whose
    /// steps do not apply is refused as a whole.
    pub fn receive(&mut self, client_id: ClientId, batch: &LocalBatchMessage) -> CollabResult<RemoteBatchMessage> {
        let head = self.version();
        if batch.version != head {
            debug!(client_id = %client_id, got = %batch.version, head = %head, "stale batch refused");
            return Err(CollabError::Conflict {
                expected: head,
                got: batch.version,
            });
        }

        let mut doc = self.doc.clone();
        for json in &batch.steps {
            let step = Step::from_json(&self.schema, json)
                .map_err(|e| CollabError::Protocol(format!("invalid step: {e}")))?;
            doc = step
                .apply(&doc)
                .map_err(|e| CollabError::Protocol(format!("step does not apply: {e}")))?;
        }

        self.doc = doc;
        self.history.extend(batch.steps.iter().map(|step| Confirmed {
            step: step.clone(),
            client_id,
        }));
        debug!(client_id = %client_id, steps = batch.steps.len(), version = %self.version(), "batch accepted");
        Ok(RemoteBatchMessage {
            version: self.version(),
            steps: batch.steps.clone(),
            client_ids: vec![client_id; batch.steps.len()],
        })
    }

    /// Every step confirmed after `version`, as one batch.
    pub fn steps_since(&self, version: Version) -> CollabResult<RemoteBatchMessage> {
        let head = self.version();
        let start = head.steps_since(version).map(|behind| self.history.len() - behind).ok_or(
            CollabError::Conflict {
                expected: head,
                got: version,
            },
        )?;
        let tail = &self.history[start..];
        Ok(RemoteBatchMessage {
            version: head,
            steps: tail.iter().map(|c| c.step.clone()).collect(),
            client_ids: tail.iter().map(|c| c.client_id).collect(),
        })
    }

    /// Marks the current version as saved.
    pub fn persist(&mut self) -> (Version, Timestamp) {
        let saved = (self.version(), Timestamp::now());
        self.persisted = Some(saved);
        info!(version = %saved.0, "document persisted");
        saved
    }
}
