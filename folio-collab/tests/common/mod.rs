//! Shared collaboration fixtures.

#![allow(dead_code)]

use folio_collab::protocol::{Ack, InboundMessage, RemoteBatchMessage};
use folio_collab::{Authority, CollabClient, CollabConfig, CollabError};
use folio_extension::builtin::default_extensions;
use folio_extension::{compose, EditorConfig};
use folio_model::Schema;
use folio_types::ClientId;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn block(ty: &str, text: &str) -> Value {
    if text.is_empty() {
        json!({ "type": ty })
    } else {
        json!({ "type": ty, "content": [{ "type": "text", "text": text }] })
    }
}

/// A document with a title and one paragraph. The title's text starts at 1;
/// the paragraph's at `title.len() + 3`.
pub fn doc(title: &str, body: &str) -> Value {
    json!({ "type": "doc", "content": [block("title", title), block("paragraph", body)] })
}

pub fn schema() -> Arc<Schema> {
    Arc::new(compose(&default_extensions()).unwrap())
}

pub fn authority(doc: Value) -> Authority {
    Authority::from_json(schema(), doc).unwrap()
}

pub fn client_id(n: u128) -> ClientId {
    ClientId::from_u128(n)
}

pub fn client() -> CollabClient {
    client_with(CollabConfig::default())
}

pub fn client_with(config: CollabConfig) -> CollabClient {
    CollabClient::new(default_extensions(), EditorConfig::default(), config)
}

/// A writable client synced to `authority`'s current state.
pub fn synced(authority: &Authority, id: u128) -> CollabClient {
    synced_with(authority, id, CollabConfig::default())
}

pub fn synced_with(authority: &Authority, id: u128, config: CollabConfig) -> CollabClient {
    let mut client = client_with(config);
    client
        .receive_snapshot(authority.snapshot(client_id(id), true).unwrap())
        .unwrap();
    client
}

pub fn insert(client: &mut CollabClient, pos: usize, text: &str) {
    client
        .edit(|editor| {
            let mut tr = editor.state().tr();
            tr.insert_text(text, pos)?;
            editor.dispatch(tr)
        })
        .unwrap();
}

pub fn delete(client: &mut CollabClient, from: usize, to: usize) {
    client
        .edit(|editor| {
            let mut tr = editor.state().tr();
            tr.delete(from, to)?;
            editor.dispatch(tr)
        })
        .unwrap();
}

pub fn text_of(client: &CollabClient) -> String {
    client.doc().unwrap().text_content()
}

pub fn json_of(client: &CollabClient) -> Value {
    client.doc().unwrap().to_value().unwrap()
}

pub fn pending(client: &CollabClient) -> usize {
    client.state().map_or(0, |s| s.pending().len())
}

/// Bounds of the body paragraph's text: `(start, end)`.
pub fn body_range(client: &CollabClient) -> (usize, usize) {
    let doc = client.doc().unwrap();
    let title = doc.child(0).unwrap().node_size();
    let body = doc.child(1).unwrap().content().size();
    (title + 1, title + 1 + body)
}

/// Several clients around one authority, with message delivery under the
/// test's control.
pub struct Sim {
    pub authority: Authority,
    pub clients: Vec<CollabClient>,
    pub inboxes: Vec<VecDeque<RemoteBatchMessage>>,
}

impl Sim {
    pub fn new(doc: Value, clients: usize) -> Self {
        let authority = authority(doc);
        // random schedules may refuse one client many times in a row
        let config = CollabConfig {
            max_consecutive_rejections: u32::MAX,
            ..Default::default()
        };
        let clients: Vec<_> = (1..=clients as u128)
            .map(|id| synced_with(&authority, id, config.clone()))
            .collect();
        let inboxes = clients.iter().map(|_| VecDeque::new()).collect();
        Self {
            authority,
            clients,
            inboxes,
        }
    }

    /// Sends client `i`'s next batch. Returns whether the authority took it.
    pub fn flush(&mut self, i: usize) -> bool {
        let Some(batch) = self.clients[i].flush() else {
            return false;
        };
        let id = self.clients[i].client_id().unwrap();
        match self.authority.receive(id, &batch) {
            Ok(remote) => {
                for inbox in &mut self.inboxes {
                    inbox.push_back(remote.clone());
                }
                self.clients[i].ack(Ack::Ok).unwrap();
                true
            }
            Err(err @ CollabError::Conflict { .. }) => {
                self.clients[i]
                    .ack(Ack::Error {
                        message: err.to_string(),
                    })
                    .unwrap();
                false
            }
            Err(err) => panic!("authority refused batch: {err}"),
        }
    }

    /// Delivers client `i`'s next queued batch. Returns whether there was one.
    pub fn deliver(&mut self, i: usize) -> bool {
        let Some(batch) = self.inboxes[i].pop_front() else {
            return false;
        };
        self.clients[i]
            .receive(InboundMessage::RemoteBatch(batch))
            .unwrap();
        true
    }

    pub fn deliver_all(&mut self, i: usize) {
        while self.deliver(i) {}
    }

    /// Flushes and delivers until nothing is pending or queued anywhere.
    pub fn settle(&mut self) {
        for _ in 0..100 {
            let mut busy = false;
            for i in 0..self.clients.len() {
                self.deliver_all(i);
            }
            for i in 0..self.clients.len() {
                busy |= self.flush(i);
            }
            busy |= self.inboxes.iter().any(|inbox| !inbox.is_empty());
            busy |= self.clients.iter().any(|c| pending(c) > 0);
            if !busy {
                return;
            }
        }
        panic!("simulation did not settle");
    }

    pub fn authority_json(&self) -> Value {
        self.authority.doc().to_value().unwrap()
    }
}
