//! Collaborative editing for folio.
//!
//! Replicas of a document converge by sending their steps to a single
//! authority, which orders them into one history and broadcasts every
//! accepted batch. A replica that receives steps from other clients
//! rebases its own unconfirmed steps on top of them.
//!
//! # Components
//!
//! - **Protocol**: the messages exchanged with the authority
//! - **State**: the replica's confirmed version and unconfirmed steps
//! - **Client**: the state machine applying snapshots, remote batches and
//!   local edits
//! - **Authority**: an in-memory step authority
//! - **Transport**: abstracts the connection to the authority
//! - **Session**: drives a client over a transport from one async task
//!
//! # Example
//!
//! ```
//! use folio_collab::protocol::Ack;
//! use folio_collab::{Authority, CollabClient, CollabConfig};
//! use folio_extension::builtin::default_extensions;
//! use folio_extension::{compose, EditorConfig};
//! use folio_types::ClientId;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let extensions = default_extensions();
//! let schema = Arc::new(compose(&extensions)?);
//! let doc = json!({ "type": "doc", "content": [{ "type": "title" }, { "type": "paragraph" }] });
//! let mut authority = Authority::from_json(schema, doc)?;
//!
//! let client_id = ClientId::new();
//! let mut client = CollabClient::new(extensions, EditorConfig::default(), CollabConfig::default());
//! client.receive_snapshot(authority.snapshot(client_id, true)?)?;
//! client.handle_text_input(3, 3, "hello")?;
//!
//! if let Some(batch) = client.flush() {
//!     let echo = authority.receive(client_id, &batch)?;
//!     client.ack(Ack::Ok)?;
//!     client.receive_remote_batch(echo)?;
//! }
//! assert_eq!(client.version(), Some(authority.version()));
//! assert!(client.state().is_some_and(|s| s.pending().is_empty()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod authority;
mod client;
mod config;
mod error;
pub mod protocol;
mod session;
mod state;
mod throttle;
pub mod transport;

pub use authority::Authority;
pub use client::{ClientUpdate, CollabClient, RemoteOutcome, COLLAB_EXTENSION};
pub use config::CollabConfig;
pub use error::{CollabError, CollabResult};
pub use session::{CollabSession, SessionCommand, SessionEvent, SessionHandle};
pub use state::{Phase, ReplicaState};
pub use throttle::FlushThrottle;
pub use transport::CollabTransport;
