//! Identifier types used throughout folio.
//!
//! All identifiers wrap a UUID. Locally minted ones use UUID v7 so they sort
//! by creation time; identifiers handed out by a collaboration authority are
//! opaque and only compared, never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new, time-ordered identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from its hyphenated string form.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_id! {
    /// Identifies one connected editor replica.
    ///
    /// Assigned by the collaboration authority in the session snapshot. Step
    /// origins are tagged with it so a client can recognise the echo of its own
    /// steps, and concurrent edits at the same position are ordered by it.
    ClientId
}

impl ClientId {
    /// Builds a deterministic client ID from a small integer.
    ///
    /// Handy for simulations and tests where the tie-break order between
    /// clients has to be known up front.
    #[must_use]
    pub const fn from_u128(n: u128) -> Self {
        Self(Uuid::from_u128(n))
    }
}

uuid_id! {
    /// Identifies a shared document (the "paper" a session is opened on).
    DocumentId
}

uuid_id! {
    /// Identifies one logical edit (a transaction) on a replica.
    TransactionId
}
