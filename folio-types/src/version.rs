//! The collaboration version counter.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of confirmed steps applied to a shared document since it was created.
///
/// Versions only move forward. A replica's version is the ordering key for all
/// collaboration logic: outgoing batches are based on it, incoming batches are
/// placed relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The version of a freshly created document.
    pub const ZERO: Version = Version(0);

    /// Creates a version from its raw counter.
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// Returns the raw counter.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// The version reached after applying `steps` more steps.
    #[must_use]
    pub const fn advance(&self, steps: usize) -> Self {
        Self(self.0 + steps as u64)
    }

    /// The version `steps` steps earlier.
    ///
    /// Used to find the base of a batch that reports the version it ends at.
    pub fn rewind(&self, steps: usize) -> crate::Result<Self> {
        self.0
            .checked_sub(steps as u64)
            .map(Self)
            .ok_or(Error::VersionUnderflow {
                version: self.0,
                steps,
            })
    }

    /// Number of steps between `earlier` and `self`, or `None` if `earlier`
    /// is ahead.
    #[must_use]
    pub fn steps_since(&self, earlier: Version) -> Option<usize> {
        self.0.checked_sub(earlier.0).map(|d| d as usize)
    }
}

impl From<u64> for Version {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
