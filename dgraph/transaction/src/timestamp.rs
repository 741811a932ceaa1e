//! Start timestamps assigned by the server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The logical time at which a transaction's read view was established.
///
/// The server assigns it with the first response of a transaction. A zero
/// value means no response has been seen yet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Placeholder used until the server assigns a start timestamp.
    pub const UNSET: Self = Self(0);

    /// Create timestamp by a given raw value
    pub fn with_ts(timestamp: u64) -> Self {
        Self(timestamp)
    }

    /// Returns true if the server has not assigned this timestamp yet.
    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw value of the timestamp.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(ts: u64) -> Self {
        Self(ts)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
