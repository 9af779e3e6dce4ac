//! Stream identity types.
//!
//! A stream is a unique scheduled network test; its identifier partitions
//! the input and owns all per-key detector and grouper state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stream identifier wrapper with display formatting.
///
/// Every measurement, event, and per-key state record carries one of these.
/// Two measurements with the same `StreamId` are guaranteed to be processed
/// in arrival order by the same shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    /// Create a new stream identifier.
    pub fn new(id: impl Into<String>) -> Self {
        StreamId(id.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        StreamId(id)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        StreamId(id.to_string())
    }
}
