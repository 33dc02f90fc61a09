//! Revision records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded edit of an entry.
///
/// The payload itself stays on disk; only its size is carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Seconds since the Unix epoch. Identity and sort key.
    pub timestamp: i64,

    /// Size of the reverse patch on disk. Zero for the creation marker.
    pub size_bytes: u64,
}

impl Revision {
    pub fn new(timestamp: i64, size_bytes: u64) -> Self {
        Self {
            timestamp,
            size_bytes,
        }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}
