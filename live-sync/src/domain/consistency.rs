use serde::{Deserialize, Serialize};

/// How a store arbitrates between fetch commits and push writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Every write applies; a fetch may overwrite a push that raced it
    #[default]
    LastWriterWins,
    /// Writes are stamped; a fetch older than the last applied write is rejected
    Sequenced,
}

/// Position of a write in a store's monotonic write order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(pub u64);

/// Result of a stamped write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// Rejected because a newer write already landed
    Stale,
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}
