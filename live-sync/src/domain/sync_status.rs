/// Lifecycle of a mounted view
/// Domain concept representing the fetch/subscribe state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// Mounted, nothing requested yet
    Idle,
    /// Waiting for a page from the HTTP API
    Fetching,
    /// Last fetch committed to the store
    Synced,
    /// Last fetch failed, store keeps its previous contents
    Failed,
    /// Torn down, no more writes accepted
    Unmounted,
}

impl ViewPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewPhase::Fetching)
    }

    /// Check if the view has data confirmed by the server
    pub fn is_ready(&self) -> bool {
        matches!(self, ViewPhase::Synced)
    }

    /// Check if a new fetch may be issued from this phase
    pub fn can_fetch(&self) -> bool {
        !matches!(self, ViewPhase::Unmounted)
    }
}
