use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Liveness capability handed to everything a mounted view spawns.
///
/// Push handlers and late fetch responses check it before writing, so a
/// torn-down view never receives writes.
#[derive(Debug, Clone)]
pub struct MountToken {
    active: Arc<AtomicBool>,
}

impl MountToken {
    pub fn new() -> Self {
        MountToken {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Returns true only for the call that performed the transition
    pub fn invalidate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

impl Default for MountToken {
    fn default() -> Self {
        Self::new()
    }
}
