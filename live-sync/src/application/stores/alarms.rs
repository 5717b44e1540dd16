use parking_lot::RwLock;
use std::sync::Arc;
use tracker_core::Alarm;

use super::LiveStore;
use crate::domain::ConsistencyMode;

/// Alarms of the selected order. The live slot holds the alarm currently
/// waiting for an operator.
pub struct AlarmsStore {
    table: Arc<LiveStore<Alarm>>,
    reminders: RwLock<Vec<Alarm>>,
}

impl AlarmsStore {
    pub fn new(page_size: u32, sort_key: impl Into<String>, mode: ConsistencyMode) -> Self {
        AlarmsStore {
            table: Arc::new(LiveStore::with_mode(page_size, sort_key, mode)),
            reminders: RwLock::new(Vec::new()),
        }
    }

    pub fn table(&self) -> &Arc<LiveStore<Alarm>> {
        &self.table
    }

    pub fn live(&self) -> Option<Alarm> {
        self.table.live()
    }

    pub fn clear_live(&self) {
        self.table.clear_live();
    }

    pub fn reminders(&self) -> Vec<Alarm> {
        self.reminders.read().clone()
    }

    pub fn set_reminders(&self, alarms: Vec<Alarm>) {
        *self.reminders.write() = alarms;
    }

    /// Pending alarms in the current window
    pub fn pending(&self) -> Vec<Alarm> {
        self.table
            .items()
            .into_iter()
            .filter(Alarm::is_pending)
            .collect()
    }
}
