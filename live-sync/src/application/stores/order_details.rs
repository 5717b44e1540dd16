use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracker_core::OrderDetail;

use super::LiveStore;
use crate::domain::ConsistencyMode;

/// Measurement samples of the selected order.
///
/// Besides the paged table, keeps the complete most-recent-first history
/// backing the live charts.
pub struct OrderDetailsStore {
    table: Arc<LiveStore<OrderDetail>>,
    history: RwLock<VecDeque<OrderDetail>>,
}

impl OrderDetailsStore {
    pub fn new(page_size: u32, sort_key: impl Into<String>, mode: ConsistencyMode) -> Self {
        OrderDetailsStore {
            table: Arc::new(LiveStore::with_mode(page_size, sort_key, mode)),
            history: RwLock::new(VecDeque::new()),
        }
    }

    pub fn table(&self) -> &Arc<LiveStore<OrderDetail>> {
        &self.table
    }

    /// Latest sample, independent of the table page
    pub fn latest(&self) -> Option<OrderDetail> {
        self.table.live()
    }

    pub fn history(&self) -> Vec<OrderDetail> {
        self.history.read().iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    pub fn set_history(&self, samples: Vec<OrderDetail>) {
        *self.history.write() = samples.into();
    }

    /// Prepend a pushed sample to the history and publish it as the latest one
    pub fn prepend_history(&self, sample: OrderDetail) {
        self.history.write().push_front(sample.clone());
        self.table.set_live(sample);
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }
}
