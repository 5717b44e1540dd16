use parking_lot::RwLock;
use std::sync::Arc;
use tracker_core::{Order, OrderId, OrderRow};

use super::LiveStore;
use crate::domain::ConsistencyMode;

/// Orders table plus the order currently opened on the detail page
pub struct OrdersStore {
    table: Arc<LiveStore<OrderRow>>,
    selected: RwLock<Option<Order>>,
}

impl OrdersStore {
    pub fn new(page_size: u32, sort_key: impl Into<String>, mode: ConsistencyMode) -> Self {
        OrdersStore {
            table: Arc::new(LiveStore::with_mode(page_size, sort_key, mode)),
            selected: RwLock::new(None),
        }
    }

    pub fn table(&self) -> &Arc<LiveStore<OrderRow>> {
        &self.table
    }

    pub fn selected(&self) -> Option<Order> {
        self.selected.read().clone()
    }

    pub fn select(&self, order: Order) {
        *self.selected.write() = Some(order);
    }

    pub fn clear_selection(&self) {
        *self.selected.write() = None;
    }

    /// Patch the alarm state shown on an order's row
    pub fn update_alarm_status(&self, order_id: &OrderId, state: &str) -> bool {
        let updated = self
            .table
            .update_in_window(order_id, |row| row.set_alarm_state(state));
        if !updated {
            tracing::debug!(order_id = %order_id, "order not in current window, alarm state not patched");
        }
        updated
    }
}
