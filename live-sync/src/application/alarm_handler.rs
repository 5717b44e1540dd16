use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracker_core::{Alarm, AlarmId};

use super::error::SyncError;
use super::stores::{AlarmsStore, OrdersStore};
use crate::domain::AlarmStatusUpdater;

/// Operator-driven alarm status transitions
pub struct AlarmHandler {
    updater: Arc<dyn AlarmStatusUpdater>,
    alarms: Arc<AlarmsStore>,
    orders: Option<Arc<OrdersStore>>,
    updating: AtomicBool,
}

impl AlarmHandler {
    pub fn new(updater: Arc<dyn AlarmStatusUpdater>, alarms: Arc<AlarmsStore>) -> Self {
        AlarmHandler {
            updater,
            alarms,
            orders: None,
            updating: AtomicBool::new(false),
        }
    }

    /// Also patch the owning order's row in the orders table
    pub fn with_orders(mut self, orders: Arc<OrdersStore>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Move an alarm to `new_status`.
    ///
    /// The updated alarm replaces its row in place. It stays the live alarm
    /// while still pending; otherwise the live alarm is cleared.
    pub async fn update_status(
        &self,
        id: AlarmId,
        observation: &str,
        new_status: &str,
    ) -> Result<Alarm, SyncError> {
        if self.updating.swap(true, Ordering::AcqRel) {
            return Err(SyncError::Busy);
        }

        let result = {
            let _busy = UpdatingGuard(&self.updating);
            self.updater.set_alarm_status(id, new_status, observation).await
        };

        let alarm = result.inspect_err(|e| {
            tracing::warn!(alarm_id = id, new_status, error = %e, "alarm status update failed");
        })?;

        // Merging also publishes the alarm as the live one
        self.alarms.table().merge_by_id(alarm.clone());
        if !alarm.is_pending() {
            self.alarms.clear_live();
        }

        if let Some(orders) = &self.orders {
            orders.update_alarm_status(&alarm.order_id, &alarm.status);
        }

        tracing::info!(alarm_id = id, status = %alarm.status, "alarm status updated");
        Ok(alarm)
    }
}

/// Clears the in-flight flag when the request ends or is cancelled
struct UpdatingGuard<'a>(&'a AtomicBool);

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
