use parking_lot::Mutex;
use std::sync::Arc;
use tracker_core::{Alarm, OrderDetail, OrderId, OrderRow};

use super::error::SyncError;
use super::push_channel::PushChannel;
use super::registry::typed_handler;
use super::stores::{AlarmsStore, OrderDetailsStore, OrdersStore};
use super::topic_guard::TopicGuard;
use super::view_sync::{MergePolicy, TopicBinding, ViewSync};
use crate::domain::{MountToken, OrderReader, PageFetcher, Topic, TopicKind};

pub type OrdersView = ViewSync<OrderRow, dyn PageFetcher<OrderRow>>;
pub type OrderDetailsView = ViewSync<OrderDetail, dyn PageFetcher<OrderDetail>>;
pub type OrderAlarmsView = ViewSync<Alarm, dyn PageFetcher<Alarm>>;

/// Orders table. Refresh driven only; no push stream.
pub async fn orders_view(
    channel: &Arc<PushChannel>,
    store: &OrdersStore,
    fetcher: Arc<dyn PageFetcher<OrderRow>>,
) -> OrdersView {
    ViewSync::mount(channel, Arc::clone(store.table()), fetcher, None, None).await
}

/// Measurement table of one order, live-tailing new samples
pub async fn order_details_view(
    channel: &Arc<PushChannel>,
    store: &OrderDetailsStore,
    fetcher: Arc<dyn PageFetcher<OrderDetail>>,
    order_id: OrderId,
) -> OrderDetailsView {
    ViewSync::mount(
        channel,
        Arc::clone(store.table()),
        fetcher,
        Some(order_id),
        Some(TopicBinding::new(TopicKind::OrderDetails, MergePolicy::Insert)),
    )
    .await
}

/// Alarm table of one order. Pushed alarms update rows in place.
pub async fn order_alarms_view(
    channel: &Arc<PushChannel>,
    store: &AlarmsStore,
    fetcher: Arc<dyn PageFetcher<Alarm>>,
    order_id: OrderId,
) -> OrderAlarmsView {
    ViewSync::mount(
        channel,
        Arc::clone(store.table()),
        fetcher,
        Some(order_id),
        Some(TopicBinding::new(TopicKind::OrderAlarms, MergePolicy::UpdateInPlace)),
    )
    .await
}

/// Chart feed: full sample history of one order plus every pushed sample
pub struct HistoryFeed {
    store: Arc<OrderDetailsStore>,
    reader: Arc<dyn OrderReader>,
    order_id: OrderId,
    token: MountToken,
    subscription: Mutex<Option<TopicGuard>>,
}

impl HistoryFeed {
    pub fn mount(
        channel: &Arc<PushChannel>,
        store: Arc<OrderDetailsStore>,
        reader: Arc<dyn OrderReader>,
        order_id: OrderId,
    ) -> Self {
        let token = MountToken::new();

        let subscription = Topic::order_detail_graph(&order_id).map(|topic| {
            let sink = Arc::clone(&store);
            let active = token.clone();
            let handler = typed_handler(topic.clone(), move |sample: OrderDetail| {
                if active.is_active() {
                    sink.prepend_history(sample);
                }
            });
            TopicGuard::open(channel, topic, handler)
        });

        HistoryFeed {
            store,
            reader,
            order_id,
            token,
            subscription: Mutex::new(subscription),
        }
    }

    /// Load the complete history, replacing what the chart shows
    pub async fn load(&self) -> Result<usize, SyncError> {
        if !self.token.is_active() {
            return Err(SyncError::Unmounted);
        }

        let samples = self.reader.get_all_details(&self.order_id).await;

        if !self.token.is_active() {
            return Err(SyncError::Unmounted);
        }

        let samples = samples.inspect_err(|e| {
            tracing::warn!(order_id = %self.order_id, error = %e, "failed to load sample history");
        })?;
        let count = samples.len();
        self.store.set_history(samples);
        Ok(count)
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn is_mounted(&self) -> bool {
        self.token.is_active()
    }

    pub fn unmount(&self) -> bool {
        if !self.token.invalidate() {
            return false;
        }
        self.subscription.lock().take();
        true
    }
}

impl Drop for HistoryFeed {
    fn drop(&mut self) {
        self.unmount();
    }
}
