mod alarm_handler;
mod catalog;
mod error;
mod push_channel;
mod registry;
mod stores;
mod topic_guard;
mod view_sync;
mod views;

pub use alarm_handler::AlarmHandler;
pub use catalog::Catalog;
pub use error::SyncError;
pub use push_channel::PushChannel;
pub use registry::{
    DispatchOutcome, MessageHandler, SubscribeOutcome, SubscriptionRegistry, typed_handler,
};
pub use stores::{AlarmsStore, LiveStore, OrderDetailsStore, OrdersStore, ProductsStore, UsersStore};
pub use topic_guard::TopicGuard;
pub use view_sync::{MergePolicy, TopicBinding, ViewSync};
pub use views::{
    HistoryFeed, OrderAlarmsView, OrderDetailsView, OrdersView, order_alarms_view,
    order_details_view, orders_view,
};
