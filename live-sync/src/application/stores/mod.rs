mod alarms;
mod catalog;
mod live_store;
mod order_details;
mod orders;

pub use alarms::AlarmsStore;
pub use catalog::{ProductsStore, UsersStore};
pub use live_store::LiveStore;
pub use order_details::OrderDetailsStore;
pub use orders::OrdersStore;
