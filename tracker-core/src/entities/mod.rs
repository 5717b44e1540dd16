mod alarm;
mod order;
mod order_detail;
mod product;
mod user;

pub use alarm::{ALARM_PENDING, Alarm};
pub use order::{
    AlarmState, Client, ClientRef, Driver, Order, OrderRow, ProductSpec, Tank, Truck, TruckRef,
};
pub use order_detail::OrderDetail;
pub use product::{NewProduct, Product};
pub use user::{Role, User, UserRequest};

/// Entities that can be located inside a window by identifier
pub trait Identified {
    type Id: PartialEq + Clone + std::fmt::Debug + Send + Sync;

    fn id(&self) -> &Self::Id;
}
