pub mod entities;
pub mod value_objects;

// Re-export value objects at crate root for convenience
pub use value_objects::{
    AlarmId, OrderId, Page, PageQuery, Pagination, ProductId, Timestamp, UserId, total_pages,
};

// Re-export entities at crate root
pub use entities::{
    ALARM_PENDING, Alarm, AlarmState, Client, ClientRef, Driver, Identified, NewProduct, Order,
    OrderDetail, OrderRow, Product, ProductSpec, Role, Tank, Truck, TruckRef, User, UserRequest,
};
