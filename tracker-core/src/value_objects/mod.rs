mod ids;
mod pagination;

pub use ids::{AlarmId, OrderId, ProductId, UserId};
pub use pagination::{Page, PageQuery, Pagination, total_pages};

/// Backend timestamps are zone-less local date-times.
pub type Timestamp = chrono::NaiveDateTime;
