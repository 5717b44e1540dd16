use std::borrow::Borrow;
use std::fmt;

use tracker_core::OrderId;

/// Families of push streams exposed by the broker, all scoped by order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// Temperature alarms raised for an order
    OrderAlarms,
    /// Measurement samples feeding the details table
    OrderDetails,
    /// Measurement samples feeding the live charts
    OrderDetailGraph,
}

impl TopicKind {
    fn prefix(&self) -> &'static str {
        match self {
            TopicKind::OrderAlarms => "/topic/alarms/order",
            TopicKind::OrderDetails => "/topic/details/order",
            TopicKind::OrderDetailGraph => "/topic/details/graphs/order",
        }
    }
}

/// Broker destination name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Topic(name.into())
    }

    /// Topic of `kind` scoped to one order. `None` for a blank id: there is
    /// nothing to subscribe to until an order is selected.
    pub fn scoped(kind: TopicKind, order_id: &OrderId) -> Option<Self> {
        if order_id.is_empty() {
            return None;
        }
        Some(Topic(format!("{}/{}", kind.prefix(), order_id)))
    }

    pub fn order_alarms(order_id: &OrderId) -> Option<Self> {
        Topic::scoped(TopicKind::OrderAlarms, order_id)
    }

    pub fn order_details(order_id: &OrderId) -> Option<Self> {
        Topic::scoped(TopicKind::OrderDetails, order_id)
    }

    pub fn order_detail_graph(order_id: &OrderId) -> Option<Self> {
        Topic::scoped(TopicKind::OrderDetailGraph, order_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}
