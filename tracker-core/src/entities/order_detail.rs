use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Identified;
use crate::value_objects::{OrderId, Timestamp};

/// One measurement sample taken while a truck is being loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: i64,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub time_stamp: Option<Timestamp>,
    #[serde(default)]
    pub accumulated_mass: Decimal,
    #[serde(default)]
    pub density: Decimal,
    #[serde(default)]
    pub temperature: Decimal,
    #[serde(default)]
    pub flow_rate: Decimal,
}

impl Identified for OrderDetail {
    type Id = i64;

    fn id(&self) -> &i64 {
        &self.id
    }
}
