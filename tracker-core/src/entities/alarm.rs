use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Identified;
use crate::value_objects::{AlarmId, OrderId, Timestamp};

/// Status of an alarm still waiting for an operator
pub const ALARM_PENDING: &str = "PENDING";

/// Temperature alarm raised while loading an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: AlarmId,
    pub status: String,
    pub order_id: OrderId,
    #[serde(default)]
    pub time_stamp: Option<Timestamp>,
    #[serde(default)]
    pub temperature: Decimal,
    #[serde(default)]
    pub observations: Option<String>,
    /// Operator who handled the alarm
    #[serde(default)]
    pub user: Option<String>,
}

impl Alarm {
    pub fn is_pending(&self) -> bool {
        self.status.eq_ignore_ascii_case(ALARM_PENDING)
    }
}

impl Identified for Alarm {
    type Id = AlarmId;

    fn id(&self) -> &AlarmId {
        &self.id
    }
}
