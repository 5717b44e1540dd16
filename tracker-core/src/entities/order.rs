use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Identified;
use crate::value_objects::{OrderId, Timestamp};

/// Row of the orders table (summary projection of an order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub id: OrderId,
    pub status: String,
    pub truck: TruckRef,
    pub client: ClientRef,
    #[serde(default)]
    pub alarm_status: Option<AlarmState>,
    #[serde(default)]
    pub reception_date: Option<Timestamp>,
    #[serde(default)]
    pub estimated_date: Option<Timestamp>,
}

impl OrderRow {
    /// Replace the alarm state shown for this row
    pub fn set_alarm_state(&mut self, state: impl Into<String>) {
        match self.alarm_status.as_mut() {
            Some(alarm) => alarm.state = state.into(),
            None => {
                self.alarm_status = Some(AlarmState {
                    state: state.into(),
                })
            }
        }
    }
}

impl Identified for OrderRow {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckRef {
    pub license_plate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    pub state: String,
}

/// Full loading order as shown on the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub status: String,
    pub truck: Truck,
    pub client: Client,
    pub driver: Driver,
    pub product: ProductSpec,
    #[serde(default)]
    pub preset: Decimal,
    #[serde(default)]
    pub reception_date: Option<Timestamp>,
    #[serde(default)]
    pub estimated_date: Option<Timestamp>,
    #[serde(default)]
    pub initial_weighing_date: Option<Timestamp>,
    #[serde(default)]
    pub fueling_start_date: Option<Timestamp>,
    #[serde(default)]
    pub fueling_end_date: Option<Timestamp>,
    #[serde(default)]
    pub final_weighing_date: Option<Timestamp>,
    #[serde(default)]
    pub last_accumulated_mass: Option<Decimal>,
}

impl Order {
    /// Sum of the truck's tank capacities in liters
    pub fn tank_capacity(&self) -> Decimal {
        self.truck.tanks.iter().map(|t| t.capacity_liters).sum()
    }

    /// Loaded fraction of the preset, when both values are known
    pub fn fill_ratio(&self) -> Option<Decimal> {
        let mass = self.last_accumulated_mass?;
        if self.preset.is_zero() {
            return None;
        }
        Some(mass / self.preset)
    }
}

impl Identified for Order {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truck {
    pub license_plate: String,
    #[serde(default)]
    pub tanks: Vec<Tank>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tank {
    pub capacity_liters: Decimal,
    pub license_plate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub name: String,
    pub last_name: String,
    pub dni: String,
}

/// Product as embedded in an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSpec {
    pub product: String,
    pub threshold_temperature: Decimal,
    pub density: Decimal,
}
