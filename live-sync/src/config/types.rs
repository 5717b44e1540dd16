use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::ConsistencyMode;

/// Root configuration for the sync client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    /// How fetch commits and push merges are ordered
    #[serde(default)]
    pub consistency: ConsistencyMode,
}

/// HTTP API endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

/// Push broker connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// WebSocket URL of the STOMP endpoint
    #[serde(default = "default_broker_url")]
    pub url: String,
    /// Value of the STOMP `host` header
    #[serde(default = "default_broker_host")]
    pub host: String,
    /// Delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Heart-beat interval in milliseconds, 0 disables heart-beats
    #[serde(default)]
    pub heartbeat_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            url: default_broker_url(),
            host: default_broker_host(),
            reconnect_delay_ms: default_reconnect_delay(),
            heartbeat_ms: 0,
        }
    }
}

impl BrokerConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

/// Initial pagination of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub page_size: u32,
    pub sort: String,
}

impl TableConfig {
    fn new(page_size: u32, sort: &str) -> Self {
        TableConfig {
            page_size,
            sort: sort.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_orders_table")]
    pub orders: TableConfig,
    #[serde(default = "default_details_table")]
    pub details: TableConfig,
    #[serde(default = "default_alarms_table")]
    pub alarms: TableConfig,
}

impl Default for TablesConfig {
    fn default() -> Self {
        TablesConfig {
            orders: default_orders_table(),
            details: default_details_table(),
            alarms: default_alarms_table(),
        }
    }
}

impl TablesConfig {
    pub fn all(&self) -> [(&'static str, &TableConfig); 3] {
        [
            ("orders", &self.orders),
            ("details", &self.details),
            ("alarms", &self.alarms),
        ]
    }
}

fn default_broker_url() -> String {
    "ws://localhost:8080/notifier".to_string()
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_orders_table() -> TableConfig {
    TableConfig::new(10, "externalReceptionDate")
}

fn default_details_table() -> TableConfig {
    TableConfig::new(5, "timeStamp")
}

fn default_alarms_table() -> TableConfig {
    TableConfig::new(5, "timeStamp")
}
