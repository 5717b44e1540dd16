//! Live Sync Crate
//!
//! Real-time synchronization layer of the order-tracking dashboard.
//! Keeps bounded, paginated views of orders, measurement samples and alarms
//! consistent while HTTP page fetches and broker pushes write concurrently.
//!
//! Follows Clean Architecture with four layers:
//! - **Config**: JSON configuration (API, broker, table defaults)
//! - **Domain**: topics, paged windows, ports and domain errors
//! - **Application**: registry, push channel, stores, per-view sync
//! - **Infrastructure**: STOMP over WebSocket, REST client
//!
//! ```text
//!   HTTP API                         STOMP broker
//!      │ fetch page                       │ MESSAGE /topic/.../order/{id}
//!      ▼                                  ▼
//! ┌──────────────┐               ┌──────────────────┐
//! │  RestClient  │               │  StompConnector  │
//! └──────┬───────┘               └────────┬─────────┘
//!        │ PageFetcher                    │ SessionEvent
//!        ▼                                ▼
//! ┌──────────────┐  push handler ┌──────────────────┐
//! │   ViewSync   │◄──────────────│   PushChannel    │
//! │ (per mount)  │               │ + Subscription   │
//! └──────┬───────┘               │   Registry       │
//!        │ commit_fetch          └────────┬─────────┘
//!        ▼                                │ push_insert / merge_by_id
//! ┌─────────────────────────────────────────────────┐
//! │      LiveStore<T>: PagedWindow + LiveSlot        │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

// Config layer
pub use config::{
    ApiConfig, BrokerConfig, ConfigError, TableConfig, TablesConfig, TrackerConfig, load_config,
    load_config_from_str, load_default_config,
};

// Domain layer
pub use domain::{
    AlarmStatusUpdater, ChannelError, ConsistencyMode, Connector, Credential, FetchError,
    FrameSink, LiveSlot, MountToken, OrderReader, PageFetcher, PagedWindow, ProductRepository,
    Session, SessionEvent, Stamp, SubscriptionHandle, Topic, TopicKind, UserRepository, ViewPhase,
    WriteOutcome,
};

// Application layer
pub use application::{
    AlarmHandler, AlarmsStore, Catalog, DispatchOutcome, HistoryFeed, LiveStore, MergePolicy,
    MessageHandler, OrderAlarmsView, OrderDetailsStore, OrderDetailsView, OrdersStore, OrdersView,
    ProductsStore, PushChannel, SubscribeOutcome, SubscriptionRegistry, SyncError, TopicBinding,
    TopicGuard, UsersStore, ViewSync,
};

// Infrastructure layer
pub use infrastructure::{RestClient, RestError, StompConnector, StompError};

use tracker_core::{Order, OrderId};

/// Tracker facade - wires the REST client, push channel and stores of one
/// dashboard session from a [`TrackerConfig`]
pub struct Tracker {
    config: TrackerConfig,
    rest: Arc<RestClient>,
    channel: Arc<PushChannel>,
    orders: Arc<OrdersStore>,
    details: Arc<OrderDetailsStore>,
    alarms: Arc<AlarmsStore>,
    products: Arc<ProductsStore>,
    users: Arc<UsersStore>,
}

impl Tracker {
    pub fn new(config: TrackerConfig, token: Option<String>) -> Self {
        let mut rest = RestClient::new(config.api.base_url.clone());
        if let Some(token) = token {
            rest = rest.with_token(token);
        }

        let connector = Arc::new(StompConnector::new(
            config.broker.url.clone(),
            config.broker.host.clone(),
            config.broker.heartbeat(),
        ));
        Self::with_parts(config, Arc::new(rest), connector)
    }

    /// Build with a custom push connector
    pub fn with_parts(config: TrackerConfig, rest: Arc<RestClient>, connector: Arc<dyn Connector>) -> Self {
        let mode = config.consistency;
        let tables = &config.tables;
        let orders = Arc::new(OrdersStore::new(tables.orders.page_size, tables.orders.sort.as_str(), mode));
        let details = Arc::new(OrderDetailsStore::new(
            tables.details.page_size,
            tables.details.sort.as_str(),
            mode,
        ));
        let alarms = Arc::new(AlarmsStore::new(tables.alarms.page_size, tables.alarms.sort.as_str(), mode));

        let channel = Arc::new(PushChannel::new(connector, config.broker.reconnect_delay()));

        Tracker {
            config,
            rest,
            channel,
            orders,
            details,
            alarms,
            products: Arc::new(ProductsStore::new()),
            users: Arc::new(UsersStore::new()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn rest(&self) -> &Arc<RestClient> {
        &self.rest
    }

    pub fn channel(&self) -> &Arc<PushChannel> {
        &self.channel
    }

    pub fn orders(&self) -> &Arc<OrdersStore> {
        &self.orders
    }

    pub fn details(&self) -> &Arc<OrderDetailsStore> {
        &self.details
    }

    pub fn alarms(&self) -> &Arc<AlarmsStore> {
        &self.alarms
    }

    pub fn products(&self) -> &Arc<ProductsStore> {
        &self.products
    }

    pub fn users(&self) -> &Arc<UsersStore> {
        &self.users
    }

    /// Start the push channel. No-op while it is already running.
    pub fn connect(&self, credential: Credential) -> bool {
        self.channel.connect(credential)
    }

    /// Stop the push channel once every view has unmounted
    pub fn disconnect(&self) -> bool {
        self.channel.disconnect()
    }

    pub async fn orders_view(&self) -> OrdersView {
        application::orders_view(&self.channel, &self.orders, self.rest.clone()).await
    }

    pub async fn order_details_view(&self, order_id: OrderId) -> OrderDetailsView {
        application::order_details_view(&self.channel, &self.details, self.rest.clone(), order_id).await
    }

    pub async fn order_alarms_view(&self, order_id: OrderId) -> OrderAlarmsView {
        application::order_alarms_view(&self.channel, &self.alarms, self.rest.clone(), order_id).await
    }

    pub fn history_feed(&self, order_id: OrderId) -> HistoryFeed {
        HistoryFeed::mount(&self.channel, self.details.clone(), self.rest.clone(), order_id)
    }

    /// Fetch one order and make it the selected one
    pub async fn open_order(&self, order_id: &OrderId) -> Result<Order, SyncError> {
        let order = OrderReader::get_order(self.rest.as_ref(), order_id).await?;
        self.orders.select(order.clone());
        Ok(order)
    }

    pub fn alarm_handler(&self) -> AlarmHandler {
        AlarmHandler::new(self.rest.clone(), self.alarms.clone()).with_orders(self.orders.clone())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            self.rest.clone(),
            self.rest.clone(),
            self.products.clone(),
            self.users.clone(),
        )
    }
}
