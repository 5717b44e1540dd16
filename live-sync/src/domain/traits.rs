use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracker_core::{
    Alarm, AlarmId, NewProduct, Order, OrderDetail, OrderId, Page, PageQuery, Product, ProductId,
    User, UserId, UserRequest,
};

use super::events::{Credential, SessionEvent, SubscriptionHandle};
use super::topic::Topic;

/// Domain error for HTTP collaborator calls
///
/// Infrastructure implementations convert their specific errors to this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network or communication failure
    Network(String),
    /// API returned an error response
    Api { status: u16, message: String },
    /// Failed to parse the response
    Parse(String),
    /// Call rejected before reaching the network
    InvalidRequest(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Api { status, message } => write!(f, "API error {}: {}", status, message),
            FetchError::Parse(msg) => write!(f, "Parse error: {}", msg),
            FetchError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Domain error for push transport operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Session could not be opened
    Connection(String),
    /// Session writer is gone
    Closed,
    /// Frame could not be produced or understood
    Frame(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ChannelError::Closed => write!(f, "Session closed"),
            ChannelError::Frame(msg) => write!(f, "Frame error: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Outbound half of a live session. Calls queue frames and never block.
pub trait FrameSink: Send + Sync {
    fn subscribe(&self, handle: &SubscriptionHandle, topic: &Topic) -> Result<(), ChannelError>;

    fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), ChannelError>;

    fn disconnect(&self) -> Result<(), ChannelError>;
}

/// An opened transport session
pub struct Session {
    pub sink: Arc<dyn FrameSink>,
    pub events: mpsc::Receiver<SessionEvent>,
}

/// Opens transport sessions against the broker
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, credential: &Credential) -> Result<Session, ChannelError>;
}

/// Paged reads for one entity kind
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<T>, FetchError>;
}

/// Alarm status transitions performed by an operator
#[async_trait]
pub trait AlarmStatusUpdater: Send + Sync {
    async fn set_alarm_status(
        &self,
        id: AlarmId,
        new_status: &str,
        observation: &str,
    ) -> Result<Alarm, FetchError>;
}

/// Single-order reads for the detail page
#[async_trait]
pub trait OrderReader: Send + Sync {
    async fn get_order(&self, id: &OrderId) -> Result<Order, FetchError>;

    /// Complete measurement history, newest first
    async fn get_all_details(&self, id: &OrderId) -> Result<Vec<OrderDetail>, FetchError>;

    /// Reconciliation report as a PDF document
    async fn get_conciliation_pdf(&self, id: &OrderId) -> Result<Bytes, FetchError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, FetchError>;

    async fn create_product(&self, product: &NewProduct) -> Result<Product, FetchError>;

    async fn update_product(&self, product: &Product) -> Result<Product, FetchError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), FetchError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, FetchError>;

    async fn create_user(&self, user: &UserRequest) -> Result<User, FetchError>;

    async fn update_user(&self, user: &UserRequest) -> Result<User, FetchError>;

    async fn delete_user(&self, id: UserId) -> Result<(), FetchError>;
}
