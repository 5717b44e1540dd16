//! Infrastructure Layer - adapters to the backend
//!
//! - RestClient: HTTP client for the tracking API
//! - StompConnector: STOMP-over-WebSocket sessions with the notifier broker
//! - stomp: frame codec shared by both ends of a STOMP session

pub mod rest_client;
pub mod stomp;
pub mod ws_client;

pub use rest_client::{RestClient, RestError};
pub use stomp::{Command, Frame, FrameError};
pub use ws_client::{StompConnector, StompError, StompSender};
