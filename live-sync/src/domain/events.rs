use std::borrow::Borrow;
use std::fmt;

/// Events reported by one transport session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Broker accepted the session
    Connected { server: Option<String> },
    /// Message delivered on a bound subscription
    Message {
        subscription: Option<String>,
        destination: String,
        body: String,
    },
    /// Broker-side protocol error (the broker closes the session after it)
    ProtocolError(String),
    /// Transport closed
    Closed,
    /// Transport failure
    TransportError(String),
}

impl SessionEvent {
    /// Check if the event ends the session
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            SessionEvent::ProtocolError(_) | SessionEvent::Closed | SessionEvent::TransportError(_)
        )
    }
}

/// Transport-level subscription id, valid only for the session that issued it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(String);

impl SubscriptionHandle {
    pub fn new(seq: u64) -> Self {
        SubscriptionHandle(format!("sub-{}", seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for SubscriptionHandle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Bearer credential presented when opening a session
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
