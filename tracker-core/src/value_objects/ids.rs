use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub type AlarmId = i64;
pub type ProductId = i64;
pub type UserId = i64;

/// Order identifier.
///
/// The backend emits order ids either as JSON numbers or as strings, so both
/// forms are accepted and normalized to their textual representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        OrderId(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty id marks "no instance selected"; nothing may be scoped to it.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        OrderId::new(s)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        OrderId::new(s)
    }
}

impl From<i64> for OrderId {
    fn from(n: i64) -> Self {
        OrderId(n.to_string())
    }
}

impl From<u64> for OrderId {
    fn from(n: u64) -> Self {
        OrderId(n.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => OrderId::from(n),
            Raw::Text(s) => OrderId::new(s),
        })
    }
}
