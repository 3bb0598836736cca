//! Events delivered to a machine.
//!
//! An event is a type name plus an optional JSON payload. A bare string is
//! sugar for an event with an empty payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event delivered to the transition engine.
///
/// `kind` is `None` only for the bootstrap signal, which moves a machine out
/// of its pre-initial pseudostate. Hosts never send it directly.
///
/// # Example
///
/// ```rust
/// use hookstate::core::Event;
/// use serde_json::json;
///
/// let go: Event = "go".into();
/// assert_eq!(go.kind(), Some("go"));
///
/// let change = Event::new("change").with("value", json!(3));
/// assert_eq!(change.get("value"), Some(&json!(3)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Event {
    /// Create an event of the given type with an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            payload: Map::new(),
        }
    }

    /// The reserved bootstrap signal (`{type: null}`).
    pub fn bootstrap() -> Self {
        Self::default()
    }

    /// Add a payload field, returning the updated event.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Replace the whole payload.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn is_bootstrap(&self) -> bool {
        self.kind.is_none()
    }

    /// Event payload without the type field.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

impl From<&str> for Event {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for Event {
    fn from(kind: String) -> Self {
        Self::new(kind)
    }
}
