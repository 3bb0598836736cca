//! Runtime state of a machine instance.
//!
//! The runtime state is an immutable value: every transition produces a new
//! one and never mutates the previous value in place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Active state name plus the machine's own evolving data.
///
/// `name` is `None` in the pre-initial pseudostate. `is_final` is derived by
/// the transition engine, never set by users: it is `true` whenever the
/// active node has no external transitions and no immediates.
///
/// # Example
///
/// ```rust
/// use hookstate::core::MachineState;
///
/// let state = MachineState::initial();
/// assert_eq!(state.name(), None);
/// assert!(!state.is_final);
///
/// let state = MachineState::named("idle");
/// assert_eq!(state.name(), Some("idle"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    pub name: Option<String>,
    #[serde(default = "empty_data")]
    pub data: Value,
    #[serde(rename = "final", default, skip_serializing_if = "is_false")]
    pub is_final: bool,
}

fn empty_data() -> Value {
    Value::Object(Default::default())
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Default for MachineState {
    fn default() -> Self {
        Self::initial()
    }
}

impl MachineState {
    /// The pre-initial pseudostate with empty data.
    pub fn initial() -> Self {
        Self {
            name: None,
            data: empty_data(),
            is_final: false,
        }
    }

    /// A state positioned at `name` with empty data.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::initial()
        }
    }

    /// Replace the data, returning the updated state.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the machine is still in its pre-initial pseudostate.
    pub fn is_initial(&self) -> bool {
        self.name.is_none()
    }
}
