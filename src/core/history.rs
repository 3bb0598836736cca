//! State transition history tracking.
//!
//! Records every change of the active state name, following the same
//! immutable style as the rest of the core: `record` returns a new history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single change of the active state.
///
/// `from` is `None` for the bootstrap transition out of the pre-initial
/// pseudostate. `event` is the type of the event that caused the change.
///
/// # Example
///
/// ```rust
/// use hookstate::core::StateTransition;
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: Some("idle".to_string()),
///     to: "loading".to_string(),
///     event: Some("fetch".to_string()),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.to, "loading");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: Option<String>,
    pub to: String,
    pub event: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of state changes.
///
/// # Example
///
/// ```rust
/// use hookstate::core::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let history = StateHistory::new()
///     .record(StateTransition {
///         from: None,
///         to: "a".to_string(),
///         event: None,
///         timestamp: Utc::now(),
///     })
///     .record(StateTransition {
///         from: Some("a".to_string()),
///         to: "b".to_string(),
///         event: Some("go".to_string()),
///         timestamp: Utc::now(),
///     });
///
/// assert_eq!(history.get_path(), vec!["a", "b"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Append in place, then drop the oldest entries beyond `limit`.
    pub fn push_bounded(&mut self, transition: StateTransition, limit: Option<usize>) {
        self.transitions.push(transition);
        if let Some(limit) = limit {
            let excess = self.transitions.len().saturating_sub(limit);
            self.transitions.drain(..excess);
        }
    }

    /// Names of the states traversed, in order.
    ///
    /// Starts with the first transition's `from` (when there is one), then
    /// the `to` of every transition.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(from) = self.transitions.first().and_then(|t| t.from.as_deref()) {
            path.push(from);
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Time between the first and last recorded transition.
    ///
    /// Returns `None` if nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.first()?, self.transitions.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(from: Option<&str>, to: &str, timestamp: DateTime<Utc>) -> StateTransition {
        StateTransition {
            from: from.map(str::to_string),
            to: to.to_string(),
            event: Some("go".to_string()),
            timestamp,
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = StateHistory::new();
        let new_history = history.record(step(Some("a"), "b", Utc::now()));

        assert_eq!(history.len(), 0);
        assert_eq!(new_history.len(), 1);
    }

    #[test]
    fn push_bounded_drops_oldest_entries() {
        let mut history = StateHistory::new();
        history.push_bounded(step(None, "a", Utc::now()), Some(2));
        history.push_bounded(step(Some("a"), "b", Utc::now()), Some(2));
        history.push_bounded(step(Some("b"), "c", Utc::now()), Some(2));

        assert_eq!(history.len(), 2);
        assert_eq!(history.get_path(), vec!["a", "b", "c"]);

        history.push_bounded(step(Some("c"), "d", Utc::now()), None);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn path_skips_missing_bootstrap_origin() {
        let history = StateHistory::new()
            .record(step(None, "a", Utc::now()))
            .record(step(Some("a"), "b", Utc::now()));

        assert_eq!(history.get_path(), vec!["a", "b"]);
    }

    #[test]
    fn path_includes_known_origin() {
        let history = StateHistory::new()
            .record(step(Some("a"), "b", Utc::now()))
            .record(step(Some("b"), "c", Utc::now()));

        assert_eq!(history.get_path(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let start = Utc::now();
        let history = StateHistory::new()
            .record(step(None, "a", start))
            .record(step(Some("a"), "b", start + chrono::Duration::milliseconds(10)));

        assert_eq!(history.duration(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn single_transition_has_duration_zero() {
        let history = StateHistory::new().record(step(None, "a", Utc::now()));
        assert_eq!(history.duration(), Some(Duration::from_secs(0)));
    }

    #[test]
    fn history_serializes_correctly() {
        let history = StateHistory::new().record(step(Some("a"), "b", Utc::now()));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(history.transitions(), deserialized.transitions());
    }
}
