//! Errors raised while building a machine.

use thiserror::Error;

/// Errors that can occur when building a machine from its description.
///
/// All problems found during one build are collected; a single problem is
/// reported as itself, several as [`BuildError::Multiple`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("State '{state}' has a transition to state '{target}' which does not exist")]
    UnknownTarget { state: String, target: String },

    #[error("State '{0}' is declared more than once")]
    DuplicateState(String),

    #[error("State name must not be empty")]
    EmptyStateName,

    #[error("State '{state}' declares a {what} with an empty name")]
    EmptyName { state: String, what: &'static str },

    #[error(
        "State '{state}' received bare options; wrap them with transition(), immediate(), internal(), enter() or exit()"
    )]
    BareOptions { state: String },

    #[error("State '{state}' declares a guard on an {hook} hook; guards only apply to transitions")]
    GuardOnHook { state: String, hook: &'static str },

    #[error("{} problems found while building the machine: {}", .0.len(), join(.0))]
    Multiple(Vec<BuildError>),
}

impl BuildError {
    /// Collapse a list of problems into one error.
    pub(crate) fn from_many(mut errors: Vec<BuildError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            BuildError::Multiple(errors)
        }
    }
}

fn join(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
