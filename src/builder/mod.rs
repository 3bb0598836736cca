//! Builder API for declaring machines.
//!
//! A machine is declared by a description function that receives a
//! [`Describe`] handle. Hook builders (`transition`, `immediate`,
//! `internal`, `enter`, `exit`) turn [`Opts`] into tagged parts, and
//! `state` groups them under a state name. [`Machine::build`] runs the
//! description once and validates every target.

pub mod error;
pub mod machine;
pub mod options;

pub use error::BuildError;
pub use machine::{Describe, HookPart, Machine, Part};
pub use options::{HookOption, Opts};
