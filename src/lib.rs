//! Hookstate: a statechart interpreter with hook-style effects
//!
//! Hookstate follows the "pure core, imperative shell" split. Machines are
//! declared once through a description function, the transition engine is a
//! pure function from `(machine, context, state, event)` to the next state
//! plus an ordered effect queue, and only the effect reconciler starts or
//! disposes side effects.
//!
//! # Core Concepts
//!
//! - **States**: named nodes holding transitions, immediates and enter/exit hooks
//! - **Guards**: predicates that must all pass for a transition to fire
//! - **Data**: the machine's own JSON payload, changed only by reducers and assigns
//! - **Effects**: started on entry, disposed on exit, able to send events back
//! - **Invokes**: async functions wrapped into effects emitting `done` / `error`
//!
//! # Example
//!
//! ```rust
//! use hookstate::builder::{Machine, Opts};
//! use hookstate::core::Event;
//! use hookstate::effects::{Service, ServiceConfig};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! let machine: Machine<()> = Machine::build(|m| {
//!     m.state(
//!         "idle",
//!         [m.transition(
//!             "submit",
//!             "checking",
//!             Opts::new().assign_payload(),
//!         )],
//!     );
//!     m.state(
//!         "checking",
//!         [
//!             m.immediate(
//!                 "accepted",
//!                 Opts::new().guard(|_, data: &Value, _: &Event| data["name"] != json!("")),
//!             ),
//!             m.immediate("idle", Opts::new().assign_value(json!({"error": "empty name"}))),
//!         ],
//!     );
//!     m.state("accepted", []);
//! })
//! .unwrap();
//!
//! let mut service = Service::new(Arc::new(machine), (), ServiceConfig::default()).unwrap();
//! service
//!     .send(Event::new("submit").with("name", json!("hello")))
//!     .unwrap();
//!
//! assert_eq!(service.state().name(), Some("accepted"));
//! assert!(service.state().is_final);
//! ```

pub mod builder;
pub mod core;
pub mod effects;

// Re-export commonly used types
pub use builder::{BuildError, Machine, Opts};
pub use core::{Event, MachineState, StateHistory};
pub use effects::{
    apply_effects, clean_effects, transition, Service, ServiceConfig, TransitionError,
    TransitionOptions,
};
