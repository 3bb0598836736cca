//! Transition engine, effect reconciler and host integration.
//!
//! This module is the imperative shell around the pure core:
//!
//! - **Transition engine**: [`transition`] computes the next state and an
//!   ordered effect queue. It performs no I/O.
//! - **Effect reconciler**: [`apply_effects`] consumes that queue, starting
//!   and disposing effects; [`clean_effects`] tears everything down.
//! - **Service**: [`Service`] owns one machine instance and serializes every
//!   event, including those sent by running effects.

mod invoke;
mod reconcile;
mod sender;
mod service;
mod transition;

pub use invoke::{invoke_effect, settle_event};
pub use reconcile::{apply_effects, clean_effects, RunningEffect};
pub use sender::{EffectSender, Sender};
pub use service::{ListenerId, Service, ServiceConfig};
pub use transition::{transition, EffectOp, EffectStart, Step, TransitionError, TransitionOptions};
