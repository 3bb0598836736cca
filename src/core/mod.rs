//! Core value types of the interpreter.
//!
//! This module contains the pure part of the machine model:
//! - Events and the runtime state value
//! - Guards, reducers and the other hook function types
//! - State nodes and their transition/hook descriptors
//! - Immutable history of state changes
//!
//! Nothing in this module performs I/O or starts effects.

mod event;
mod guard;
mod history;
mod hooks;
mod node;
mod state;

pub use event::Event;
pub use guard::{all_pass, Guard};
pub use history::{StateHistory, StateTransition};
pub use hooks::{
    shallow_merge, Action, Assign, Disposer, EffectFn, EffectId, InvokeError, InvokeFn, Reducer,
};
pub use node::{EffectDescriptor, EffectKind, HookDescriptor, StateNode, TransitionDescriptor};
pub use state::MachineState;
