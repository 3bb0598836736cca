//! State nodes and the descriptors they hold.
//!
//! Descriptors are produced by the builder and never mutated afterwards.
//! Every list keeps declaration order, which is load-bearing: guard
//! tie-breaks, reducer application and effect start order all follow it.

use super::event::Event;
use super::guard::{all_pass, Guard};
use super::hooks::{EffectFn, EffectId, Reducer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// How an effect descriptor was declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    Effect,
    Invoke,
}

/// An effect with its build-scoped id.
pub struct EffectDescriptor<C> {
    pub id: EffectId,
    pub kind: EffectKind,
    pub run: EffectFn<C>,
}

impl<C> fmt::Debug for EffectDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Apply a reducer list in order.
fn reduce_all<C>(reducers: &[Reducer<C>], context: &C, data: Value, event: &Event) -> Value {
    reducers
        .iter()
        .fold(data, |data, reduce| reduce(context, &data, event))
}

/// A transition, immediate or internal transition.
///
/// `event` is `None` for immediates. For internal transitions `target` is
/// the owning state; the engine never runs enter/exit hooks for them.
pub struct TransitionDescriptor<C> {
    pub event: Option<String>,
    pub target: String,
    pub internal: bool,
    pub guards: Vec<Guard<C>>,
    pub reducers: Vec<Reducer<C>>,
    pub effects: Vec<EffectDescriptor<C>>,
}

impl<C> TransitionDescriptor<C> {
    /// Unguarded external transition without hooks.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            event: None,
            target: target.into(),
            internal: false,
            guards: Vec::new(),
            reducers: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.event.is_none()
    }

    pub fn guards_pass(&self, context: &C, data: &Value, event: &Event) -> bool {
        all_pass(&self.guards, context, data, event)
    }

    pub fn reduce(&self, context: &C, data: Value, event: &Event) -> Value {
        reduce_all(&self.reducers, context, data, event)
    }
}

impl<C> fmt::Debug for TransitionDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDescriptor")
            .field("event", &self.event)
            .field("target", &self.target)
            .field("internal", &self.internal)
            .field("guards", &self.guards.len())
            .field("reducers", &self.reducers.len())
            .field("effects", &self.effects)
            .finish()
    }
}

/// An enter or exit hook.
pub struct HookDescriptor<C> {
    pub reducers: Vec<Reducer<C>>,
    pub effects: Vec<EffectDescriptor<C>>,
}

impl<C> HookDescriptor<C> {
    pub fn reduce(&self, context: &C, data: Value, event: &Event) -> Value {
        reduce_all(&self.reducers, context, data, event)
    }
}

impl<C> fmt::Debug for HookDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDescriptor")
            .field("reducers", &self.reducers.len())
            .field("effects", &self.effects)
            .finish()
    }
}

/// A named node of the machine.
pub struct StateNode<C> {
    pub(crate) name: String,
    pub(crate) enter: Vec<HookDescriptor<C>>,
    pub(crate) exit: Vec<HookDescriptor<C>>,
    pub(crate) transitions: BTreeMap<String, Vec<TransitionDescriptor<C>>>,
    pub(crate) immediates: Vec<TransitionDescriptor<C>>,
}

impl<C> StateNode<C> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enter: Vec::new(),
            exit: Vec::new(),
            transitions: BTreeMap::new(),
            immediates: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enter(&self) -> &[HookDescriptor<C>] {
        &self.enter
    }

    pub fn exit(&self) -> &[HookDescriptor<C>] {
        &self.exit
    }

    pub fn immediates(&self) -> &[TransitionDescriptor<C>] {
        &self.immediates
    }

    /// Candidates for `event`, in declaration order.
    pub fn transitions_for(&self, event: &str) -> &[TransitionDescriptor<C>] {
        self.transitions.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All event-triggered transitions, grouped by event name.
    pub fn transitions(&self) -> impl Iterator<Item = (&str, &[TransitionDescriptor<C>])> {
        self.transitions
            .iter()
            .map(|(event, list)| (event.as_str(), list.as_slice()))
    }

    /// A node is final when nothing can ever move the machine out of it.
    pub fn is_final(&self) -> bool {
        self.immediates.is_empty()
            && self
                .transitions
                .values()
                .flatten()
                .all(|t| t.internal)
    }
}

impl<C> fmt::Debug for StateNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("enter", &self.enter)
            .field("exit", &self.exit)
            .field("transitions", &self.transitions)
            .field("immediates", &self.immediates)
            .finish()
    }
}
