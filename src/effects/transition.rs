//! The pure transition engine.
//!
//! [`transition`] computes the next runtime state and the ordered effect
//! queue for one event. It never starts or disposes effects; the queue is
//! handed to [`apply_effects`](crate::effects::apply_effects) by the host.

use crate::builder::Machine;
use crate::core::{
    EffectDescriptor, EffectFn, EffectId, EffectKind, Event, MachineState, StateNode,
    TransitionDescriptor,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Immediate chains longer than this are treated as a cycle.
const MAX_CASCADE_DEPTH: usize = 256;

/// Options for [`transition`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionOptions {
    /// Event rewritten into an implicit internal transition when the active
    /// state declares no handler for it. `None` disables the rewrite.
    pub assign_event: Option<String>,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            assign_event: Some("assign".to_string()),
        }
    }
}

impl TransitionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign_event(mut self, name: impl Into<String>) -> Self {
        self.assign_event = Some(name.into());
        self
    }

    pub fn without_assign_event(mut self) -> Self {
        self.assign_event = None;
        self
    }

    fn is_assign_event(&self, kind: &str) -> bool {
        self.assign_event.as_deref() == Some(kind)
    }
}

/// Errors raised while applying a transition.
///
/// Machines produced by [`Machine::build`] are validated eagerly, so these
/// only surface for states that were not produced by the machine at hand.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Transition target '{target}' does not exist")]
    UnknownTarget { target: String },

    #[error("Current state '{0}' does not exist in this machine")]
    UnknownState(String),

    #[error("Immediate transitions starting at '{state}' did not settle")]
    ImmediateCycle { state: String },
}

/// A queued request to start one effect.
pub struct EffectStart<C> {
    pub id: EffectId,
    pub kind: EffectKind,
    pub run: EffectFn<C>,
    /// Data snapshot taken right after the declaring hook's reducers ran.
    pub data: Value,
    pub event: Event,
    /// State owning the started effect.
    pub target: String,
}

impl<C> Clone for EffectStart<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            run: Arc::clone(&self.run),
            data: self.data.clone(),
            event: self.event.clone(),
            target: self.target.clone(),
        }
    }
}

// `run` is identified by `id`.
impl<C> PartialEq for EffectStart<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.data == other.data
            && self.event == other.event
            && self.target == other.target
    }
}

impl<C> fmt::Debug for EffectStart<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectStart")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("data", &self.data)
            .field("event", &self.event)
            .field("target", &self.target)
            .finish()
    }
}

/// One entry of the effect queue, consumed in emission order.
pub enum EffectOp<C> {
    /// Dispose every running effect owned by `name`.
    Exit { name: String },
    Start(EffectStart<C>),
}

impl<C> EffectOp<C> {
    pub fn is_exit(&self) -> bool {
        matches!(self, EffectOp::Exit { .. })
    }
}

impl<C> Clone for EffectOp<C> {
    fn clone(&self) -> Self {
        match self {
            EffectOp::Exit { name } => EffectOp::Exit { name: name.clone() },
            EffectOp::Start(start) => EffectOp::Start(start.clone()),
        }
    }
}

impl<C> PartialEq for EffectOp<C> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EffectOp::Exit { name: a }, EffectOp::Exit { name: b }) => a == b,
            (EffectOp::Start(a), EffectOp::Start(b)) => a == b,
            _ => false,
        }
    }
}

impl<C> fmt::Debug for EffectOp<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectOp::Exit { name } => f.debug_struct("Exit").field("name", name).finish(),
            EffectOp::Start(start) => fmt::Debug::fmt(start, f),
        }
    }
}

/// Result of one call to [`transition`].
pub struct Step<C> {
    pub state: MachineState,
    pub effects: Vec<EffectOp<C>>,
}

impl<C> Step<C> {
    fn unchanged(state: &MachineState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }
}

impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            effects: self.effects.clone(),
        }
    }
}

impl<C> PartialEq for Step<C> {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.effects == other.effects
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("state", &self.state)
            .field("effects", &self.effects)
            .finish()
    }
}

/// Compute the next state and effect queue for `event`.
///
/// The bootstrap event (`kind: None`) moves the pre-initial pseudostate into
/// the first declared state. Otherwise the candidates registered for the
/// event are tried in declaration order and the first whose guards all pass
/// is applied. No match leaves the state unchanged with an empty queue.
///
/// # Example
///
/// ```rust
/// use hookstate::builder::{Machine, Opts};
/// use hookstate::core::{Event, MachineState};
/// use hookstate::effects::{apply_effects, transition, EffectOp, Sender, TransitionOptions};
///
/// let machine: Machine<()> = Machine::build(|m| {
///     m.state("a", [m.transition("go", "b", Opts::new())]);
///     m.state("b", []);
/// })
/// .unwrap();
///
/// let step = transition(
///     &machine,
///     &(),
///     &MachineState::named("a"),
///     &Event::new("go"),
///     &TransitionOptions::default(),
/// )
/// .unwrap();
///
/// assert_eq!(step.state.name(), Some("b"));
/// assert!(step.state.is_final);
///
/// // Leaving `a` always queues its exit; nothing was running, so nothing starts.
/// assert_eq!(step.effects, vec![EffectOp::Exit { name: "a".to_string() }]);
/// assert!(apply_effects(Vec::new(), step.effects, &(), &Sender::noop()).is_empty());
/// ```
pub fn transition<C>(
    machine: &Machine<C>,
    context: &C,
    state: &MachineState,
    event: &Event,
    options: &TransitionOptions,
) -> Result<Step<C>, TransitionError> {
    let Some(name) = state.name() else {
        if !event.is_bootstrap() {
            trace!(event = ?event.kind(), "machine not started, ignoring event");
            return Ok(Step::unchanged(state));
        }
        let Some(initial) = machine.initial() else {
            return Ok(Step::unchanged(state));
        };
        let bootstrap = TransitionDescriptor::to(initial.name());
        return run(
            machine,
            context,
            None,
            state.data.clone(),
            &bootstrap,
            event,
        );
    };

    let node = machine
        .node(name)
        .ok_or_else(|| TransitionError::UnknownState(name.to_string()))?;
    let Some(kind) = event.kind() else {
        return Ok(Step::unchanged(state));
    };

    let candidates = node.transitions_for(kind);
    if let Some(chosen) = candidates
        .iter()
        .find(|t| t.guards_pass(context, &state.data, event))
    {
        return run(
            machine,
            context,
            Some(node),
            state.data.clone(),
            chosen,
            event,
        );
    }

    if candidates.is_empty() && options.is_assign_event(kind) {
        let implicit = TransitionDescriptor {
            event: Some(kind.to_string()),
            internal: true,
            ..TransitionDescriptor::to(name)
        };
        return run(
            machine,
            context,
            Some(node),
            state.data.clone(),
            &implicit,
            event,
        );
    }

    trace!(state = name, event = kind, "no transition matched");
    Ok(Step::unchanged(state))
}

fn run<C>(
    machine: &Machine<C>,
    context: &C,
    current: Option<&StateNode<C>>,
    data: Value,
    chosen: &TransitionDescriptor<C>,
    event: &Event,
) -> Result<Step<C>, TransitionError> {
    let mut effects = Vec::new();
    let state = apply(
        machine,
        context,
        current,
        data,
        chosen,
        event,
        &mut effects,
        0,
    )?;
    debug!(
        from = ?current.map(StateNode::name),
        to = ?state.name(),
        event = ?event.kind(),
        effects = effects.len(),
        is_final = state.is_final,
        "transition applied"
    );
    Ok(Step { state, effects })
}

#[allow(clippy::too_many_arguments)]
fn apply<C>(
    machine: &Machine<C>,
    context: &C,
    current: Option<&StateNode<C>>,
    mut data: Value,
    chosen: &TransitionDescriptor<C>,
    event: &Event,
    effects: &mut Vec<EffectOp<C>>,
    depth: usize,
) -> Result<MachineState, TransitionError> {
    if depth > MAX_CASCADE_DEPTH {
        return Err(TransitionError::ImmediateCycle {
            state: chosen.target.clone(),
        });
    }

    let target_name = match (chosen.internal, current) {
        (true, Some(node)) => node.name(),
        _ => chosen.target.as_str(),
    };
    let target = machine
        .node(target_name)
        .ok_or_else(|| TransitionError::UnknownTarget {
            target: target_name.to_string(),
        })?;

    if !chosen.internal {
        if let Some(node) = current {
            let mut exit_effects = Vec::new();
            for hook in node.exit() {
                data = hook.reduce(context, data, event);
                queue(&mut exit_effects, &hook.effects, &data, event, target_name);
            }
            effects.push(EffectOp::Exit {
                name: node.name().to_string(),
            });
            effects.extend(exit_effects);
        }
    }

    data = chosen.reduce(context, data, event);
    queue(effects, &chosen.effects, &data, event, target_name);

    if chosen.internal {
        return Ok(settled(target, data));
    }

    for hook in target.enter() {
        data = hook.reduce(context, data, event);
        queue(effects, &hook.effects, &data, event, target_name);
    }

    if let Some(next) = target
        .immediates()
        .iter()
        .find(|t| t.guards_pass(context, &data, event))
    {
        trace!(
            from = target_name,
            to = %next.target,
            "following immediate transition"
        );
        return apply(
            machine,
            context,
            Some(target),
            data,
            next,
            event,
            effects,
            depth + 1,
        );
    }

    Ok(settled(target, data))
}

fn settled<C>(node: &StateNode<C>, data: Value) -> MachineState {
    MachineState {
        name: Some(node.name().to_string()),
        data,
        is_final: node.is_final(),
    }
}

fn queue<C>(
    effects: &mut Vec<EffectOp<C>>,
    declared: &[EffectDescriptor<C>],
    data: &Value,
    event: &Event,
    target: &str,
) {
    effects.extend(declared.iter().map(|effect| {
        EffectOp::Start(EffectStart {
            id: effect.id,
            kind: effect.kind,
            run: Arc::clone(&effect.run),
            data: data.clone(),
            event: event.clone(),
            target: target.to_string(),
        })
    }));
}
