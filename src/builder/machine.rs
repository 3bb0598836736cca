//! Machine construction from a description function.

use crate::builder::error::BuildError;
use crate::builder::options::{HookOption, Opts};
use crate::core::{
    EffectDescriptor, EffectId, EffectKind, Event, Guard, HookDescriptor, MachineState, Reducer,
    StateNode, TransitionDescriptor,
};
use crate::effects::invoke_effect;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

/// A hook produced by `enter()` / `exit()`, before it is attached to a state.
pub struct HookPart<C> {
    hook: HookDescriptor<C>,
    stray_guards: usize,
}

/// A tagged argument of [`Describe::state`].
///
/// Parts are produced by the hook builders on [`Describe`]. Converting bare
/// [`Opts`] into a part is allowed so that the mistake is reported by the
/// build instead of silently dropped.
pub enum Part<C> {
    Transition(TransitionDescriptor<C>),
    Immediate(TransitionDescriptor<C>),
    Enter(HookPart<C>),
    Exit(HookPart<C>),
    Bare(Opts<C>),
}

impl<C> From<Opts<C>> for Part<C> {
    fn from(opts: Opts<C>) -> Self {
        Part::Bare(opts)
    }
}

impl<C> fmt::Debug for Part<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Transition(t) => f.debug_tuple("Transition").field(t).finish(),
            Part::Immediate(t) => f.debug_tuple("Immediate").field(t).finish(),
            Part::Enter(h) => f.debug_tuple("Enter").field(&h.hook).finish(),
            Part::Exit(h) => f.debug_tuple("Exit").field(&h.hook).finish(),
            Part::Bare(opts) => f.debug_tuple("Bare").field(opts).finish(),
        }
    }
}

/// Options sorted into guards, reducers and effects.
struct Normalized<C> {
    guards: Vec<Guard<C>>,
    reducers: Vec<Reducer<C>>,
    effects: Vec<EffectDescriptor<C>>,
}

/// Builder API handed to the description function.
///
/// All methods take `&self`, so parts can be created inline while calling
/// [`Describe::state`]. Effect ids come from a counter owned by this value,
/// so every build numbers its effects from zero.
pub struct Describe<C> {
    nodes: RefCell<Vec<StateNode<C>>>,
    errors: RefCell<Vec<BuildError>>,
    initial_data: RefCell<Value>,
    next_effect_id: Cell<u64>,
}

impl<C: 'static> Describe<C> {
    fn new() -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            errors: RefCell::new(Vec::new()),
            initial_data: RefCell::new(Value::Object(Map::new())),
            next_effect_id: Cell::new(0),
        }
    }

    /// Seed the data a fresh instance starts with. The last call wins.
    pub fn initial(&self, data: Value) {
        *self.initial_data.borrow_mut() = data;
    }

    /// Declare a state. The first declared state is the initial state.
    pub fn state<I>(&self, name: &str, parts: I)
    where
        I: IntoIterator<Item = Part<C>>,
    {
        if name.is_empty() {
            self.errors.borrow_mut().push(BuildError::EmptyStateName);
            return;
        }
        if self.nodes.borrow().iter().any(|node| node.name() == name) {
            self.errors
                .borrow_mut()
                .push(BuildError::DuplicateState(name.to_string()));
            return;
        }

        let mut node = StateNode::new(name);
        for part in parts {
            match part {
                Part::Transition(mut transition) => {
                    let event = transition.event.clone().unwrap_or_default();
                    if event.is_empty() {
                        self.reject(name, "transition event");
                        continue;
                    }
                    if transition.internal {
                        transition.target = name.to_string();
                    } else if transition.target.is_empty() {
                        self.reject(name, "transition target");
                        continue;
                    }
                    node.transitions.entry(event).or_default().push(transition);
                }
                Part::Immediate(transition) => {
                    if transition.target.is_empty() {
                        self.reject(name, "immediate target");
                        continue;
                    }
                    node.immediates.push(transition);
                }
                Part::Enter(part) => {
                    self.check_hook(name, "enter", &part);
                    node.enter.push(part.hook);
                }
                Part::Exit(part) => {
                    self.check_hook(name, "exit", &part);
                    node.exit.push(part.hook);
                }
                Part::Bare(_) => {
                    self.errors.borrow_mut().push(BuildError::BareOptions {
                        state: name.to_string(),
                    });
                }
            }
        }
        self.nodes.borrow_mut().push(node);
    }

    /// Hook run when the state is entered through an external transition.
    pub fn enter(&self, opts: Opts<C>) -> Part<C> {
        Part::Enter(self.hook(opts))
    }

    /// Hook run when the state is left through an external transition.
    pub fn exit(&self, opts: Opts<C>) -> Part<C> {
        Part::Exit(self.hook(opts))
    }

    /// External transition taken on `event`.
    pub fn transition(&self, event: &str, target: &str, opts: Opts<C>) -> Part<C> {
        let normalized = self.normalize(opts);
        Part::Transition(TransitionDescriptor {
            event: Some(event.to_string()),
            target: target.to_string(),
            internal: false,
            guards: normalized.guards,
            reducers: normalized.reducers,
            effects: normalized.effects,
        })
    }

    /// Eventless transition evaluated right after the state is entered.
    pub fn immediate(&self, target: &str, opts: Opts<C>) -> Part<C> {
        let normalized = self.normalize(opts);
        Part::Immediate(TransitionDescriptor {
            event: None,
            target: target.to_string(),
            internal: false,
            guards: normalized.guards,
            reducers: normalized.reducers,
            effects: normalized.effects,
        })
    }

    /// Transition on `event` that stays in the state without running hooks.
    pub fn internal(&self, event: &str, opts: Opts<C>) -> Part<C> {
        let normalized = self.normalize(opts);
        Part::Transition(TransitionDescriptor {
            event: Some(event.to_string()),
            // filled in by `state()`
            target: String::new(),
            internal: true,
            guards: normalized.guards,
            reducers: normalized.reducers,
            effects: normalized.effects,
        })
    }

    fn hook(&self, opts: Opts<C>) -> HookPart<C> {
        let normalized = self.normalize(opts);
        HookPart {
            stray_guards: normalized.guards.len(),
            hook: HookDescriptor {
                reducers: normalized.reducers,
                effects: normalized.effects,
            },
        }
    }

    fn check_hook(&self, state: &str, hook: &'static str, part: &HookPart<C>) {
        if part.stray_guards > 0 {
            self.errors.borrow_mut().push(BuildError::GuardOnHook {
                state: state.to_string(),
                hook,
            });
        }
    }

    fn reject(&self, state: &str, what: &'static str) {
        self.errors.borrow_mut().push(BuildError::EmptyName {
            state: state.to_string(),
            what,
        });
    }

    fn next_id(&self) -> EffectId {
        let id = self.next_effect_id.get();
        self.next_effect_id.set(id + 1);
        EffectId(id)
    }

    fn normalize(&self, opts: Opts<C>) -> Normalized<C> {
        let mut normalized = Normalized {
            guards: Vec::new(),
            reducers: Vec::new(),
            effects: Vec::new(),
        };
        for option in opts.into_options() {
            match option {
                HookOption::Guard(guard) => normalized.guards.push(guard),
                HookOption::Reduce(reducer) => normalized.reducers.push(reducer),
                HookOption::Assign(assign) => normalized.reducers.push(assign.into_reducer()),
                HookOption::Action(action) => {
                    normalized
                        .reducers
                        .push(Box::new(move |context: &C, data: &Value, event: &Event| {
                            action(context, data, event);
                            data.clone()
                        }))
                }
                HookOption::Effect(run) => normalized.effects.push(EffectDescriptor {
                    id: self.next_id(),
                    kind: EffectKind::Effect,
                    run,
                }),
                HookOption::Invoke(invoke) => normalized.effects.push(EffectDescriptor {
                    id: self.next_id(),
                    kind: EffectKind::Invoke,
                    run: invoke_effect(invoke),
                }),
            }
        }
        normalized
    }
}

/// Immutable machine definition: state name to state node.
///
/// Built once by [`Machine::build`] and never mutated afterwards. Rebuilding
/// the description yields a fresh machine that can be swapped in.
///
/// # Example
///
/// ```rust
/// use hookstate::builder::{Machine, Opts};
///
/// let machine: Machine<()> = Machine::build(|m| {
///     m.state("a", [m.transition("go", "b", Opts::new())]);
///     m.state("b", []);
/// })
/// .unwrap();
///
/// assert_eq!(machine.initial().map(|n| n.name()), Some("a"));
/// assert!(machine.node("b").unwrap().is_final());
/// ```
pub struct Machine<C> {
    states: Vec<StateNode<C>>,
    index: HashMap<String, usize>,
    initial_data: Value,
    effect_count: u64,
}

impl<C: 'static> Machine<C> {
    /// Run `describe` once against the builder API and validate the result.
    ///
    /// Every transition and immediate target must name a declared state.
    /// All problems are collected before failing.
    pub fn build<F>(describe: F) -> Result<Self, BuildError>
    where
        F: FnOnce(&Describe<C>),
    {
        let api = Describe::new();
        describe(&api);

        let Describe {
            nodes,
            errors,
            initial_data,
            next_effect_id,
        } = api;
        let states = nodes.into_inner();
        let index: HashMap<String, usize> = states
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name().to_string(), i))
            .collect();

        match validate(&states, &index, errors.into_inner()) {
            Validation::Success(()) => {
                debug!(
                    states = states.len(),
                    effects = next_effect_id.get(),
                    "machine built"
                );
                Ok(Machine {
                    states,
                    index,
                    initial_data: initial_data.into_inner(),
                    effect_count: next_effect_id.get(),
                })
            }
            Validation::Failure(errors) => Err(BuildError::from_many(
                errors.iter().cloned().collect(),
            )),
        }
    }
}

impl<C> Machine<C> {
    /// The first declared state.
    pub fn initial(&self) -> Option<&StateNode<C>> {
        self.states.first()
    }

    /// Data a fresh instance starts with, `{}` unless seeded through
    /// [`Describe::initial`].
    pub fn initial_data(&self) -> &Value {
        &self.initial_data
    }

    /// The pre-initial pseudostate carrying [`Machine::initial_data`], ready
    /// for the bootstrap event.
    pub fn initial_state(&self) -> MachineState {
        MachineState::initial().with_data(self.initial_data.clone())
    }

    pub fn node(&self, name: &str) -> Option<&StateNode<C>> {
        self.index.get(name).map(|&i| &self.states[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// State nodes in declaration order.
    pub fn states(&self) -> &[StateNode<C>] {
        &self.states
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(StateNode::name)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of effect ids handed out while building.
    pub fn effect_count(&self) -> u64 {
        self.effect_count
    }
}

impl<C> fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("states", &self.states)
            .field("initial_data", &self.initial_data)
            .field("effect_count", &self.effect_count)
            .finish()
    }
}

/// Accumulate describe-time errors and unresolved targets.
fn validate<C>(
    states: &[StateNode<C>],
    index: &HashMap<String, usize>,
    describe_errors: Vec<BuildError>,
) -> Validation<(), NonEmptyVec<BuildError>> {
    let mut checks: Vec<Validation<(), NonEmptyVec<BuildError>>> = describe_errors
        .into_iter()
        .map(|error| Validation::fail(error))
        .collect();

    for node in states {
        let external = node
            .transitions
            .values()
            .flatten()
            .chain(node.immediates.iter())
            .filter(|t| !t.internal);
        for transition in external {
            let check = if index.contains_key(&transition.target) {
                Validation::success(())
            } else {
                Validation::fail(BuildError::UnknownTarget {
                    state: node.name().to_string(),
                    target: transition.target.clone(),
                })
            };
            checks.push(check);
        }
    }

    if checks.is_empty() {
        return Validation::success(());
    }
    Validation::all_vec(checks).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_declared_state_is_initial() {
        let machine: Machine<()> = Machine::build(|m| {
            m.state("initial", [m.transition("go", "final", Opts::new())]);
            m.state("final", []);
        })
        .unwrap();

        assert_eq!(machine.len(), 2);
        assert_eq!(machine.initial().unwrap().name(), "initial");
        assert_eq!(
            machine.state_names().collect::<Vec<_>>(),
            vec!["initial", "final"]
        );
    }

    #[test]
    fn empty_description_builds_empty_machine() {
        let machine: Machine<()> = Machine::build(|_| {}).unwrap();
        assert!(machine.is_empty());
        assert!(machine.initial().is_none());
    }

    #[test]
    fn initial_data_defaults_to_empty_object() {
        let machine: Machine<()> = Machine::build(|m| m.state("a", [])).unwrap();
        assert_eq!(machine.initial_data(), &json!({}));
    }

    #[test]
    fn last_initial_call_seeds_data() {
        let machine: Machine<()> = Machine::build(|m| {
            m.initial(json!({"a": 0}));
            m.state("a", []);
            m.initial(json!({"a": 1}));
        })
        .unwrap();

        assert_eq!(machine.initial_data(), &json!({"a": 1}));
        assert_eq!(machine.initial_state().data, json!({"a": 1}));
        assert!(machine.initial_state().is_initial());
    }

    #[test]
    fn parts_are_partitioned_by_tag() {
        let machine: Machine<()> = Machine::build(|m| {
            m.state(
                "a",
                [
                    m.enter(Opts::new().assign_value(json!({"entered": true}))),
                    m.transition("go", "b", Opts::new()),
                    m.transition("go", "c", Opts::new()),
                    m.internal("assign", Opts::new().assign_payload()),
                    m.immediate("c", Opts::new().guard(|_, _: &Value, _: &Event| false)),
                    m.exit(Opts::new()),
                ],
            );
            m.state("b", []);
            m.state("c", []);
        })
        .unwrap();

        let a = machine.node("a").unwrap();
        assert_eq!(a.enter().len(), 1);
        assert_eq!(a.exit().len(), 1);
        assert_eq!(a.immediates().len(), 1);

        let targets: Vec<_> = a
            .transitions_for("go")
            .iter()
            .map(|t| t.target.as_str())
            .collect();
        assert_eq!(targets, vec!["b", "c"]);

        let internal = &a.transitions_for("assign")[0];
        assert!(internal.internal);
        assert_eq!(internal.target, "a");
    }

    #[test]
    fn unknown_target_fails_construction() {
        let result: Result<Machine<()>, _> = Machine::build(|m| {
            m.state("a", [m.transition("go", "nowhere", Opts::new())]);
        });

        assert_eq!(
            result.unwrap_err(),
            BuildError::UnknownTarget {
                state: "a".to_string(),
                target: "nowhere".to_string(),
            }
        );
    }

    #[test]
    fn unknown_immediate_target_fails_construction() {
        let result: Result<Machine<()>, _> = Machine::build(|m| {
            m.state("a", [m.immediate("gone", Opts::new())]);
        });

        assert!(matches!(
            result,
            Err(BuildError::UnknownTarget { ref target, .. }) if target == "gone"
        ));
    }

    #[test]
    fn internal_transitions_are_exempt_from_target_validation() {
        let result: Result<Machine<()>, _> = Machine::build(|m| {
            m.state("only", [m.internal("assign", Opts::new())]);
        });
        assert!(result.is_ok());
    }

    #[test]
    fn bare_options_fail_with_state_name() {
        let result: Result<Machine<()>, _> = Machine::build(|m| {
            m.state("fourth", [Part::from(Opts::new().assign_payload())]);
        });

        assert_eq!(
            result.unwrap_err(),
            BuildError::BareOptions {
                state: "fourth".to_string()
            }
        );
    }

    #[test]
    fn guard_on_hook_is_rejected() {
        let result: Result<Machine<()>, _> = Machine::build(|m| {
            m.state(
                "a",
                [m.enter(Opts::new().guard(|_, _: &Value, _: &Event| true))],
            );
        });

        assert!(matches!(
            result,
            Err(BuildError::GuardOnHook { hook: "enter", .. })
        ));
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let result: Result<Machine<()>, _> = Machine::build(|m| {
            m.state("a", []);
            m.state("a", []);
            m.state("", []);
            m.state("b", [m.transition("", "a", Opts::new())]);
        });

        match result.unwrap_err() {
            BuildError::Multiple(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.contains(&BuildError::DuplicateState("a".to_string())));
                assert!(errors.contains(&BuildError::EmptyStateName));
                assert!(errors.contains(&BuildError::EmptyName {
                    state: "b".to_string(),
                    what: "transition event",
                }));
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn all_unknown_targets_are_reported() {
        let result: Result<Machine<()>, _> = Machine::build(|m| {
            m.state(
                "a",
                [
                    m.transition("x", "missing1", Opts::new()),
                    m.transition("y", "missing2", Opts::new()),
                ],
            );
        });

        assert!(matches!(
            result,
            Err(BuildError::Multiple(ref errors)) if errors.len() == 2
        ));
    }

    #[test]
    fn effect_ids_are_unique_and_build_scoped() {
        let describe = |m: &Describe<()>| {
            m.state(
                "a",
                [
                    m.enter(Opts::new().effect(|_, _: &Value, _: &Event, _| None)),
                    m.transition(
                        "go",
                        "a",
                        Opts::new()
                            .effect(|_, _: &Value, _: &Event, _| None)
                            .invoke(|_, _: &Value, _: &Event| async {
                                Ok::<_, String>(json!(1))
                            }),
                    ),
                ],
            );
        };

        let first = Machine::build(describe).unwrap();
        let second = Machine::build(describe).unwrap();
        assert_eq!(first.effect_count(), 3);
        assert_eq!(second.effect_count(), 3);

        let a = first.node("a").unwrap();
        let mut ids: Vec<_> = a.enter()[0].effects.iter().map(|e| e.id).collect();
        ids.extend(a.transitions_for("go")[0].effects.iter().map(|e| e.id));
        assert_eq!(ids, vec![EffectId(0), EffectId(1), EffectId(2)]);
        assert_eq!(
            a.transitions_for("go")[0].effects[1].kind,
            EffectKind::Invoke
        );
    }

    #[test]
    fn actions_run_with_reducers_and_keep_data() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let machine: Machine<()> = Machine::build(move |m| {
            let log = Arc::clone(&log);
            m.state(
                "a",
                [m.transition(
                    "go",
                    "a",
                    Opts::new()
                        .assign_value(json!({"x": 1}))
                        .action(move |_, data: &Value, _: &Event| {
                            log.lock().unwrap().push(data.clone())
                        }),
                )],
            );
        })
        .unwrap();

        let transition = &machine.node("a").unwrap().transitions_for("go")[0];
        let data = transition.reduce(&(), json!({}), &Event::new("go"));

        assert_eq!(data, json!({"x": 1}));
        assert_eq!(*seen.lock().unwrap(), vec![json!({"x": 1})]);
    }
}
