//! Host integration owning one running machine instance.

use crate::builder::Machine;
use crate::core::{Event, MachineState, StateHistory, StateTransition};
use crate::effects::reconcile::{apply_effects, clean_effects, RunningEffect};
use crate::effects::sender::Sender;
use crate::effects::transition::{transition, Step, TransitionError, TransitionOptions};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, trace};
use uuid::Uuid;

/// Configuration of a [`Service`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Event sent by [`Service::set_context`]; also rewritten into an
    /// implicit internal transition. `None` disables both.
    pub assign_event: Option<String>,
    pub record_history: bool,
    /// Most recent history entries kept; `None` keeps everything.
    pub history_limit: Option<usize>,
}

const DEFAULT_HISTORY_LIMIT: usize = 1024;

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            assign_event: TransitionOptions::default().assign_event,
            record_history: true,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
        }
    }
}

impl ServiceConfig {
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

    pub fn record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    pub fn history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    fn transition_options(&self) -> TransitionOptions {
        TransitionOptions {
            assign_event: self.assign_event.clone(),
        }
    }
}

/// Handle returned by [`Service::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&MachineState) + Send>;

/// A machine instance with its context, running effects and event queue.
///
/// Every event goes through one queue. Events sent by effects while they
/// start (or by disposers while they stop) are appended to that queue and
/// processed after the current event, in the order they were sent.
/// Completions of invoked futures arrive on the same queue and are picked
/// up by [`Service::process_next`].
///
/// Dropping the service stops it and disposes all running effects.
///
/// # Example
///
/// ```rust
/// use hookstate::builder::{Machine, Opts};
/// use hookstate::effects::{Service, ServiceConfig};
/// use std::sync::Arc;
///
/// let machine: Machine<()> = Machine::build(|m| {
///     m.state("idle", [m.transition("start", "running", Opts::new())]);
///     m.state("running", [m.transition("stop", "idle", Opts::new())]);
/// })
/// .unwrap();
///
/// let mut service = Service::new(Arc::new(machine), (), ServiceConfig::default()).unwrap();
/// assert_eq!(service.state().name(), Some("idle"));
///
/// service.send("start").unwrap();
/// assert_eq!(service.state().name(), Some("running"));
/// assert_eq!(service.history().get_path(), vec!["idle", "running"]);
/// ```
pub struct Service<C> {
    id: Uuid,
    machine: Arc<Machine<C>>,
    context: C,
    state: MachineState,
    running: Vec<RunningEffect>,
    history: StateHistory,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    config: ServiceConfig,
    options: TransitionOptions,
    sender: Sender,
    queue: UnboundedReceiver<Event>,
    stopped: bool,
}

impl<C> Service<C> {
    /// Bootstrap the machine into its initial state and start its effects.
    ///
    /// The bootstrap starts from [`Machine::initial_state`], so data seeded
    /// with `initial(..)` is visible to the first state's hooks.
    pub fn new(
        machine: Arc<Machine<C>>,
        context: C,
        config: ServiceConfig,
    ) -> Result<Self, TransitionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let options = config.transition_options();
        let state = machine.initial_state();
        let mut service = Self {
            id: Uuid::new_v4(),
            machine,
            context,
            state,
            running: Vec::new(),
            history: StateHistory::new(),
            listeners: Vec::new(),
            next_listener: 0,
            config,
            options,
            sender: Sender::from_channel(tx),
            queue: rx,
            stopped: false,
        };

        debug!(
            service = %service.id,
            states = service.machine.len(),
            "starting service"
        );
        service.process(Event::bootstrap())?;
        service.flush()?;
        Ok(service)
    }

    /// Queue `event` and process every pending event.
    ///
    /// Sends after [`Service::stop`] are ignored.
    pub fn send(&mut self, event: impl Into<Event>) -> Result<(), TransitionError> {
        if self.stopped {
            trace!(service = %self.id, "service stopped, ignoring send");
            return Ok(());
        }
        self.sender.send(event);
        self.flush()
    }

    /// Process every event already waiting in the queue.
    pub fn flush(&mut self) -> Result<(), TransitionError> {
        while !self.stopped {
            match self.queue.try_recv() {
                Ok(event) => self.process(event)?,
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// Wait for the next queued event, then process it and anything queued
    /// behind it. Returns `false` once the service is stopped.
    pub async fn process_next(&mut self) -> Result<bool, TransitionError> {
        if self.stopped {
            return Ok(false);
        }
        match self.queue.recv().await {
            Some(event) => {
                self.process(event)?;
                self.flush()?;
                Ok(!self.stopped)
            }
            None => Ok(false),
        }
    }

    /// Replace the context and notify the machine through the assign event.
    pub fn set_context(&mut self, context: C) -> Result<(), TransitionError> {
        self.context = context;
        match self.config.assign_event.clone() {
            Some(name) => self.send(Event::new(name)),
            None => Ok(()),
        }
    }

    /// Replace the machine definition, keeping state and running effects.
    ///
    /// Fails without swapping when the active state does not exist in the
    /// new machine.
    pub fn swap_machine(&mut self, machine: Arc<Machine<C>>) -> Result<(), TransitionError> {
        if let Some(name) = self.state.name() {
            if !machine.contains(name) {
                return Err(TransitionError::UnknownState(name.to_string()));
            }
        }
        debug!(service = %self.id, "machine definition swapped");
        self.machine = machine;
        Ok(())
    }

    /// Register a listener called after every state change.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&MachineState) + Send + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Dispose all running effects and ignore further events.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.listeners.clear();
        self.running = clean_effects(mem::take(&mut self.running));
        debug!(
            service = %self.id,
            state = ?self.state.name(),
            "service stopped"
        );
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn machine(&self) -> &Arc<Machine<C>> {
        &self.machine
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn running_effects(&self) -> &[RunningEffect] {
        &self.running
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// A handle feeding events into this service's queue.
    ///
    /// Events sent through it are processed on the next [`Service::flush`],
    /// [`Service::send`] or [`Service::process_next`].
    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    fn process(&mut self, event: Event) -> Result<(), TransitionError> {
        let step = transition(
            &self.machine,
            &self.context,
            &self.state,
            &event,
            &self.options,
        )?;
        self.commit(step, &event);
        Ok(())
    }

    fn commit(&mut self, step: Step<C>, event: &Event) {
        let Step { state, effects } = step;
        let changed = state != self.state;

        if self.config.record_history && state.name != self.state.name {
            if let Some(to) = state.name.clone() {
                let entry = StateTransition {
                    from: self.state.name.clone(),
                    to,
                    event: event.kind().map(str::to_string),
                    timestamp: Utc::now(),
                };
                self.history.push_bounded(entry, self.config.history_limit);
            }
        }
        if changed {
            trace!(
                service = %self.id,
                from = ?self.state.name(),
                to = ?state.name(),
                "state changed"
            );
        }
        self.state = state;

        if !effects.is_empty() {
            let running = mem::take(&mut self.running);
            self.running = apply_effects(running, effects, &self.context, &self.sender);
        }

        if changed {
            for (_, listener) in &self.listeners {
                listener(&self.state);
            }
        }
    }
}

impl<C> Drop for Service<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<C> fmt::Debug for Service<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("running", &self.running)
            .field("listeners", &self.listeners.len())
            .field("stopped", &self.stopped)
            .finish()
    }
}
