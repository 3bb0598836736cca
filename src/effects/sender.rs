//! Send handles given to the host and to running effects.

use crate::core::{EffectId, Event};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{trace, warn};

/// Entry point the reconciler uses to feed events back into a machine.
#[derive(Clone)]
pub struct Sender {
    inner: Arc<dyn Fn(Event) + Send + Sync>,
}

impl Sender {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Forward events into an unbounded channel. Events sent after the
    /// receiver is gone are dropped.
    pub fn from_channel(tx: UnboundedSender<Event>) -> Self {
        Self::new(move |event| {
            if let Err(err) = tx.send(event) {
                trace!(event = ?err.0.kind(), "receiver closed, dropping event");
            }
        })
    }

    /// Sender that discards everything.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn send(&self, event: impl Into<Event>) {
        (self.inner)(event.into())
    }
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sender(..)")
    }
}

/// Sender handed to one running effect.
///
/// Once the effect is disposed the handle is closed and every further send
/// is dropped with a warning.
#[derive(Clone)]
pub struct EffectSender {
    inner: Sender,
    effect: EffectId,
    closed: Arc<AtomicBool>,
}

impl EffectSender {
    pub(crate) fn new(inner: Sender, effect: EffectId) -> Self {
        Self {
            inner,
            effect,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn send(&self, event: impl Into<Event>) {
        let event = event.into();
        if self.is_closed() {
            warn!(
                effect = %self.effect,
                event = ?event.kind(),
                "send called from a disposed effect, ignoring event"
            );
            return;
        }
        self.inner.send(event);
    }

    pub fn effect_id(&self) -> EffectId {
        self.effect
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for EffectSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSender")
            .field("effect", &self.effect)
            .field("closed", &self.is_closed())
            .finish()
    }
}
