//! The effect reconciler: the only place effects are started or disposed.

use crate::core::{Disposer, EffectId};
use crate::effects::sender::{EffectSender, Sender};
use crate::effects::transition::EffectOp;
use std::fmt;
use tracing::{debug, trace};

/// An effect started by [`apply_effects`] and not yet disposed.
pub struct RunningEffect {
    id: EffectId,
    target: String,
    dispose: Option<Disposer>,
    sender: EffectSender,
    disposed: bool,
}

impl RunningEffect {
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// State owning this effect.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Run the disposer once, then close the effect's sender.
    ///
    /// The disposer itself may still send.
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
        self.sender.close();
        trace!(effect = %self.id, target = %self.target, "effect disposed");
    }
}

impl fmt::Debug for RunningEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningEffect")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Consume an effect queue in order and return the new running set.
///
/// An `Exit` op disposes every effect owned by the exited state, most
/// recently started first. A `Start` op disposes a running effect with the
/// same id before starting the new instance. Disposed entries are dropped
/// from the returned set.
pub fn apply_effects<C>(
    running: Vec<RunningEffect>,
    queue: Vec<EffectOp<C>>,
    context: &C,
    send: &Sender,
) -> Vec<RunningEffect> {
    let mut running = running;

    for op in queue {
        match op {
            EffectOp::Exit { name } => {
                running
                    .iter_mut()
                    .rev()
                    .filter(|effect| effect.target == name)
                    .for_each(RunningEffect::dispose);
            }
            EffectOp::Start(start) => {
                running
                    .iter_mut()
                    .filter(|effect| effect.id == start.id)
                    .for_each(RunningEffect::dispose);

                let sender = EffectSender::new(send.clone(), start.id);
                let dispose = (start.run)(context, &start.data, &start.event, sender.clone());
                trace!(
                    effect = %start.id,
                    kind = ?start.kind,
                    target = %start.target,
                    "effect started"
                );
                running.push(RunningEffect {
                    id: start.id,
                    target: start.target,
                    dispose,
                    sender,
                    disposed: false,
                });
            }
        }
    }

    running.retain(|effect| !effect.disposed);
    running
}

/// Dispose every running effect, most recently started first.
pub fn clean_effects(running: Vec<RunningEffect>) -> Vec<RunningEffect> {
    if !running.is_empty() {
        debug!(effects = running.len(), "cleaning up running effects");
    }
    let mut running = running;
    running.iter_mut().rev().for_each(RunningEffect::dispose);
    Vec::new()
}
