//! Function types carried by transitions and enter/exit hooks.
//!
//! Reducers (including `assign` sugar and actions) transform the machine's
//! data. Effects and invokes are only ever started by the effect reconciler,
//! never by the transition engine.

use super::event::Event;
use crate::effects::EffectSender;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// `(context, data, event) -> data'`
pub type Reducer<C> = Box<dyn Fn(&C, &Value, &Event) -> Value + Send + Sync>;

/// Observer callback run inline with the reducers. Its return value is ignored.
pub type Action<C> = Box<dyn Fn(&C, &Value, &Event) + Send + Sync>;

/// Releases whatever an effect started.
pub type Disposer = Box<dyn FnOnce() + Send>;

/// `(context, data, event, send) -> disposer?`
pub type EffectFn<C> =
    Arc<dyn Fn(&C, &Value, &Event, EffectSender) -> Option<Disposer> + Send + Sync>;

/// Asynchronous function wrapped into an effect emitting `done` / `error`.
pub type InvokeFn<C> =
    Arc<dyn Fn(&C, &Value, &Event) -> BoxFuture<'static, Result<Value, InvokeError>> + Send + Sync>;

/// Build-scoped identity of an effect descriptor.
///
/// Two queue entries with the same id are the same effect re-triggered; the
/// reconciler restarts the running instance instead of running it twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId(pub u64);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// Failure reported by an invoked future.
///
/// Serialized into the payload of the synthetic `error` event as
/// `{"error": {"message": ...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct InvokeError {
    pub message: String,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Source of the partial object merged by an `assign` option.
pub enum Assign<C> {
    /// Merge the full event payload.
    Payload,
    /// Merge the result of `(context, data, payload) -> partial`.
    With(Box<dyn Fn(&C, &Value, &Map<String, Value>) -> Value + Send + Sync>),
    /// Merge a constant object.
    Value(Value),
}

impl<C: 'static> Assign<C> {
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&C, &Value, &Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        Assign::With(Box::new(f))
    }

    /// Convert into an ordinary reducer.
    pub fn into_reducer(self) -> Reducer<C> {
        match self {
            Assign::Payload => Box::new(|_: &C, data: &Value, event: &Event| {
                shallow_merge(data, &Value::Object(event.payload().clone()))
            }),
            Assign::With(f) => Box::new(move |ctx: &C, data: &Value, event: &Event| {
                let partial = f(ctx, data, event.payload());
                shallow_merge(data, &partial)
            }),
            Assign::Value(partial) => {
                Box::new(move |_: &C, data: &Value, _: &Event| shallow_merge(data, &partial))
            }
        }
    }
}

impl<C> fmt::Debug for Assign<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assign::Payload => f.write_str("Assign::Payload"),
            Assign::With(_) => f.write_str("Assign::With(..)"),
            Assign::Value(v) => write!(f, "Assign::Value({v})"),
        }
    }
}

/// Merge the keys of `partial` over `data`, later keys winning.
///
/// Non-object data is treated as an empty object. A `null` partial merges
/// nothing; any other non-object partial is ignored.
pub fn shallow_merge(data: &Value, partial: &Value) -> Value {
    let mut merged = match data {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    match partial {
        Value::Object(fields) => {
            for (key, value) in fields {
                merged.insert(key.clone(), value.clone());
            }
        }
        Value::Null => {}
        other => {
            warn!(partial = %other, "assign produced a non-object value, ignoring it");
        }
    }
    Value::Object(merged)
}
