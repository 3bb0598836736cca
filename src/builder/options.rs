//! Option builder shared by transitions and enter/exit hooks.

use crate::core::{
    Action, Assign, Disposer, EffectFn, Event, Guard, InvokeError, InvokeFn, Reducer,
};
use crate::effects::EffectSender;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// One declared option, in the order it was added.
pub enum HookOption<C> {
    Guard(Guard<C>),
    Reduce(Reducer<C>),
    Assign(Assign<C>),
    Action(Action<C>),
    Effect(EffectFn<C>),
    Invoke(InvokeFn<C>),
}

impl<C> HookOption<C> {
    pub fn kind(&self) -> &'static str {
        match self {
            HookOption::Guard(_) => "guard",
            HookOption::Reduce(_) => "reduce",
            HookOption::Assign(_) => "assign",
            HookOption::Action(_) => "action",
            HookOption::Effect(_) => "effect",
            HookOption::Invoke(_) => "invoke",
        }
    }
}

impl<C> fmt::Debug for HookOption<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookOption::{}", self.kind())
    }
}

/// Options for a transition, immediate, internal transition or hook.
///
/// Options keep the order they were added in: reducers, assigns and actions
/// run in that order, and effects start in that order.
///
/// # Example
///
/// ```rust
/// use hookstate::builder::Opts;
/// use serde_json::{json, Value};
/// use hookstate::core::Event;
///
/// let opts: Opts<()> = Opts::new()
///     .guard(|_, data: &Value, _: &Event| data["ready"] == json!(true))
///     .assign_payload()
///     .assign_value(json!({"error": null}));
/// assert_eq!(opts.len(), 3);
/// ```
pub struct Opts<C> {
    options: Vec<HookOption<C>>,
}

impl<C> Default for Opts<C> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for Opts<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.options).finish()
    }
}

impl<C: 'static> Opts<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard<F>(self, predicate: F) -> Self
    where
        F: Fn(&C, &Value, &Event) -> bool + Send + Sync + 'static,
    {
        self.push(HookOption::Guard(Guard::new(predicate)))
    }

    pub fn reduce<F>(self, reducer: F) -> Self
    where
        F: Fn(&C, &Value, &Event) -> Value + Send + Sync + 'static,
    {
        self.push(HookOption::Reduce(Box::new(reducer)))
    }

    pub fn assign(self, assign: Assign<C>) -> Self {
        self.push(HookOption::Assign(assign))
    }

    /// Merge the event payload into the data.
    pub fn assign_payload(self) -> Self {
        self.assign(Assign::Payload)
    }

    /// Merge `(context, data, payload) -> partial` into the data.
    pub fn assign_with<F>(self, f: F) -> Self
    where
        F: Fn(&C, &Value, &Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        self.assign(Assign::with(f))
    }

    /// Merge a constant object into the data.
    pub fn assign_value(self, value: Value) -> Self {
        self.assign(Assign::Value(value))
    }

    pub fn action<F>(self, action: F) -> Self
    where
        F: Fn(&C, &Value, &Event) + Send + Sync + 'static,
    {
        self.push(HookOption::Action(Box::new(action)))
    }

    /// Side effect started by the reconciler, returning an optional disposer.
    pub fn effect<F>(self, effect: F) -> Self
    where
        F: Fn(&C, &Value, &Event, EffectSender) -> Option<Disposer> + Send + Sync + 'static,
    {
        self.push(HookOption::Effect(Arc::new(effect)))
    }

    /// Asynchronous function run as an effect.
    ///
    /// On success the machine receives `{type: "done", result}`; on failure
    /// `{type: "error", error: {message}}`. A settlement arriving after the
    /// owning state was left is ignored.
    pub fn invoke<F, Fut, T, E>(self, f: F) -> Self
    where
        F: Fn(&C, &Value, &Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let invoke: InvokeFn<C> = Arc::new(move |context: &C, data: &Value, event: &Event| {
            let future = f(context, data, event);
            async move {
                match future.await {
                    Ok(result) => serde_json::to_value(result)
                        .map_err(|err| InvokeError::new(err.to_string())),
                    Err(err) => Err(InvokeError::new(err.to_string())),
                }
            }
            .boxed()
        });
        self.push(HookOption::Invoke(invoke))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub(crate) fn into_options(self) -> Vec<HookOption<C>> {
        self.options
    }

    fn push(mut self, option: HookOption<C>) -> Self {
        self.options.push(option);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_keep_declaration_order() {
        let opts: Opts<()> = Opts::new()
            .assign_payload()
            .reduce(|_, data: &Value, _: &Event| data.clone())
            .action(|_, _: &Value, _: &Event| {})
            .effect(|_, _: &Value, _: &Event, _| None)
            .guard(|_, _: &Value, _: &Event| true);

        let kinds: Vec<_> = opts.into_options().iter().map(HookOption::kind).collect();
        assert_eq!(kinds, vec!["assign", "reduce", "action", "effect", "guard"]);
    }

    #[test]
    fn empty_opts_is_default() {
        let opts: Opts<()> = Opts::default();
        assert!(opts.is_empty());
    }

    #[tokio::test]
    async fn invoke_wraps_success_and_failure() {
        let opts: Opts<()> = Opts::new()
            .invoke(|_, _: &Value, _: &Event| async { Ok::<_, String>(json!({"id": 1})) })
            .invoke(|_, _: &Value, _: &Event| async { Err::<Value, _>("boom") });

        let mut results = Vec::new();
        for option in opts.into_options() {
            match option {
                HookOption::Invoke(invoke) => {
                    results.push(invoke(&(), &json!({}), &Event::new("go")).await)
                }
                other => panic!("unexpected option {other:?}"),
            }
        }

        assert_eq!(results[0], Ok(json!({"id": 1})));
        assert_eq!(results[1], Err(InvokeError::new("boom")));
    }
}
