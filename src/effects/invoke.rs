//! Wrapping of asynchronous functions into effects.

use crate::core::{Disposer, EffectFn, Event, InvokeError, InvokeFn};
use crate::effects::sender::EffectSender;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{trace, warn};

/// Event emitted when an invoked future settles.
///
/// Success becomes `{type: "done", result}` and failure becomes
/// `{type: "error", error: {message}}`.
pub fn settle_event(outcome: Result<Value, InvokeError>) -> Event {
    match outcome {
        Ok(result) => Event::new("done").with("result", result),
        Err(error) => {
            Event::new("error").with("error", json!({ "message": error.message }))
        }
    }
}

/// Turn an invoke function into an effect.
///
/// The future is created once per start and spawned on the current Tokio
/// runtime. Disposing the effect does not abort the future; its outcome is
/// dropped instead.
pub fn invoke_effect<C: 'static>(invoke: InvokeFn<C>) -> EffectFn<C> {
    Arc::new(
        move |context: &C, data: &Value, event: &Event, send: EffectSender| {
            let future = invoke(context, data, event);
            let disposed = Arc::new(AtomicBool::new(false));

            match Handle::try_current() {
                Ok(handle) => {
                    let flag = Arc::clone(&disposed);
                    handle.spawn(async move {
                        let outcome = future.await;
                        if flag.load(Ordering::Acquire) {
                            trace!(
                                effect = %send.effect_id(),
                                "invoke settled after dispose, ignoring outcome"
                            );
                            return;
                        }
                        send.send(settle_event(outcome));
                    });
                }
                Err(err) => {
                    warn!(
                        effect = %send.effect_id(),
                        error = %err,
                        "no Tokio runtime to run invoke"
                    );
                    send.send(settle_event(Err(InvokeError::new(format!(
                        "invoke requires a Tokio runtime: {err}"
                    )))));
                }
            }

            let dispose: Disposer = Box::new(move || disposed.store(true, Ordering::Release));
            Some(dispose)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EffectId;
    use crate::effects::sender::Sender;
    use futures::FutureExt;
    use tokio::sync::mpsc;

    fn invoke_ok(value: Value) -> InvokeFn<()> {
        Arc::new(move |_: &(), _: &Value, _: &Event| {
            let value = value.clone();
            async move { Ok(value) }.boxed()
        })
    }

    #[test]
    fn settle_event_shapes_payload() {
        let done = settle_event(Ok(json!({"id": 1})));
        assert_eq!(done.kind(), Some("done"));
        assert_eq!(done.get("result"), Some(&json!({"id": 1})));

        let error = settle_event(Err(InvokeError::new("Fails the first time")));
        assert_eq!(error.kind(), Some("error"));
        assert_eq!(
            error.get("error"),
            Some(&json!({"message": "Fails the first time"}))
        );
    }

    #[tokio::test]
    async fn settled_future_sends_done() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run = invoke_effect(invoke_ok(json!("hello")));
        let sender = EffectSender::new(Sender::from_channel(tx), EffectId(0));

        let _dispose = run(&(), &json!({}), &Event::new("save"), sender);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), Some("done"));
        assert_eq!(event.get("result"), Some(&json!("hello")));
    }

    #[tokio::test]
    async fn disposed_invoke_ignores_outcome() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (release, wait) = tokio::sync::oneshot::channel::<()>();
        let wait = Arc::new(std::sync::Mutex::new(Some(wait)));
        let invoke: InvokeFn<()> = Arc::new(move |_: &(), _: &Value, _: &Event| {
            let wait = wait.lock().unwrap().take();
            async move {
                if let Some(wait) = wait {
                    let _ = wait.await;
                }
                Ok(json!(1))
            }
            .boxed()
        });

        let run = invoke_effect(invoke);
        let dispose = run(
            &(),
            &json!({}),
            &Event::new("save"),
            EffectSender::new(Sender::from_channel(tx.clone()), EffectId(0)),
        )
        .unwrap();

        dispose();
        release.send(()).unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(tx);

        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn missing_runtime_reports_error_immediately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run = invoke_effect(invoke_ok(json!(1)));

        let _dispose = run(
            &(),
            &json!({}),
            &Event::new("save"),
            EffectSender::new(Sender::from_channel(tx), EffectId(0)),
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind(), Some("error"));
        assert!(event.get("error").is_some());
    }
}
