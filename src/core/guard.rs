//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions of the context, the machine data and the
//! triggering event. A transition fires only if all of its guards pass.

use super::event::Event;
use serde_json::Value;

/// Pure predicate that determines if a transition can fire.
///
/// # Example
///
/// ```rust
/// use hookstate::core::{Event, Guard};
/// use serde_json::json;
///
/// struct Props {
///     limit: i64,
/// }
///
/// let under_limit = Guard::new(|props: &Props, data: &serde_json::Value, _: &Event| {
///     data["count"].as_i64().unwrap_or(0) < props.limit
/// });
///
/// let props = Props { limit: 3 };
/// assert!(under_limit.check(&props, &json!({"count": 2}), &Event::new("inc")));
/// assert!(!under_limit.check(&props, &json!({"count": 3}), &Event::new("inc")));
/// ```
pub struct Guard<C> {
    predicate: Box<dyn Fn(&C, &Value, &Event) -> bool + Send + Sync>,
}

impl<C> Guard<C> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and free of side effects; guard
    /// evaluation order is only defined by declaration order.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Value, &Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    pub fn check(&self, context: &C, data: &Value, event: &Event) -> bool {
        (self.predicate)(context, data, event)
    }
}

impl<C> std::fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard")
    }
}

/// Check a guard list: an empty list always passes.
pub fn all_pass<C>(guards: &[Guard<C>], context: &C, data: &Value, event: &Event) -> bool {
    guards.iter().all(|g| g.check(context, data, event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Ctx {
        threshold: i64,
    }

    fn large() -> Guard<Ctx> {
        Guard::new(|ctx: &Ctx, data: &Value, _: &Event| {
            data["n"].as_i64().unwrap_or(0) >= ctx.threshold
        })
    }

    #[test]
    fn guard_reads_context_and_data() {
        let ctx = Ctx { threshold: 3 };
        let event = Event::new("check");

        assert!(large().check(&ctx, &json!({"n": 3}), &event));
        assert!(!large().check(&ctx, &json!({"n": 2}), &event));
    }

    #[test]
    fn guard_reads_event_payload() {
        let guard = Guard::new(|_: &(), _: &Value, event: &Event| {
            event.get("ok") == Some(&json!(true))
        });
        let confirmed = Event::new("e").with("ok", json!(true));

        assert!(guard.check(&(), &json!({}), &confirmed));
        assert!(!guard.check(&(), &json!({}), &Event::new("e")));
    }

    #[test]
    fn empty_guard_list_passes() {
        assert!(all_pass::<()>(&[], &(), &json!({}), &Event::new("e")));
    }

    #[test]
    fn all_guards_must_pass() {
        let ctx = Ctx { threshold: 1 };
        let event = Event::new("e");
        let never = Guard::new(|_: &Ctx, _: &Value, _: &Event| false);

        assert!(all_pass(&[large()], &ctx, &json!({"n": 1}), &event));
        assert!(!all_pass(&[large(), never], &ctx, &json!({"n": 1}), &event));
    }

    #[test]
    fn guard_is_deterministic() {
        let ctx = Ctx { threshold: 2 };
        let data = json!({"n": 5});
        let event = Event::new("e");
        let guard = large();

        let first = guard.check(&ctx, &data, &event);
        assert_eq!(first, guard.check(&ctx, &data, &event));
    }
}
