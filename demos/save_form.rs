//! Save Form Example
//!
//! This example demonstrates invoking an async function from a state.
//!
//! Key concepts:
//! - `invoke` wraps a future into an effect
//! - `done` / `error` events drive ordinary transitions
//! - Guards and immediates validating input before saving
//! - Context changes delivered through the assign event
//!
//! Run with: RUST_LOG=hookstate=debug cargo run --example save_form

use hookstate::builder::{Machine, Opts};
use hookstate::core::Event;
use hookstate::effects::{Service, ServiceConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct Form {
    max_length: usize,
}

async fn save(name: String) -> Result<Value, String> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    if name.starts_with('!') {
        return Err(format!("'{name}' is not a valid name"));
    }
    Ok(json!({ "id": 1, "name": name }))
}

fn name_of(data: &Value) -> &str {
    data["name"].as_str().unwrap_or_default()
}

fn describe() -> Machine<Form> {
    Machine::build(|m| {
        m.state(
            "editing",
            [
                m.internal("assign", Opts::new().assign_value(json!({ "error": null }))),
                m.transition("submit", "validating", Opts::new().assign_payload()),
            ],
        );
        m.state(
            "validating",
            [
                m.immediate(
                    "saving",
                    Opts::new().guard(|form: &Form, data: &Value, _: &Event| {
                        let name = name_of(data);
                        !name.is_empty() && name.len() <= form.max_length
                    }),
                ),
                m.immediate(
                    "editing",
                    Opts::new().assign_value(json!({ "error": { "message": "invalid length" } })),
                ),
            ],
        );
        m.state(
            "saving",
            [
                m.enter(Opts::new().invoke(|_: &Form, data: &Value, _: &Event| {
                    save(name_of(data).to_string())
                })),
                m.transition(
                    "done",
                    "saved",
                    Opts::new().assign_payload().assign_value(json!({ "error": null })),
                ),
                m.transition("error", "editing", Opts::new().assign_payload()),
            ],
        );
        m.state("saved", []);
    })
    .expect("form machine is valid")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Save Form Example ===\n");

    let mut service = Service::new(
        Arc::new(describe()),
        Form { max_length: 3 },
        ServiceConfig::default(),
    )
    .expect("bootstrap succeeds");

    service
        .send(Event::new("submit").with("name", json!("hello")))
        .expect("transition succeeds");
    println!(
        "Too long:  {:?} {}",
        service.state().name(),
        service.state().data
    );

    service
        .set_context(Form { max_length: 10 })
        .expect("assign succeeds");
    println!(
        "Relaxed:   {:?} {}",
        service.state().name(),
        service.state().data
    );

    service
        .send(Event::new("submit").with("name", json!("!oops")))
        .expect("transition succeeds");
    println!("Saving:    {:?}", service.state().name());
    service.process_next().await.expect("error handled");
    println!(
        "Rejected:  {:?} {}",
        service.state().name(),
        service.state().data
    );

    service
        .send(Event::new("submit").with("name", json!("hello")))
        .expect("transition succeeds");
    service.process_next().await.expect("done handled");
    println!(
        "Saved:     {:?} {}",
        service.state().name(),
        service.state().data
    );

    println!("\nPath: {:?}", service.history().get_path());
    println!("\n=== Example Complete ===");
}
