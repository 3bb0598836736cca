//! Traffic Light State Machine
//!
//! This example demonstrates a simple cyclic machine driven by a service.
//!
//! Key concepts:
//! - Cyclic state transitions (states repeat)
//! - Enter effects started and disposed with their state
//! - An internal transition counting cars without restarting effects
//! - Transition history
//!
//! Run with: cargo run --example traffic_light

use hookstate::builder::{Machine, Opts};
use hookstate::core::{Disposer, Event, MachineState};
use hookstate::effects::{EffectSender, Service, ServiceConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn lamp(
    color: &'static str,
) -> impl Fn(&(), &Value, &Event, EffectSender) -> Option<Disposer> + Send + Sync + 'static {
    move |_: &(), _: &Value, _: &Event, _: EffectSender| {
        println!("  [{color} lamp on]");
        let dispose: Disposer = Box::new(move || println!("  [{color} lamp off]"));
        Some(dispose)
    }
}

fn count_car() -> Opts<()> {
    Opts::new().reduce(|_, data: &Value, _: &Event| {
        let cars = data["cars"].as_u64().unwrap_or(0) + 1;
        json!({ "cars": cars })
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Traffic Light State Machine ===\n");

    let machine: Machine<()> = Machine::build(|m| {
        m.initial(json!({ "cars": 0 }));
        m.state(
            "red",
            [
                m.enter(Opts::new().effect(lamp("red"))),
                m.transition("timer", "green", Opts::new()),
            ],
        );
        m.state(
            "green",
            [
                m.enter(Opts::new().effect(lamp("green"))),
                m.internal("car", count_car()),
                m.transition("timer", "yellow", Opts::new()),
            ],
        );
        m.state(
            "yellow",
            [
                m.enter(Opts::new().effect(lamp("yellow"))),
                m.transition("timer", "red", Opts::new()),
            ],
        );
    })
    .expect("traffic light machine is valid");

    let mut service = Service::new(Arc::new(machine), (), ServiceConfig::default())
        .expect("bootstrap succeeds");
    service.subscribe(|state: &MachineState| {
        println!("State: {:?} data: {}", state.name(), state.data);
    });

    for event in ["timer", "car", "car", "timer", "timer", "timer"] {
        println!("-> {event}");
        service.send(event).expect("transition succeeds");
    }

    println!("\nPath: {:?}", service.history().get_path());
    println!("Final: {}", service.state().is_final);

    service.stop();
    println!("\n=== Example Complete ===");
}
