//! A three-phase traffic light driven by dwell-time transitions.
//!
//! Run with: `cargo run --example traffic_light`

use std::time::Duration;

use cadence::builder::{timed_transition, StateBuilder};
use cadence::core::Layout;
use cadence::machine::FiniteStateMachine;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

fn lamp(color: &'static str, label: &'static str) -> impl FnMut() {
    move || println!("{color}● {label}{RESET}")
}

fn main() {
    let mut layout = Layout::new();
    let red = layout
        .add_state(StateBuilder::new("red").entering(lamp(RED, "red")).build())
        .unwrap();
    let green = layout
        .add_state(
            StateBuilder::new("green")
                .entering(lamp(GREEN, "green"))
                .build(),
        )
        .unwrap();
    let yellow = layout
        .add_state(
            StateBuilder::new("yellow")
                .entering(lamp(YELLOW, "yellow"))
                .build(),
        )
        .unwrap();

    layout
        .add_transition(red, timed_transition(green, red, Duration::from_secs(5)))
        .unwrap();
    layout
        .add_transition(green, timed_transition(yellow, green, Duration::from_secs(4)))
        .unwrap();
    layout
        .add_transition(yellow, timed_transition(red, yellow, Duration::from_secs(1)))
        .unwrap();
    layout.set_initial(red).unwrap();

    let mut machine = FiniteStateMachine::new(layout).unwrap();
    println!("cycling for 15 seconds...");
    machine
        .start(true, Some(Duration::from_secs(15)))
        .unwrap();

    println!("\nrecent transitions:");
    for record in machine.transition_log().iter() {
        let layout = machine.layout();
        let from = layout.state(record.from).map(|s| s.name()).unwrap_or("?");
        let to = layout.state(record.to).map(|s| s.name()).unwrap_or("?");
        println!("  tick {:>6}  {from} -> {to}", record.tick);
    }
}
