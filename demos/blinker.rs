//! A blinking indicator running a couple of patterns back to back.
//!
//! Run with: `cargo run --example blinker`

use std::thread;
use std::time::Duration;

use cadence::patterns::{BlinkPattern, Blinker};

fn run(blinker: &mut Blinker, label: &str) {
    println!("-- {label}");
    let mut lit = blinker.is_on();
    println!("   {}", if lit { "ON" } else { "off" });
    while blinker.is_blinking() {
        blinker.track().unwrap();
        if blinker.is_on() != lit {
            lit = !lit;
            println!("   {}", if lit { "ON" } else { "off" });
        }
        thread::sleep(Duration::from_millis(10));
    }
}

fn main() {
    let mut blinker = Blinker::new();
    blinker.track().unwrap();

    blinker
        .blink(&BlinkPattern::counted(Duration::from_millis(600), 4))
        .unwrap();
    run(&mut blinker, "4 cycles of 600ms, even duty");

    blinker
        .blink(
            &BlinkPattern::total_with_count(Duration::from_secs(3), 6)
                .percent_on(0.2)
                .end_off(false),
        )
        .unwrap();
    run(&mut blinker, "6 cycles over 3s, short flashes, park lit");

    println!("done: {}", if blinker.is_on() { "ON" } else { "off" });
}
