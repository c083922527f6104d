//! Ready-made machines built on the core engine.

mod blinker;

pub use blinker::{BlinkError, BlinkPattern, BlinkPlan, Blinker};
