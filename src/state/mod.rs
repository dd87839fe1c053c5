//! State module for tracking harvest progress
//!
//! - `RunState`: lifecycle of a single harvest run (idle, running, stopping, done)
//! - `StopReason`: why the collection loop stopped

mod run_state;

pub use run_state::{RunState, StopReason};
