//! Scenario execution module.

mod listener;
mod runner;
mod stats;

pub use listener::ScriptedListener;
pub use runner::{ScenarioConfig, ScenarioRunner};
pub use stats::ScenarioStats;
