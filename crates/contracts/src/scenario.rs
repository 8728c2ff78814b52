//! ScenarioBlueprint - Config Loader output
//!
//! Describes a scripted run: which dispatchers exist, which listeners they
//! carry, and which values are fired at them in order.

use serde::{Deserialize, Serialize};

use crate::{DispatcherConfig, Priority};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete scenario blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Dispatcher definitions
    pub dispatchers: Vec<DispatcherSpec>,

    /// Fires, executed in declaration order
    #[serde(default)]
    pub fires: Vec<FireSpec>,
}

/// One dispatcher and its listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSpec {
    /// Dispatcher name (unique within the scenario)
    pub name: String,

    /// Whether listeners may cancel fired events
    #[serde(default = "crate::dispatcher_config::default_cancellable")]
    pub cancellable: bool,

    /// Listeners, connected in declaration order
    #[serde(default)]
    pub listeners: Vec<ListenerSpec>,
}

impl DispatcherSpec {
    pub fn to_dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            name: self.name.clone(),
            cancellable: self.cancellable,
        }
    }
}

/// A scripted listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerSpec {
    /// Listener name (unique within its dispatcher)
    pub name: String,

    /// Ordering priority, higher runs first
    #[serde(default)]
    pub priority: Priority,

    /// Disconnect after the first invocation
    #[serde(default)]
    pub once: bool,

    /// Suspend for this long before acting
    #[serde(default)]
    pub delay_ms: u64,

    /// What the listener does once it resumes
    #[serde(default)]
    pub action: ListenerAction,
}

/// Scripted listener behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerAction {
    /// Log the payload
    #[default]
    Log,
    /// Log, then stop propagation
    CancelEvent,
    /// Return an error
    Fail,
}

/// A scripted fire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireSpec {
    /// Target dispatcher name
    pub dispatcher: String,

    /// Fired value
    #[serde(default)]
    pub payload: String,

    /// Cancel the dispatcher from outside after this delay
    #[serde(default)]
    pub cancel_after_ms: Option<u64>,

    /// Number of times to fire the payload
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}

impl ScenarioBlueprint {
    /// Look up a dispatcher definition by name
    pub fn dispatcher(&self, name: &str) -> Option<&DispatcherSpec> {
        self.dispatchers.iter().find(|d| d.name == name)
    }

    /// Total listeners across all dispatchers
    pub fn listener_count(&self) -> usize {
        self.dispatchers.iter().map(|d| d.listeners.len()).sum()
    }

    /// Total fire calls, counting repeats
    pub fn fire_count(&self) -> u64 {
        self.fires.iter().map(|f| u64::from(f.repeat)).sum()
    }
}
