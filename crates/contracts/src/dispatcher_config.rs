//! Dispatcher configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Name used in logs, metrics and error messages
    #[serde(default = "default_dispatcher_name")]
    pub name: String,

    /// Whether events fired by this dispatcher can be cancelled by listeners
    #[serde(default = "default_cancellable")]
    pub cancellable: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: default_dispatcher_name(),
            cancellable: default_cancellable(),
        }
    }
}

impl DispatcherConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

fn default_dispatcher_name() -> String {
    "dispatcher".to_string()
}

pub(crate) fn default_cancellable() -> bool {
    true
}
