//! Listener priority
//!
//! Higher priorities run first. Any real value is accepted, including the
//! infinite sentinels; NaN is representable here but rejected on connect.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Totally ordered listener priority
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(f64);

impl Priority {
    /// Runs before every finite priority
    pub const HIGHEST: Priority = Priority(f64::INFINITY);
    /// Runs after every finite priority
    pub const LOWEST: Priority = Priority(f64::NEG_INFINITY);
    /// Default priority (0)
    pub const DEFAULT: Priority = Priority(0.0);

    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// NaN priorities cannot be placed in the listener order
    pub fn is_valid(self) -> bool {
        !self.0.is_nan()
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        // -0.0 and 0.0 compare equal so they share a FIFO tie-break
        if self.0 == other.0 {
            Ordering::Equal
        } else {
            self.0.total_cmp(&other.0)
        }
    }
}

impl From<f64> for Priority {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<f32> for Priority {
    fn from(value: f32) -> Self {
        Self(f64::from(value))
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(f64::from(value))
    }
}

impl From<u32> for Priority {
    fn from(value: u32) -> Self {
        Self(f64::from(value))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == f64::INFINITY {
            write!(f, "highest")
        } else if self.0 == f64::NEG_INFINITY {
            write!(f, "lowest")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
