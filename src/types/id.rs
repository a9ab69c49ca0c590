// ABOUTME: Opaque container identifier reported by the container engine.
// ABOUTME: Keeps engine ids from being confused with service or image names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a container as assigned by the engine.
///
/// The value is never interpreted; it is only handed back to the engine
/// in stop/remove/start calls.
#[must_use = "IDs reference resources and should not be ignored"]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Engines may report containers without an id; those cannot be acted upon.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
