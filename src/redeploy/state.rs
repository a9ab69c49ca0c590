// ABOUTME: Reconciliation state marker types for the type state pattern.
// ABOUTME: Each state carries the container IDs known at that point.

use crate::types::ContainerId;

/// Nothing queried yet.
/// Available actions: `locate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// Engine queried for a container holding the service's name.
/// Available actions: `vacate()`
#[derive(Debug, Clone)]
pub struct Located {
    pub(crate) existing: Option<ContainerId>,
}

/// Old container stopped and removed, or teardown attempted and logged.
/// Available actions: `create()`
#[derive(Debug, Clone)]
pub struct Vacated {
    pub(crate) replaced: Option<ContainerId>,
}

/// Replacement container created.
/// Available actions: `start()`
#[derive(Debug, Clone)]
pub struct Created {
    pub(crate) replaced: Option<ContainerId>,
    pub(crate) container: ContainerId,
}

/// Replacement container running.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Started {
    pub(crate) replaced: Option<ContainerId>,
    pub(crate) container: ContainerId,
}
