// ABOUTME: Per-service reconciliation using the type state pattern.
// ABOUTME: locate -> vacate -> create -> start; teardown never aborts, create and start do.

use std::time::Duration;
use tracing::{debug, warn};

use crate::compile::CompiledService;
use crate::runtime::Engine;
use crate::types::{ContainerId, ServiceName};

use super::error::RedeployError;
use super::state::{Created, Located, Pending, Started, Vacated};

/// A service whose container was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeployedService {
    pub service: ServiceName,
    /// The new, running container.
    pub container: ContainerId,
    /// The container that held the name before, if any.
    pub replaced: Option<ContainerId>,
}

/// One service being moved onto a freshly pulled image, parameterized by its state.
pub struct Reconciliation<'a, S> {
    engine: &'a dyn Engine,
    service: &'a CompiledService,
    state: S,
}

impl<'a, S> Reconciliation<'a, S> {
    fn transition<T>(self, state: T) -> Reconciliation<'a, T> {
        Reconciliation {
            engine: self.engine,
            service: self.service,
            state,
        }
    }

    pub fn service_name(&self) -> &ServiceName {
        self.service.name()
    }
}

impl<'a> Reconciliation<'a, Pending> {
    pub fn new(engine: &'a dyn Engine, service: &'a CompiledService) -> Self {
        Self {
            engine,
            service,
            state: Pending,
        }
    }

    /// Find the first container, running or not, listed under the service's name.
    ///
    /// A listing failure is logged and treated as "no existing container". A listed
    /// container without an id cannot be stopped or removed, so it is skipped.
    #[must_use = "reconciliation state must be used"]
    pub async fn locate(self) -> Reconciliation<'a, Located> {
        let wanted = self.service.name().container_name();

        let existing = match self.engine.list_containers(true).await {
            Ok(containers) => {
                debug!(service = %self.service_name(), "listed containers");
                containers
                    .into_iter()
                    .find(|c| c.has_name(&wanted) && !c.id.is_empty())
                    .map(|c| c.id)
            }
            Err(e) => {
                warn!(
                    service = %self.service_name(),
                    error = %e,
                    "failed to list containers, continuing"
                );
                None
            }
        };

        if let Some(ref id) = existing {
            debug!(service = %self.service_name(), container = %id, "found existing container");
        }

        self.transition(Located { existing })
    }
}

impl<'a> Reconciliation<'a, Located> {
    /// Stop and remove the existing container.
    ///
    /// Failures are logged and the sequence continues; the create that follows
    /// may then collide with the old name.
    #[must_use = "reconciliation state must be used"]
    pub async fn vacate(self, grace: Duration) -> Reconciliation<'a, Vacated> {
        let Some(id) = self.state.existing.clone() else {
            return self.transition(Vacated { replaced: None });
        };
        let service = self.service_name().clone();

        match self.engine.stop_container(&id, grace).await {
            Ok(()) => debug!(service = %service, container = %id, "stopped existing container"),
            Err(e) => warn!(
                service = %service,
                container = %id,
                error = %e,
                "failed to stop existing container, continuing"
            ),
        }

        match self.engine.remove_container(&id, false).await {
            Ok(()) => debug!(service = %service, container = %id, "removed existing container"),
            Err(e) => warn!(
                service = %service,
                container = %id,
                error = %e,
                "failed to remove existing container, continuing"
            ),
        }

        self.transition(Vacated { replaced: Some(id) })
    }
}

impl<'a> Reconciliation<'a, Vacated> {
    /// Create the replacement from the precompiled specification.
    ///
    /// # Errors
    ///
    /// Returns `RedeployError::Create` if the engine refuses the container.
    pub async fn create(self) -> Result<Reconciliation<'a, Created>, RedeployError> {
        let name = self.service_name().clone();
        let container = self
            .engine
            .create_container(name.as_str(), &self.service.spec)
            .await
            .map_err(|source| RedeployError::Create {
                service: name.clone(),
                source,
            })?;

        debug!(service = %name, container = %container, "created container");
        let replaced = self.state.replaced.clone();
        Ok(self.transition(Created {
            replaced,
            container,
        }))
    }
}

impl<'a> Reconciliation<'a, Created> {
    /// Start the replacement. A created-but-unstarted container is left in place.
    ///
    /// # Errors
    ///
    /// Returns `RedeployError::Start` if the engine fails to start it.
    pub async fn start(self) -> Result<Reconciliation<'a, Started>, RedeployError> {
        let name = self.service_name().clone();
        self.engine
            .start_container(&self.state.container)
            .await
            .map_err(|source| RedeployError::Start {
                service: name.clone(),
                source,
            })?;

        debug!(service = %name, container = %self.state.container, "started container");
        let Created {
            replaced,
            container,
        } = self.state.clone();
        Ok(self.transition(Started {
            replaced,
            container,
        }))
    }
}

impl Reconciliation<'_, Started> {
    pub fn finish(self) -> RedeployedService {
        RedeployedService {
            service: self.service.name().clone(),
            container: self.state.container,
            replaced: self.state.replaced,
        }
    }
}
