// ABOUTME: Turns "this image was pushed" into replaced containers.
// ABOUTME: Resolves services, pulls once, then reconciles each service under its lock.

use nonempty::NonEmpty;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::compile::CompiledService;
use crate::index::ImageIndex;
use crate::runtime::Engine;
use crate::types::ImageRef;

use super::error::RedeployError;
use super::lock::ServiceLocks;
use super::reconcile::{Reconciliation, RedeployedService};

/// Grace period given to an old container before the engine kills it.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// What a successful redeploy did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeployOutcome {
    /// No service declares the pushed image; the engine was not touched.
    Untracked { image: String },
    /// Every matching service now runs the freshly pulled image.
    Redeployed {
        image: String,
        services: Vec<RedeployedService>,
    },
}

/// Drives redeploys against one engine.
pub struct Redeployer {
    engine: Arc<dyn Engine>,
    index: Arc<ImageIndex>,
    locks: ServiceLocks,
    stop_grace: Duration,
}

impl Redeployer {
    pub fn new(engine: Arc<dyn Engine>, index: Arc<ImageIndex>) -> Self {
        Self {
            engine,
            index,
            locks: ServiceLocks::new(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Services to redeploy for `repository:tag`.
    ///
    /// A `latest` push also matches services that declare the bare repository.
    pub fn resolve(&self, repository: &str, tag: &str) -> Option<&NonEmpty<Arc<CompiledService>>> {
        let image = format!("{}:{}", repository, tag);
        self.index.resolve(&image).or_else(|| {
            if tag == "latest" {
                self.index.resolve(repository)
            } else {
                None
            }
        })
    }

    /// Pull `repository:tag` and replace the container of every service declaring it.
    ///
    /// # Errors
    ///
    /// Pull failures abort before any service is touched. Create and start failures
    /// abort the remaining services; services already replaced stay replaced.
    pub async fn redeploy(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<RedeployOutcome, RedeployError> {
        let image = format!("{}:{}", repository, tag);

        let Some(services) = self.resolve(repository, tag) else {
            warn!(image = %image, "got redeploy request for an image no service declares");
            return Ok(RedeployOutcome::Untracked { image });
        };

        let reference =
            ImageRef::with_tag(repository, tag).map_err(|source| RedeployError::InvalidImage {
                image: image.clone(),
                source,
            })?;

        debug!(image = %image, "pulling image");
        self.engine
            .pull_image(&reference)
            .await
            .map_err(|source| RedeployError::Pull {
                image: image.clone(),
                source,
            })?;

        let mut redeployed = Vec::with_capacity(services.len());
        for compiled in services.iter() {
            let _guard = self.locks.lock(compiled.name()).await;

            let done = Reconciliation::new(self.engine.as_ref(), compiled)
                .locate()
                .await
                .vacate(self.stop_grace)
                .await
                .create()
                .await?
                .start()
                .await?
                .finish();

            info!(
                service = %done.service,
                image = %image,
                container = %done.container,
                "redeployed service"
            );
            redeployed.push(done);
        }

        Ok(RedeployOutcome::Redeployed {
            image,
            services: redeployed,
        })
    }
}
