// ABOUTME: Error types for a redeploy triggered by a pushed image.
// ABOUTME: Distinguishes bad requests from pull, create and start failures.

use crate::runtime::{ContainerError, ImageError};
use crate::types::{ParseImageRefError, ServiceName};

/// Errors that abort a redeploy. Teardown failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RedeployError {
    /// The pushed repository and tag do not form a valid image reference.
    #[error("invalid image reference {image:?}: {source}")]
    InvalidImage {
        image: String,
        source: ParseImageRefError,
    },

    /// Image pull failed; nothing was touched.
    #[error("failed to pull image {image}: {source}")]
    Pull { image: String, source: ImageError },

    /// Container creation failed for a service.
    #[error("failed to create container for {service}: {source}")]
    Create {
        service: ServiceName,
        source: ContainerError,
    },

    /// Container start failed for a service.
    #[error("failed to start container for {service}: {source}")]
    Start {
        service: ServiceName,
        source: ContainerError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeployErrorKind {
    InvalidImage,
    PullFailed,
    CreateFailed,
    StartFailed,
}

impl RedeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RedeployErrorKind {
        match self {
            RedeployError::InvalidImage { .. } => RedeployErrorKind::InvalidImage,
            RedeployError::Pull { .. } => RedeployErrorKind::PullFailed,
            RedeployError::Create { .. } => RedeployErrorKind::CreateFailed,
            RedeployError::Start { .. } => RedeployErrorKind::StartFailed,
        }
    }

    /// True when the request itself was at fault rather than the engine.
    pub fn is_client_error(&self) -> bool {
        self.kind() == RedeployErrorKind::InvalidImage
    }
}
