// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Pull container images from a registry.

use crate::types::ImageRef;
use async_trait::async_trait;

/// Image operations.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Pull an image from its registry. An untagged reference pulls `latest`.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
