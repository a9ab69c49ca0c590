// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ImageOps, ContainerOps, RuntimeInfo and the combined Engine.

mod container;
mod image;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the redeploy sequence needs from an engine.
pub trait Engine: ImageOps + ContainerOps + RuntimeInfo {}

impl<T: ImageOps + ContainerOps + RuntimeInfo> Engine for T {}
