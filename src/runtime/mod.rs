// ABOUTME: Container engine access for the redeploy sequence.
// ABOUTME: Capability traits, the bollard implementation, and startup connection.

mod bollard;
mod error;
pub mod traits;

pub use bollard::BollardRuntime;
pub use error::{ConnectionSnafu, PingSnafu, RuntimeError, RuntimeErrorKind};
pub use traits::*;

use snafu::ResultExt;
use tracing::info;

/// Connect to the engine and make sure it answers before anything is served.
pub async fn connect(docker_host: Option<&str>) -> Result<BollardRuntime, RuntimeError> {
    let runtime = BollardRuntime::connect(docker_host).context(ConnectionSnafu)?;
    runtime.ping().await.context(PingSnafu)?;

    match runtime.info().await {
        Ok(meta) => info!(
            version = %meta.version,
            api_version = %meta.api_version,
            os = %meta.os,
            arch = %meta.arch,
            "connected to container engine"
        ),
        Err(e) => info!(error = %e, "connected to container engine, version unknown"),
    }

    Ok(runtime)
}
