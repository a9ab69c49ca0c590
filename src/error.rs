// ABOUTME: Top-level error types for redeploy startup and serving.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::compile::CompileError;
use crate::runtime::RuntimeError;
use crate::types::{ParseImageRefError, ServiceNameError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("interpolation failed: {0}")]
    Interpolation(String),

    #[error("{service}: image is required")]
    MissingImage { service: String },

    #[error("{service}: invalid image: {source}")]
    InvalidImage {
        service: String,
        source: ParseImageRefError,
    },

    #[error("invalid service name {service:?}: {source}")]
    InvalidServiceName {
        service: String,
        source: ServiceNameError,
    },

    #[error("{service}: {source}")]
    Compile {
        service: String,
        source: CompileError,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("failed to listen on {address}: {source}")]
    Listen {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
