// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Unifies engine connection and ping failures for startup handling.

use snafu::Snafu;

use super::traits::RuntimeInfoError;

/// Unified runtime error for connecting to the engine at startup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime connection failed: {source}"))]
    Connection { source: RuntimeInfoError },

    #[snafu(display("runtime did not answer ping: {source}"))]
    Ping { source: RuntimeInfoError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// The engine address could not be used.
    ConnectionFailed,
    /// The engine did not respond.
    Unreachable,
}

impl RuntimeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Connection { .. } => RuntimeErrorKind::ConnectionFailed,
            RuntimeError::Ping { .. } => RuntimeErrorKind::Unreachable,
        }
    }

    /// Returns connection error details if the engine reported any.
    pub fn connection_details(&self) -> Option<&str> {
        match self {
            RuntimeError::Connection {
                source: RuntimeInfoError::ConnectionFailed(msg),
            }
            | RuntimeError::Ping {
                source: RuntimeInfoError::ConnectionFailed(msg),
            } => Some(msg),
            _ => None,
        }
    }
}
