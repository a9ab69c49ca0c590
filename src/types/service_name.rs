// ABOUTME: Service name validation.
// ABOUTME: Service names double as container names, so they follow engine naming rules.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),
}

/// Name of a declared service, also used as the engine-side container name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        let first = value.chars().next().ok_or(ServiceNameError::Empty)?;

        if !first.is_ascii_alphanumeric() {
            return Err(ServiceNameError::InvalidStart);
        }

        // Same character set the engine accepts for container names
        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(ServiceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name under which the engine lists a container created with this name.
    pub fn container_name(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
