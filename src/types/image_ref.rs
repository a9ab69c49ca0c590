// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles formats like nginx, nginx:tag, registry:5000/org/image:tag@digest.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// A parsed image reference.
///
/// Unlike the engine, an untagged reference stays untagged: services that
/// omit the tag implicitly track `latest`, and that distinction matters when
/// matching pushed images against declared services.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric()
                && c != '/'
                && c != ':'
                && c != '.'
                && c != '-'
                && c != '_'
                && c != '@'
            {
                return Err(ParseImageRefError::InvalidChar(c));
            }
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => (before, Some(after.to_string())),
            None => (input, None),
        };

        let (without_tag, tag) = match without_digest.rsplit_once(':') {
            // A colon followed by a path is a registry port, not a tag
            Some((before, after)) if !after.contains('/') => (before, Some(after.to_string())),
            _ => (without_digest, None),
        };

        if tag.as_deref() == Some("") || digest.as_deref() == Some("") {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        let (registry, name) = Self::parse_registry_and_name(without_tag)?;

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    /// Build a reference from a bare repository and an explicit tag.
    pub fn with_tag(repository: &str, tag: &str) -> Result<Self, ParseImageRefError> {
        let mut image = Self::parse(repository)?;
        if image.tag.is_some() || image.digest.is_some() {
            return Err(ParseImageRefError::InvalidFormat(repository.to_string()));
        }
        if tag.is_empty() {
            return Err(ParseImageRefError::InvalidFormat(format!("{repository}:")));
        }
        if let Some(c) = tag
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }
        image.tag = Some(tag.to_string());
        Ok(image)
    }

    fn parse_registry_and_name(
        input: &str,
    ) -> Result<(Option<String>, String), ParseImageRefError> {
        if input.is_empty() || input.starts_with('/') || input.ends_with('/') {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        // A registry is present if the first component contains a dot or colon,
        // or is "localhost"
        match input.split_once('/') {
            None => Ok((None, input.to_string())),
            Some((first, rest)) => {
                if first.contains('.') || first.contains(':') || first == "localhost" {
                    Ok((Some(first.to_string()), rest.to_string()))
                } else {
                    Ok((None, input.to_string()))
                }
            }
        }
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Registry and name without tag or digest, as the engine expects in `fromImage`.
    pub fn repository(&self) -> String {
        match self.registry {
            Some(ref registry) => format!("{}/{}", registry, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}
