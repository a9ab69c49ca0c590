// ABOUTME: Configuration types and loading for the compose services file.
// ABOUTME: Handles YAML parsing, env var interpolation, validation and eager compilation.

mod deploy;
mod deserialize;
mod environment;
mod healthcheck;
mod interpolate;
mod ports;
mod restart_policy;
mod service;
mod units;
mod volumes;

pub use deploy::{DeployConfig, DeployRestartPolicy, Resource, ResourcesConfig, RestartCondition};
pub use deserialize::{OrderedMap, Scalar, split_shell_words};
pub use environment::Environment;
pub use healthcheck::HealthcheckConfig;
pub use interpolate::interpolate;
pub use ports::{PortConfig, Protocol, parse_port_spec};
pub use restart_policy::RestartPolicy;
pub use service::{LoggingConfig, NetworkAttachment, Service, ServiceDefinition, Ulimit};
pub use units::ByteSize;
pub use volumes::{BindOptions, MountKind, Propagation, TmpfsOptions, VolumeConfig, VolumeOptions};

use crate::compile::{CompiledService, compile};
use crate::error::{Error, Result};
use crate::types::{ImageRef, ServiceName};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "services.yaml";

/// Top level of a compose file. `volumes`, `networks`, `secrets` and
/// `configs` are accepted and ignored.
#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    version: Option<Scalar>,
    #[serde(default)]
    services: OrderedMap<ServiceDefinition>,
}

/// A loaded configuration: every service validated and compiled, in declaration order.
#[derive(Debug, Clone)]
pub struct Config {
    pub version: Option<String>,
    pub services: Vec<CompiledService>,
}

impl Config {
    /// Parse a document with no base directory. Relative bind sources are kept as written.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, None)
    }

    /// Read, interpolate, validate and compile the file at `path`.
    ///
    /// Relative bind-mount sources resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let base = config_dir(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, Some(&base))
    }

    fn parse(yaml: &str, base: Option<&Path>) -> Result<Self> {
        let mut document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        interpolate::interpolate_value(&mut document, &|name| std::env::var(name).ok())
            .map_err(Error::Interpolation)?;
        let compose: ComposeFile = serde_yaml::from_value(document)?;

        let home = std::env::var_os("HOME").map(PathBuf::from);
        let mut services = Vec::with_capacity(compose.services.len());
        for (name, definition) in compose.services {
            let mut service = validate(name, definition)?;
            if let Some(base) = base {
                for volume in &mut service.definition.volumes {
                    volume.resolve_source(base, home.as_deref());
                }
            }

            let spec = compile(&service).map_err(|source| Error::Compile {
                service: service.name.to_string(),
                source,
            })?;
            debug!(service = %service.name, image = %service.image, "compiled service");
            services.push(CompiledService::new(service, spec));
        }

        Ok(Config {
            version: compose.version.map(|v| v.to_string()),
            services,
        })
    }
}

fn validate(name: String, definition: ServiceDefinition) -> Result<Service> {
    let service_name = ServiceName::new(&name).map_err(|source| Error::InvalidServiceName {
        service: name.clone(),
        source,
    })?;

    let image = match definition.image.as_deref().map(str::trim) {
        None | Some("") => return Err(Error::MissingImage { service: name }),
        Some(image) => ImageRef::parse(image).map_err(|source| Error::InvalidImage {
            service: name.clone(),
            source,
        })?,
    };

    Ok(Service {
        name: service_name,
        image,
        definition,
    })
}

fn config_dir(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/")))
}
