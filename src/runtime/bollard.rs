// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Talks to Docker, or Podman through its Docker-compatible API.

use crate::config::{MountKind, Propagation};
use crate::runtime::traits::{
    ContainerError, ContainerOps, ContainerSpec, ContainerSummary, ImageError, ImageOps,
    MountSpec, RestartName, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::types::{ContainerId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, DeviceMapping, EndpointIpamConfig, EndpointSettings, HealthConfig,
    HostConfig, HostConfigLogConfig, Mount, MountBindOptions, MountBindOptionsPropagationEnum,
    MountTmpfsOptions, MountTypeEnum, MountVolumeOptions, NetworkingConfig, PortBinding,
    ResourcesUlimits, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, ListContainersOptions, RemoveContainerOptions,
    StopContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

/// Seconds bollard waits on a single engine request.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_image_pull_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_name.to_string())
        }
        _ => ImageError::PullFailed(format!("{}: {}", image_name, e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::AlreadyRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
pub struct BollardRuntime {
    client: Docker,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect to the engine at `docker_host`, or wherever `DOCKER_HOST` and the
    /// platform defaults point when it is `None`.
    ///
    /// Accepts `unix:///path`, a bare socket path, `tcp://host:port` and `http://host:port`.
    pub fn connect(docker_host: Option<&str>) -> Result<Self, RuntimeInfoError> {
        let client = match docker_host {
            None => Docker::connect_with_defaults(),
            Some(host) => {
                if let Some(path) = host.strip_prefix("unix://") {
                    Docker::connect_with_unix(
                        path,
                        REQUEST_TIMEOUT_SECS,
                        bollard::API_DEFAULT_VERSION,
                    )
                } else if host.starts_with('/') {
                    Docker::connect_with_unix(
                        host,
                        REQUEST_TIMEOUT_SECS,
                        bollard::API_DEFAULT_VERSION,
                    )
                } else if host.starts_with("tcp://") || host.starts_with("http://") {
                    Docker::connect_with_http(
                        host,
                        REQUEST_TIMEOUT_SECS,
                        bollard::API_DEFAULT_VERSION,
                    )
                } else {
                    return Err(RuntimeInfoError::ConnectionFailed(format!(
                        "unsupported engine address: {}",
                        host
                    )));
                }
            }
        }
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(Self::new(client))
    }
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let version = self
            .client
            .version()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(RuntimeMetadata {
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            os: version.os.unwrap_or_default(),
            arch: version.arch.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.to_string();

        let opts = CreateImageOptions {
            from_image: Some(reference.repository()),
            tag: Some(
                reference
                    .digest()
                    .or(reference.tag())
                    .unwrap_or("latest")
                    .to_string(),
            ),
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| map_image_pull_error(e, &image_name))?;
        }

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
    ) -> Result<ContainerId, ContainerError> {
        let opts = CreateContainerOptions {
            name: Some(name.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), container_body(spec))
            .await
            .map_err(map_container_create_error)?;

        for warning in &response.warnings {
            tracing::warn!(container = name, "engine warning: {}", warning);
        }

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)?;

        Ok(())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, ContainerError> {
        let opts = ListContainersOptions {
            all,
            ..Default::default()
        };

        // Podman reports "stopping" as a container state during shutdown, but bollard
        // doesn't recognize it and fails deserialization. Retry after a short delay
        // since "stopping" is a transient state.
        let mut last_error = None;
        for attempt in 0..3 {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => {
                    return Ok(containers
                        .into_iter()
                        .map(|c| ContainerSummary {
                            id: ContainerId::new(c.id.unwrap_or_default()),
                            names: c.names.unwrap_or_default(),
                        })
                        .collect());
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(ContainerError::Runtime(err_str));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }
}

// =============================================================================
// ContainerSpec -> engine request
// =============================================================================

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

fn duration_nanos(d: Option<Duration>) -> Option<i64> {
    d.map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
}

fn mount(spec: &MountSpec) -> Mount {
    Mount {
        target: Some(spec.target.clone()),
        source: spec.source.clone(),
        typ: Some(match spec.kind {
            MountKind::Bind => MountTypeEnum::BIND,
            MountKind::Volume => MountTypeEnum::VOLUME,
            MountKind::Tmpfs => MountTypeEnum::TMPFS,
            MountKind::Npipe => MountTypeEnum::NPIPE,
        }),
        read_only: Some(spec.read_only),
        bind_options: spec.propagation.map(|p| MountBindOptions {
            propagation: Some(match p {
                Propagation::Private => MountBindOptionsPropagationEnum::PRIVATE,
                Propagation::Rprivate => MountBindOptionsPropagationEnum::RPRIVATE,
                Propagation::Shared => MountBindOptionsPropagationEnum::SHARED,
                Propagation::Rshared => MountBindOptionsPropagationEnum::RSHARED,
                Propagation::Slave => MountBindOptionsPropagationEnum::SLAVE,
                Propagation::Rslave => MountBindOptionsPropagationEnum::RSLAVE,
            }),
            ..Default::default()
        }),
        volume_options: spec.no_copy.map(|no_copy| MountVolumeOptions {
            no_copy: Some(no_copy),
            ..Default::default()
        }),
        tmpfs_options: spec.tmpfs_size.map(|size| MountTmpfsOptions {
            size_bytes: Some(i64::try_from(size).unwrap_or(i64::MAX)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Per-network endpoint settings.
///
/// The engine takes the MAC address per endpoint: it goes on the first declared
/// network, or on the endpoint of the network mode when no networks are declared.
fn networking_config(spec: &ContainerSpec) -> Option<NetworkingConfig> {
    let mut endpoints: HashMap<String, EndpointSettings> = HashMap::new();
    let mut primary = None;

    if let Some(networking) = &spec.networking {
        for (network, endpoint) in &networking.endpoints {
            let ipam_config = if endpoint.ipv4_address.is_some() || endpoint.ipv6_address.is_some()
            {
                Some(EndpointIpamConfig {
                    ipv4_address: endpoint.ipv4_address.clone(),
                    ipv6_address: endpoint.ipv6_address.clone(),
                    ..Default::default()
                })
            } else {
                None
            };
            primary.get_or_insert_with(|| network.clone());
            endpoints.insert(
                network.clone(),
                EndpointSettings {
                    aliases: non_empty(endpoint.aliases.clone()),
                    ipam_config,
                    ..Default::default()
                },
            );
        }
    }

    if let Some(mac) = &spec.process.mac_address {
        let network = primary.or_else(|| mac_network(spec.host.network_mode.as_deref()));
        if let Some(network) = network {
            endpoints.entry(network).or_default().mac_address = Some(mac.clone());
        }
    }

    if endpoints.is_empty() {
        None
    } else {
        Some(NetworkingConfig {
            endpoints_config: Some(endpoints),
        })
    }
}

/// Network an undeclared container joins, if it gets its own interface.
fn mac_network(network_mode: Option<&str>) -> Option<String> {
    match network_mode {
        None | Some("default") => Some("bridge".to_string()),
        Some("none") | Some("host") => None,
        Some(mode) if mode.starts_with("container:") || mode.starts_with("service:") => None,
        Some(mode) => Some(mode.to_string()),
    }
}

/// Translate a ContainerSpec into the engine's create-container body.
///
/// Exposed ports sent to the engine are the declared exposures plus every bound port.
fn container_body(spec: &ContainerSpec) -> ContainerCreateBody {
    let process = &spec.process;
    let host = &spec.host;

    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = host
        .port_bindings
        .iter()
        .map(|(port, bindings)| {
            let bindings = bindings
                .iter()
                .map(|b| PortBinding {
                    host_ip: b.host_ip.clone(),
                    host_port: b.host_port.clone(),
                })
                .collect();
            (port.clone(), Some(bindings))
        })
        .collect();

    let mut exposed_ports = process.exposed_ports.clone();
    exposed_ports.extend(host.port_bindings.keys().cloned());

    let host_config = HostConfig {
        cap_add: non_empty(host.cap_add.clone()),
        cap_drop: non_empty(host.cap_drop.clone()),
        links: non_empty(host.links.clone()),
        dns: non_empty(host.dns.clone()),
        dns_search: non_empty(host.dns_search.clone()),
        dns_options: non_empty(host.dns_options.clone()),
        extra_hosts: non_empty(host.extra_hosts.clone()),
        network_mode: host.network_mode.clone(),
        ipc_mode: host.ipc_mode.clone(),
        pid_mode: host.pid_mode.clone(),
        cgroup_parent: host.cgroup_parent.clone(),
        security_opt: non_empty(host.security_opt.clone()),
        privileged: Some(host.privileged),
        readonly_rootfs: Some(host.readonly_rootfs),
        publish_all_ports: Some(host.publish_all_ports),
        port_bindings: if port_bindings.is_empty() {
            None
        } else {
            Some(port_bindings)
        },
        mounts: non_empty(host.mounts.iter().map(mount).collect()),
        tmpfs: if host.tmpfs.is_empty() {
            None
        } else {
            Some(host.tmpfs.clone().into_iter().collect())
        },
        ulimits: non_empty(
            host.ulimits
                .iter()
                .map(|u| ResourcesUlimits {
                    name: Some(u.name.clone()),
                    soft: Some(u.soft),
                    hard: Some(u.hard),
                })
                .collect(),
        ),
        devices: non_empty(
            host.devices
                .iter()
                .map(|d| DeviceMapping {
                    path_on_host: Some(d.path_on_host.clone()),
                    path_in_container: Some(d.path_in_container.clone()),
                    cgroup_permissions: Some("rwm".to_string()),
                })
                .collect(),
        ),
        log_config: host.log_config.as_ref().map(|log| HostConfigLogConfig {
            typ: log.driver.clone(),
            config: if log.options.is_empty() {
                None
            } else {
                Some(log.options.clone().into_iter().collect())
            },
        }),
        restart_policy: host.restart_policy.map(|policy| RestartPolicy {
            name: Some(match policy.name {
                RestartName::No => RestartPolicyNameEnum::NO,
                RestartName::Always => RestartPolicyNameEnum::ALWAYS,
                RestartName::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
                RestartName::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
            }),
            maximum_retry_count: policy.maximum_retry_count.map(i64::from),
        }),
        memory: host.memory.map(|m| i64::try_from(m).unwrap_or(i64::MAX)),
        memory_reservation: host
            .memory_reservation
            .map(|m| i64::try_from(m).unwrap_or(i64::MAX)),
        nano_cpus: host.nano_cpus,
        ..Default::default()
    };

    let healthcheck = process.healthcheck.as_ref().map(|hc| HealthConfig {
        test: Some(hc.test.clone()),
        interval: duration_nanos(hc.interval),
        timeout: duration_nanos(hc.timeout),
        retries: hc.retries.map(i64::from),
        start_period: duration_nanos(hc.start_period),
        start_interval: None,
    });

    let networking_config = networking_config(spec);

    ContainerCreateBody {
        image: Some(process.image.clone()),
        hostname: process.hostname.clone(),
        domainname: process.domainname.clone(),
        user: process.user.clone(),
        stop_signal: process.stop_signal.clone(),
        stop_timeout: process
            .stop_timeout
            .map(|s| i64::try_from(s).unwrap_or(i64::MAX)),
        cmd: process.cmd.clone(),
        entrypoint: process.entrypoint.clone(),
        working_dir: process.working_dir.clone(),
        env: non_empty(process.env.clone()),
        labels: if process.labels.is_empty() {
            None
        } else {
            Some(process.labels.clone().into_iter().collect())
        },
        exposed_ports: non_empty(exposed_ports.into_iter().collect()),
        healthcheck,
        attach_stdin: Some(process.attach_stdin),
        attach_stdout: Some(process.attach_stdout),
        attach_stderr: Some(process.attach_stderr),
        tty: Some(process.tty),
        open_stdin: Some(process.open_stdin),
        network_disabled: Some(process.network_disabled),
        host_config: Some(host_config),
        networking_config,
        ..Default::default()
    }
}
