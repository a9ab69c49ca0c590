// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerSpec with its process, host and networking parts, plus listing metadata.

use crate::config::{MountKind, Propagation};
use crate::types::ContainerId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Fully-resolved specification for creating a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerSpec {
    /// Name the container is created under.
    pub name: String,
    /// Process-level settings.
    pub process: ProcessSpec,
    /// Host-level settings.
    pub host: HostSpec,
    /// Per-network endpoint settings, if any networks are attached.
    pub networking: Option<NetworkingSpec>,
}

/// What runs inside the container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessSpec {
    /// Image to run, as declared.
    pub image: String,
    pub hostname: Option<String>,
    pub domainname: Option<String>,
    pub user: Option<String>,
    pub stop_signal: Option<String>,
    /// Stop timeout in whole seconds.
    pub stop_timeout: Option<u64>,
    /// Command to run (overrides image CMD).
    pub cmd: Option<Vec<String>>,
    /// Entrypoint (overrides image ENTRYPOINT).
    pub entrypoint: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub mac_address: Option<String>,
    /// `KEY=value` pairs in declaration order.
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
    /// Exposed ports as `port/protocol`.
    pub exposed_ports: BTreeSet<String>,
    /// Combined `published:target/protocol` specs, one per declared port.
    pub port_specs: Vec<String>,
    pub healthcheck: Option<HealthcheckSpec>,
    pub attach_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    pub tty: bool,
    pub open_stdin: bool,
    pub network_disabled: bool,
    /// Memory limit in bytes.
    pub memory: Option<u64>,
    /// Memory soft limit in bytes.
    pub memory_reservation: Option<u64>,
}

/// Health check run by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthcheckSpec {
    /// Test command, led by `CMD`, `CMD-SHELL` or `NONE`.
    pub test: Vec<String>,
    pub interval: Option<Duration>,
    pub timeout: Option<Duration>,
    pub start_period: Option<Duration>,
    pub retries: Option<u32>,
}

/// How the host runs the container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostSpec {
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub links: Vec<String>,
    pub dns: Vec<String>,
    pub dns_search: Vec<String>,
    pub dns_options: Vec<String>,
    pub extra_hosts: Vec<String>,
    pub network_mode: Option<String>,
    pub ipc_mode: Option<String>,
    pub pid_mode: Option<String>,
    pub cgroup_parent: Option<String>,
    pub security_opt: Vec<String>,
    pub privileged: bool,
    pub readonly_rootfs: bool,
    pub publish_all_ports: bool,
    /// Bindings keyed by `target/protocol`. Several bindings may share a key.
    pub port_bindings: BTreeMap<String, Vec<PortBindingSpec>>,
    pub mounts: Vec<MountSpec>,
    /// Tmpfs mount points and their options.
    pub tmpfs: BTreeMap<String, String>,
    /// Ulimits, ordered by name.
    pub ulimits: Vec<UlimitSpec>,
    pub devices: Vec<DeviceSpec>,
    pub log_config: Option<LogConfigSpec>,
    pub restart_policy: Option<RestartSpec>,
    /// Memory limit in bytes.
    pub memory: Option<u64>,
    /// Memory soft limit in bytes.
    pub memory_reservation: Option<u64>,
    /// CPU quota in units of 10^-9 CPUs.
    pub nano_cpus: Option<i64>,
}

/// One host-side binding of a container port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortBindingSpec {
    pub host_ip: Option<String>,
    /// Host port; `None` lets the engine pick one.
    pub host_port: Option<String>,
}

/// A mount record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountSpec {
    pub kind: MountKind,
    /// Host path or volume name; `None` for anonymous volumes and tmpfs.
    pub source: Option<String>,
    pub target: String,
    pub read_only: bool,
    /// Bind mounts only.
    pub propagation: Option<Propagation>,
    /// Named volumes only.
    pub no_copy: Option<bool>,
    /// Tmpfs mounts only.
    pub tmpfs_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UlimitSpec {
    pub name: String,
    pub soft: i64,
    pub hard: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSpec {
    pub path_on_host: String,
    pub path_in_container: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogConfigSpec {
    pub driver: Option<String>,
    pub options: BTreeMap<String, String>,
}

/// Restart policy as the engine names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartName {
    No,
    Always,
    UnlessStopped,
    OnFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestartSpec {
    pub name: RestartName,
    pub maximum_retry_count: Option<u32>,
}

/// Endpoint settings per attached network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkingSpec {
    pub endpoints: BTreeMap<String, EndpointSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointSpec {
    pub aliases: Vec<String>,
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
}

/// Summary information about a container, as listed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Container ID.
    pub id: ContainerId,
    /// Names, each with the engine's leading `/`.
    pub names: Vec<String>,
}

impl ContainerSummary {
    /// True if any of the listed names equals `name` exactly.
    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}
