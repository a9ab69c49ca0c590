// ABOUTME: Compiles a declared Service into the ContainerSpec the engine receives.
// ABOUTME: Pure and deterministic: the same Service always yields the same spec.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{
    MountKind, PortConfig, RestartCondition, RestartPolicy, Service, ServiceDefinition,
    VolumeConfig,
};
use crate::runtime::{
    ContainerSpec, DeviceSpec, EndpointSpec, HealthcheckSpec, HostSpec, LogConfigSpec, MountSpec,
    NetworkingSpec, PortBindingSpec, ProcessSpec, RestartName, RestartSpec, UlimitSpec,
};
use crate::types::ServiceName;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("invalid device path: {0:?}")]
    InvalidDevice(String),
}

/// A service together with its precompiled container specification.
#[derive(Debug, Clone)]
pub struct CompiledService {
    pub service: Arc<Service>,
    pub spec: Arc<ContainerSpec>,
}

impl CompiledService {
    pub fn new(service: Service, spec: ContainerSpec) -> Self {
        Self {
            service: Arc::new(service),
            spec: Arc::new(spec),
        }
    }

    pub fn name(&self) -> &ServiceName {
        &self.service.name
    }
}

/// Translate a service declaration into a container specification.
pub fn compile(service: &Service) -> Result<ContainerSpec, CompileError> {
    let def = &service.definition;

    let mut process = ProcessSpec {
        image: service.image.to_string(),
        hostname: def.hostname.clone(),
        domainname: def.domainname.clone(),
        user: def.user.clone(),
        stop_signal: def.stop_signal.clone(),
        stop_timeout: def.stop_grace_period.map(|d| d.as_secs()),
        cmd: def.command.clone(),
        entrypoint: def.entrypoint.clone(),
        working_dir: def.working_dir.clone(),
        mac_address: def.mac_address.clone(),
        env: def.environment.to_env_strings(),
        labels: def.labels.clone(),
        healthcheck: healthcheck(def),
        attach_stdin: false,
        attach_stdout: true,
        attach_stderr: true,
        tty: def.tty,
        open_stdin: def.stdin_open,
        network_disabled: def.network_mode.as_deref() == Some("none"),
        ..Default::default()
    };

    let mut host = HostSpec {
        cap_add: def.cap_add.clone(),
        cap_drop: def.cap_drop.clone(),
        links: def.links.clone(),
        dns: def.dns.clone(),
        dns_search: def.dns_search.clone(),
        dns_options: def.dns_opt.clone(),
        extra_hosts: def.extra_hosts.clone(),
        network_mode: def.network_mode.clone(),
        ipc_mode: def.ipc.clone(),
        pid_mode: def.pid.clone(),
        cgroup_parent: def.cgroup_parent.clone(),
        security_opt: def.security_opt.clone(),
        privileged: def.privileged,
        readonly_rootfs: def.read_only,
        publish_all_ports: true,
        mounts: def.volumes.iter().map(mount).collect(),
        tmpfs: def.tmpfs.iter().map(|path| (path.clone(), String::new())).collect(),
        ulimits: ulimits(def),
        devices: devices(&def.devices)?,
        log_config: def.logging.as_ref().map(|logging| LogConfigSpec {
            driver: logging.driver.clone(),
            options: logging.options.clone(),
        }),
        restart_policy: restart_policy(def),
        ..Default::default()
    };

    publish_ports(&def.ports, &mut process, &mut host);
    process.exposed_ports.extend(exposed_ports(&def.expose));

    if let Some(limits) = &def.deploy.resources.limits {
        if let Some(memory) = limits.memory {
            process.memory = Some(memory.as_u64());
            host.memory = Some(memory.as_u64());
        }
        host.nano_cpus = limits.cpus.map(|cpus| (cpus * 1_000_000_000.0).round() as i64);
    }
    if let Some(memory) = def
        .deploy
        .resources
        .reservations
        .as_ref()
        .and_then(|r| r.memory)
    {
        process.memory_reservation = Some(memory.as_u64());
        host.memory_reservation = Some(memory.as_u64());
    }

    Ok(ContainerSpec {
        name: service.name.to_string(),
        process,
        host,
        networking: networking(def),
    })
}

fn publish_ports(ports: &[PortConfig], process: &mut ProcessSpec, host: &mut HostSpec) {
    for port in ports {
        let inside = format!("{}/{}", port.target, port.protocol);
        let outside = port.published.map(|p| p.to_string());

        match outside {
            Some(ref outside) => process.port_specs.push(format!("{}:{}", outside, inside)),
            None => {
                process.exposed_ports.insert(inside.clone());
            }
        }

        host.port_bindings
            .entry(inside)
            .or_default()
            .push(PortBindingSpec {
                host_ip: port.host_ip.clone(),
                host_port: outside,
            });
    }
}

fn exposed_ports(expose: &[String]) -> BTreeSet<String> {
    expose
        .iter()
        .map(|spec| {
            if spec.contains('/') {
                spec.clone()
            } else {
                format!("{}/tcp", spec)
            }
        })
        .collect()
}

fn mount(volume: &VolumeConfig) -> MountSpec {
    MountSpec {
        kind: volume.kind,
        source: volume.source.clone(),
        target: volume.target.clone(),
        read_only: volume.read_only,
        propagation: volume.bind.as_ref().and_then(|b| b.propagation),
        no_copy: volume.volume.as_ref().map(|v| v.nocopy),
        tmpfs_size: volume
            .tmpfs
            .as_ref()
            .and_then(|t| t.size)
            .map(|s| s.as_u64())
            .filter(|_| volume.kind == MountKind::Tmpfs),
    }
}

fn ulimits(def: &ServiceDefinition) -> Vec<UlimitSpec> {
    let mut ulimits: Vec<UlimitSpec> = def
        .ulimits
        .iter()
        .map(|(name, limit)| UlimitSpec {
            name: name.to_string(),
            soft: limit.soft,
            hard: limit.hard,
        })
        .collect();
    ulimits.sort_by(|a, b| a.name.cmp(&b.name));
    ulimits
}

fn devices(devices: &[String]) -> Result<Vec<DeviceSpec>, CompileError> {
    devices
        .iter()
        .map(|device| match device.split(':').collect::<Vec<_>>().as_slice() {
            [on_host, in_container] => Ok(DeviceSpec {
                path_on_host: on_host.to_string(),
                path_in_container: in_container.to_string(),
            }),
            _ => Err(CompileError::InvalidDevice(device.clone())),
        })
        .collect()
}

/// The deploy-level policy wins outright over the legacy `restart:` field.
fn restart_policy(def: &ServiceDefinition) -> Option<RestartSpec> {
    if let Some(policy) = &def.deploy.restart_policy {
        let name = match policy.condition {
            RestartCondition::None => RestartName::No,
            RestartCondition::OnFailure => RestartName::OnFailure,
            RestartCondition::Any => RestartName::Always,
        };
        return Some(RestartSpec {
            name,
            maximum_retry_count: policy.max_attempts,
        });
    }

    def.restart.map(|restart| match restart {
        RestartPolicy::No => RestartSpec {
            name: RestartName::No,
            maximum_retry_count: None,
        },
        RestartPolicy::Always => RestartSpec {
            name: RestartName::Always,
            maximum_retry_count: None,
        },
        RestartPolicy::UnlessStopped => RestartSpec {
            name: RestartName::UnlessStopped,
            maximum_retry_count: None,
        },
        RestartPolicy::OnFailure { max_retries } => RestartSpec {
            name: RestartName::OnFailure,
            maximum_retry_count: max_retries,
        },
    })
}

fn healthcheck(def: &ServiceDefinition) -> Option<HealthcheckSpec> {
    let hc = def.healthcheck.as_ref().filter(|hc| !hc.is_disabled())?;
    Some(HealthcheckSpec {
        test: hc.test.clone(),
        interval: hc.interval,
        timeout: hc.timeout,
        start_period: hc.start_period,
        retries: hc.retries,
    })
}

fn networking(def: &ServiceDefinition) -> Option<NetworkingSpec> {
    if def.networks.is_empty() {
        return None;
    }
    let endpoints: BTreeMap<String, EndpointSpec> = def
        .networks
        .iter()
        .map(|(name, attachment)| {
            (
                name.to_string(),
                EndpointSpec {
                    aliases: attachment.aliases.clone(),
                    ipv4_address: attachment.ipv4_address.clone(),
                    ipv6_address: attachment.ipv6_address.clone(),
                },
            )
        })
        .collect();
    Some(NetworkingSpec { endpoints })
}
