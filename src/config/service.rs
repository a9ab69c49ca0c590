// ABOUTME: One declared service from the compose file.
// ABOUTME: ServiceDefinition mirrors the YAML; Service adds the validated name and image.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;

use super::deploy::DeployConfig;
use super::deserialize::{OrderedMap, extra_hosts, labels, shell_command, string_or_list};
use super::environment::Environment;
use super::healthcheck::HealthcheckConfig;
use super::ports::{PortConfig, deserialize_expose, deserialize_ports};
use super::restart_policy::RestartPolicy;
use super::volumes::{VolumeConfig, deserialize_volumes};
use crate::types::{ImageRef, ServiceName};

/// A service exactly as declared. Unknown keys (`build`, `depends_on`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceDefinition {
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default, deserialize_with = "shell_command")]
    pub command: Option<Vec<String>>,
    #[serde(default, deserialize_with = "shell_command")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub domainname: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub stop_signal: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub stop_grace_period: Option<Duration>,
    #[serde(default)]
    pub tty: bool,
    #[serde(default)]
    pub stdin_open: bool,

    #[serde(default, deserialize_with = "deserialize_ports")]
    pub ports: Vec<PortConfig>,
    #[serde(default, deserialize_with = "deserialize_expose")]
    pub expose: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_volumes")]
    pub volumes: Vec<VolumeConfig>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tmpfs: Vec<String>,
    #[serde(default)]
    pub devices: Vec<String>,

    #[serde(default, deserialize_with = "string_or_list")]
    pub dns: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub dns_search: Vec<String>,
    #[serde(default)]
    pub dns_opt: Vec<String>,
    #[serde(default, deserialize_with = "extra_hosts")]
    pub extra_hosts: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub network_mode: Option<String>,
    #[serde(default, deserialize_with = "deserialize_networks")]
    pub networks: OrderedMap<NetworkAttachment>,

    #[serde(default, deserialize_with = "labels")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub cap_add: Vec<String>,
    #[serde(default)]
    pub cap_drop: Vec<String>,
    #[serde(default)]
    pub security_opt: Vec<String>,
    #[serde(default)]
    pub ipc: Option<String>,
    #[serde(default)]
    pub pid: Option<String>,
    #[serde(default)]
    pub cgroup_parent: Option<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub ulimits: OrderedMap<Ulimit>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub restart: Option<RestartPolicy>,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub healthcheck: Option<HealthcheckConfig>,
}

/// Per-network endpoint settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NetworkAttachment {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub ipv4_address: Option<String>,
    #[serde(default)]
    pub ipv6_address: Option<String>,
}

fn deserialize_networks<'de, D>(deserializer: D) -> Result<OrderedMap<NetworkAttachment>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Names(Vec<String>),
        Detailed(OrderedMap<Option<NetworkAttachment>>),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => OrderedMap::default(),
        Some(Raw::Names(names)) => OrderedMap(
            names
                .into_iter()
                .map(|name| (name, NetworkAttachment::default()))
                .collect(),
        ),
        Some(Raw::Detailed(map)) => OrderedMap(
            map.into_iter()
                .map(|(name, attachment)| (name, attachment.unwrap_or_default()))
                .collect(),
        ),
    })
}

/// A resource limit, given as one number or as soft and hard values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ulimit {
    pub soft: i64,
    pub hard: i64,
}

impl<'de> Deserialize<'de> for Ulimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Single(i64),
            Pair { soft: i64, hard: i64 },
        }

        let ulimit = match Raw::deserialize(deserializer)? {
            Raw::Single(n) => Ulimit { soft: n, hard: n },
            Raw::Pair { soft, hard } => Ulimit { soft, hard },
        };
        if ulimit.soft > ulimit.hard {
            return Err(de::Error::custom(format!(
                "ulimit soft value {} exceeds hard value {}",
                ulimit.soft, ulimit.hard
            )));
        }
        Ok(ulimit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// A validated service: its name is a legal container name and its image parses.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: ServiceName,
    pub image: ImageRef,
    pub definition: ServiceDefinition,
}
