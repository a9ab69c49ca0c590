// ABOUTME: Published port declarations in short and long compose syntax.
// ABOUTME: Expands port ranges so every entry maps exactly one container port.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::fmt;
use std::str::FromStr;

use super::deserialize::Scalar;

/// Transport protocol of a port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            other => Err(format!("unknown protocol: {other}")),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::Sctp => write!(f, "sctp"),
        }
    }
}

/// One container port, optionally published on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    pub target: u16,
    pub published: Option<u16>,
    pub protocol: Protocol,
    pub host_ip: Option<String>,
}

/// Parse a short-syntax port like `8080:80`, `127.0.0.1:8080:80/udp` or `9000-9001:80-81`.
pub fn parse_port_spec(spec: &str) -> Result<Vec<PortConfig>, String> {
    let (ports, protocol) = match spec.rsplit_once('/') {
        Some((ports, proto)) => (ports, proto.parse::<Protocol>()?),
        None => (spec, Protocol::Tcp),
    };

    let mut parts = ports.rsplitn(3, ':');
    let target = parts.next().unwrap_or_default();
    let published = parts.next();
    let host_ip = parts
        .next()
        .map(|ip| ip.trim_start_matches('[').trim_end_matches(']').to_string())
        .filter(|ip| !ip.is_empty());

    let targets = parse_range(target).map_err(|e| format!("invalid port {spec:?}: {e}"))?;
    let published = match published {
        None | Some("") => None,
        Some(p) => Some(parse_range(p).map_err(|e| format!("invalid port {spec:?}: {e}"))?),
    };

    match published {
        None => Ok(targets
            .map(|target| PortConfig {
                target,
                published: None,
                protocol,
                host_ip: host_ip.clone(),
            })
            .collect()),
        Some(published) => {
            if published.len() != targets.len() {
                return Err(format!(
                    "invalid port {spec:?}: published and target ranges differ in size"
                ));
            }
            Ok(published
                .zip(targets)
                .map(|(published, target)| PortConfig {
                    target,
                    published: Some(published),
                    protocol,
                    host_ip: host_ip.clone(),
                })
                .collect())
        }
    }
}

fn parse_range(s: &str) -> Result<std::ops::RangeInclusive<u16>, String> {
    let parse = |p: &str| {
        p.trim()
            .parse::<u16>()
            .map_err(|_| format!("{p:?} is not a port number"))
    };
    match s.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if start > end {
                return Err(format!("range {s:?} is reversed"));
            }
            Ok(start..=end)
        }
        None => {
            let port = parse(s)?;
            Ok(port..=port)
        }
    }
}

#[derive(Deserialize)]
struct LongPort {
    target: u16,
    #[serde(default)]
    published: Option<Scalar>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    host_ip: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortEntry {
    Number(u16),
    Short(String),
    Long(LongPort),
}

impl PortEntry {
    fn into_ports(self) -> Result<Vec<PortConfig>, String> {
        match self {
            PortEntry::Number(target) => Ok(vec![PortConfig {
                target,
                published: None,
                protocol: Protocol::Tcp,
                host_ip: None,
            }]),
            PortEntry::Short(spec) => parse_port_spec(&spec),
            PortEntry::Long(long) => {
                let published = match long.published {
                    None => None,
                    Some(Scalar::Int(n)) => Some(
                        u16::try_from(n).map_err(|_| format!("published port {n} out of range"))?,
                    ),
                    Some(Scalar::Str(s)) if s.is_empty() => None,
                    Some(other) => Some(
                        other
                            .to_string()
                            .parse::<u16>()
                            .map_err(|_| format!("invalid published port {other}"))?,
                    ),
                };
                let protocol = match long.protocol {
                    Some(p) => p.parse()?,
                    None => Protocol::Tcp,
                };
                Ok(vec![PortConfig {
                    target: long.target,
                    published,
                    protocol,
                    host_ip: long.host_ip,
                }])
            }
        }
    }
}

/// Deserialize a `ports:` list, flattening ranges.
pub fn deserialize_ports<'de, D>(deserializer: D) -> Result<Vec<PortConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<Vec<PortEntry>> = Option::deserialize(deserializer)?;
    let mut ports = Vec::new();
    for entry in entries.unwrap_or_default() {
        ports.extend(entry.into_ports().map_err(de::Error::custom)?);
    }
    Ok(ports)
}

/// Deserialize an `expose:` list. Entries keep their textual form; a protocol is added later.
pub fn deserialize_expose<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<Vec<Scalar>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| entry.to_string())
        .collect())
}
