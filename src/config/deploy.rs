// ABOUTME: The `deploy:` block of a service.
// ABOUTME: Only restart policy and resource limits affect a single-host redeploy.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::str::FromStr;
use std::time::Duration;

use super::deserialize::Scalar;
use super::units::ByteSize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub restart_policy: Option<DeployRestartPolicy>,
    #[serde(default)]
    pub resources: ResourcesConfig,
}

/// Restart condition as written under `deploy.restart_policy.condition`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartCondition {
    None,
    OnFailure,
    #[default]
    Any,
}

impl FromStr for RestartCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RestartCondition::None),
            "on-failure" => Ok(RestartCondition::OnFailure),
            "any" => Ok(RestartCondition::Any),
            other => Err(format!("unknown restart condition: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for RestartCondition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeployRestartPolicy {
    #[serde(default)]
    pub condition: RestartCondition,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub delay: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub window: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub limits: Option<Resource>,
    #[serde(default)]
    pub reservations: Option<Resource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub memory: Option<ByteSize>,
    #[serde(default, deserialize_with = "deserialize_cpus")]
    pub cpus: Option<f64>,
}

/// `cpus: 0.5` and `cpus: '0.5'` are both common.
fn deserialize_cpus<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cpus = match Option::<Scalar>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Scalar::Int(n)) => n as f64,
        Some(Scalar::Float(f)) => f,
        Some(Scalar::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid cpus value {s:?}")))?,
        Some(Scalar::Bool(b)) => {
            return Err(de::Error::custom(format!("invalid cpus value {b}")));
        }
    };
    if !cpus.is_finite() || cpus < 0.0 {
        return Err(de::Error::custom(format!("invalid cpus value {cpus}")));
    }
    Ok(Some(cpus))
}
