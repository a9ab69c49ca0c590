// ABOUTME: Service-level restart policy as written in the legacy `restart:` field.
// ABOUTME: Supports no, always, unless-stopped, and on-failure[:max-retries].

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" | "" => Ok(RestartPolicy::No),
            "always" => Ok(RestartPolicy::Always),
            "unless-stopped" => Ok(RestartPolicy::UnlessStopped),
            "on-failure" => Ok(RestartPolicy::OnFailure { max_retries: None }),
            s if s.starts_with("on-failure:") => {
                let retries_str = &s["on-failure:".len()..];
                let retries = retries_str
                    .parse::<u32>()
                    .map_err(|_| format!("invalid max retries: {}", retries_str))?;
                Ok(RestartPolicy::OnFailure {
                    max_retries: Some(retries),
                })
            }
            _ => Err(format!("unknown restart policy: {}", s)),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::No => write!(f, "no"),
            RestartPolicy::Always => write!(f, "always"),
            RestartPolicy::UnlessStopped => write!(f, "unless-stopped"),
            RestartPolicy::OnFailure { max_retries: None } => write!(f, "on-failure"),
            RestartPolicy::OnFailure {
                max_retries: Some(n),
            } => write!(f, "on-failure:{}", n),
        }
    }
}

impl<'de> Deserialize<'de> for RestartPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `restart: no` is read as a boolean by YAML 1.1 tooling; accept both.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(RestartPolicy::No),
            Raw::Flag(true) => Err(de::Error::custom("restart policy must be a string")),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_forms() {
        assert_eq!("no".parse(), Ok(RestartPolicy::No));
        assert_eq!("always".parse(), Ok(RestartPolicy::Always));
        assert_eq!("unless-stopped".parse(), Ok(RestartPolicy::UnlessStopped));
        assert_eq!(
            "on-failure:5".parse(),
            Ok(RestartPolicy::OnFailure {
                max_retries: Some(5)
            })
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let policy = RestartPolicy::OnFailure {
            max_retries: Some(3),
        };
        assert_eq!(policy.to_string().parse(), Ok(policy));
    }

    #[test]
    fn rejects_unknown() {
        assert!("sometimes".parse::<RestartPolicy>().is_err());
        assert!("on-failure:many".parse::<RestartPolicy>().is_err());
    }
}
