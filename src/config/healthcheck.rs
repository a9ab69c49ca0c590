// ABOUTME: Container health check declaration.
// ABOUTME: Test command as a string (run through the shell) or an exec list; timings are optional.

use serde::Deserialize;
use serde::de::Deserializer;
use std::time::Duration;

use super::deserialize::Scalar;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthcheckConfig {
    #[serde(default, deserialize_with = "deserialize_test")]
    pub test: Vec<String>,

    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub retries: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub start_period: Option<Duration>,

    #[serde(default)]
    pub disable: bool,
}

impl HealthcheckConfig {
    /// True when the check is switched off, either explicitly or with a `NONE` test.
    pub fn is_disabled(&self) -> bool {
        self.disable || self.test.first().is_some_and(|t| t == "NONE")
    }
}

fn deserialize_test<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Test {
        Shell(String),
        Exec(Vec<Scalar>),
    }

    Ok(match Option::<Test>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Test::Shell(cmd)) => vec!["CMD-SHELL".to_string(), cmd],
        Some(Test::Exec(list)) => Scalar::strings(list),
    })
}
