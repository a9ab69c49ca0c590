// ABOUTME: Service environment declarations.
// ABOUTME: Accepts a map or a KEY=VALUE list and keeps declaration order.

use serde::Deserialize;
use serde::de::{self, Deserializer};

use super::deserialize::{OrderedMap, Scalar};

/// Ordered environment assignments. A key without a value is kept as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment(Vec<(String, Option<String>)>);

impl Environment {
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render each pair as `KEY=value`; a key with no value renders as `KEY=`.
    pub fn to_env_strings(&self) -> Vec<String> {
        self.iter()
            .map(|(k, v)| format!("{}={}", k, v.unwrap_or_default()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, Option<V>)>>(iter: T) -> Self {
        Environment(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Map(OrderedMap<Option<Scalar>>),
        }

        let pairs: Vec<(String, Option<String>)> = match Option::<Raw>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(Raw::List(items)) => items
                .into_iter()
                .map(|item| match item.split_once('=') {
                    Some((k, v)) => (k.to_string(), Some(v.to_string())),
                    None => (item, None),
                })
                .collect(),
            Some(Raw::Map(map)) => map
                .into_iter()
                .map(|(k, v)| (k, v.map(|v| v.to_string())))
                .collect(),
        };

        for (i, (key, _)) in pairs.iter().enumerate() {
            if key.is_empty() {
                return Err(de::Error::custom("environment variable name cannot be empty"));
            }
            if pairs[..i].iter().any(|(k, _)| k == key) {
                return Err(de::Error::custom(format!(
                    "environment variable {key} is declared twice"
                )));
            }
        }

        Ok(Environment(pairs))
    }
}
