// ABOUTME: Byte-size values as written in compose files.
// ABOUTME: Accepts plain integers or strings like "512m", "1g", "1.5gb".

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::fmt;
use std::str::FromStr;

/// A size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = String;

    /// Parse a size like "512m" or "1g" into bytes. Units are binary (1k = 1024).
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let lower = spec.trim().to_ascii_lowercase();
        let unit_start = lower
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(lower.len());
        let (num_str, unit) = lower.split_at(unit_start);

        let multiplier: u64 = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" => 1024,
            "m" | "mb" => 1024 * 1024,
            "g" | "gb" => 1024 * 1024 * 1024,
            "t" | "tb" => 1024 * 1024 * 1024 * 1024,
            other => return Err(format!("unknown size unit {other:?} in {spec:?}")),
        };

        if num_str.is_empty() {
            return Err(format!("missing number in size {spec:?}"));
        }

        if let Ok(whole) = num_str.parse::<u64>() {
            return whole
                .checked_mul(multiplier)
                .map(ByteSize)
                .ok_or_else(|| format!("size {spec:?} is too large"));
        }

        let fractional = num_str
            .parse::<f64>()
            .map_err(|_| format!("invalid size {spec:?}"))?;
        let bytes = fractional * multiplier as f64;
        if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
            return Err(format!("size {spec:?} is out of range"));
        }
        Ok(ByteSize(bytes as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(ByteSize(n)),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}
