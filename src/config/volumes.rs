// ABOUTME: Volume and mount declarations in short and long compose syntax.
// ABOUTME: Infers bind vs named volumes and carries per-type mount options.

use serde::{Deserialize, Serialize};
use serde::de::{self, Deserializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::units::ByteSize;

/// Kind of mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    Bind,
    Volume,
    Tmpfs,
    Npipe,
}

impl fmt::Display for MountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountKind::Bind => write!(f, "bind"),
            MountKind::Volume => write!(f, "volume"),
            MountKind::Tmpfs => write!(f, "tmpfs"),
            MountKind::Npipe => write!(f, "npipe"),
        }
    }
}

/// Bind propagation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Propagation {
    Private,
    Rprivate,
    Shared,
    Rshared,
    Slave,
    Rslave,
}

impl FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Propagation::Private),
            "rprivate" => Ok(Propagation::Rprivate),
            "shared" => Ok(Propagation::Shared),
            "rshared" => Ok(Propagation::Rshared),
            "slave" => Ok(Propagation::Slave),
            "rslave" => Ok(Propagation::Rslave),
            other => Err(format!("unknown bind propagation: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for Propagation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BindOptions {
    #[serde(default)]
    pub propagation: Option<Propagation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VolumeOptions {
    #[serde(default)]
    pub nocopy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TmpfsOptions {
    #[serde(default)]
    pub size: Option<ByteSize>,
}

/// A single mount declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumeConfig {
    #[serde(rename = "type")]
    pub kind: MountKind,
    #[serde(default)]
    pub source: Option<String>,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub bind: Option<BindOptions>,
    #[serde(default)]
    pub volume: Option<VolumeOptions>,
    #[serde(default)]
    pub tmpfs: Option<TmpfsOptions>,
}

impl VolumeConfig {
    /// Parse short syntax: `target`, `source:target` or `source:target:mode[,mode]`.
    pub fn parse_short(spec: &str) -> Result<Self, String> {
        let parts: Vec<&str> = spec.split(':').collect();
        let (source, target, modes) = match parts.as_slice() {
            [target] => (None, *target, None),
            [source, target] => (Some(*source), *target, None),
            [source, target, modes] => (Some(*source), *target, Some(*modes)),
            _ => return Err(format!("invalid volume {spec:?}: too many ':' separators")),
        };

        if target.is_empty() {
            return Err(format!("invalid volume {spec:?}: empty target"));
        }

        let kind = match source {
            Some(s) if is_host_path(s) => MountKind::Bind,
            _ => MountKind::Volume,
        };

        let mut volume = VolumeConfig {
            kind,
            source: source.filter(|s| !s.is_empty()).map(str::to_string),
            target: target.to_string(),
            read_only: false,
            bind: None,
            volume: None,
            tmpfs: None,
        };

        for mode in modes.into_iter().flat_map(|m| m.split(',')) {
            match mode {
                "ro" => volume.read_only = true,
                "rw" => volume.read_only = false,
                // SELinux relabeling is handled by the engine from the bind itself
                "z" | "Z" => {}
                "nocopy" if kind == MountKind::Volume => {
                    volume.volume = Some(VolumeOptions { nocopy: true });
                }
                other => {
                    let propagation: Propagation = other
                        .parse()
                        .map_err(|e| format!("invalid volume {spec:?}: {e}"))?;
                    if kind != MountKind::Bind {
                        return Err(format!(
                            "invalid volume {spec:?}: propagation requires a bind mount"
                        ));
                    }
                    volume.bind = Some(BindOptions {
                        propagation: Some(propagation),
                    });
                }
            }
        }

        Ok(volume)
    }

    /// Resolve a relative bind source against `base`, and `~/` against `home`.
    pub fn resolve_source(&mut self, base: &Path, home: Option<&Path>) {
        if self.kind != MountKind::Bind {
            return;
        }
        let Some(source) = self.source.as_deref() else {
            return;
        };

        let relative = source == "."
            || source == ".."
            || source.starts_with("./")
            || source.starts_with("../");
        let resolved = if relative {
            Some(base.join(source))
        } else if let (Some(rest), Some(home)) = (source.strip_prefix("~/"), home) {
            Some(home.join(rest))
        } else {
            None
        };

        if let Some(path) = resolved {
            self.source = Some(normalize(&path));
        }
    }
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('/') || source.starts_with('.') || source.starts_with('~')
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> String {
    use std::path::Component;

    let mut out = std::path::PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out.to_string_lossy().into_owned()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VolumeEntry {
    Short(String),
    Long(VolumeConfig),
}

/// Deserialize a `volumes:` list mixing short and long syntax.
pub fn deserialize_volumes<'de, D>(deserializer: D) -> Result<Vec<VolumeConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<Vec<VolumeEntry>> = Option::deserialize(deserializer)?;
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            VolumeEntry::Short(spec) => VolumeConfig::parse_short(&spec).map_err(de::Error::custom),
            VolumeEntry::Long(volume) => Ok(volume),
        })
        .collect()
}
