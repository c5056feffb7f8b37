//! Container runtime and cgroup driver selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::validate::{Field, InvalidValue};

/// Container runtime the node's kubelet talks to.
///
/// Anything other than docker is reached through the CRI socket given by the
/// parameter set's runtime endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Rkt,
}

impl ContainerRuntime {
    pub const ALL: [ContainerRuntime; 2] = [ContainerRuntime::Docker, ContainerRuntime::Rkt];

    /// Value templates compare against (`container_runtime == "docker"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Rkt => "rkt",
        }
    }

    /// True for every runtime kubelet reaches through `--container-runtime=remote`.
    pub fn is_remote(self) -> bool {
        !matches!(self, Self::Docker)
    }

    /// The systemd unit the bootstrap script starts for this runtime.
    pub fn service_unit(self) -> &'static str {
        match self {
            Self::Docker => "docker.service",
            Self::Rkt => "rktlet.service",
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerRuntime {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rt| rt.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                InvalidValue::new(
                    Field::ContainerRuntime,
                    s,
                    format!("expected one of: {}", Self::ALL.map(Self::as_str).join(", ")),
                )
            })
    }
}

/// cgroup driver shared by dockerd and kubelet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CgroupDriver {
    Cgroupfs,
    Systemd,
}

impl CgroupDriver {
    pub fn from_legacy_flag(use_legacy: bool) -> Self {
        if use_legacy {
            Self::Cgroupfs
        } else {
            Self::Systemd
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cgroupfs => "cgroupfs",
            Self::Systemd => "systemd",
        }
    }
}

impl fmt::Display for CgroupDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
