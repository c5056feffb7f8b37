//! The closed set of artifacts a kube-spawn node needs, with the metadata
//! collaborators use to place them (destination path, file mode, format).

use std::fmt;
use std::str::FromStr;

use crate::params::ContainerRuntime;

/// One kind of generated configuration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    /// `/etc/docker/daemon.json`
    DockerDaemonConfig,
    /// systemd drop-in passing the cgroup driver to dockerd
    DockerSystemdDropin,
    /// `rktlet.service` unit
    RktletUnit,
    /// networkd config that keeps weave interfaces unmanaged
    WeaveNetworkdConfig,
    /// Node bootstrap script run inside the container
    BootstrapScript,
    /// kubelet systemd drop-in
    KubeletDropin,
    /// `KubeletConfiguration` manifest
    KubeletConfig,
    /// kubeadm `MasterConfiguration`
    KubeadmConfig,
    /// docker-runc wrapper adding `--no-new-keyring`
    RuncWrapper,
    /// Calico CNI manifest
    CniManifest,
}

/// Syntax family of a rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Systemd,
    Yaml,
    Shell,
}

impl ArtifactKind {
    /// Every artifact kind, in the order a node's files are written.
    pub const ALL: [ArtifactKind; 10] = [
        ArtifactKind::DockerDaemonConfig,
        ArtifactKind::DockerSystemdDropin,
        ArtifactKind::RuncWrapper,
        ArtifactKind::RktletUnit,
        ArtifactKind::WeaveNetworkdConfig,
        ArtifactKind::KubeletDropin,
        ArtifactKind::KubeletConfig,
        ArtifactKind::KubeadmConfig,
        ArtifactKind::CniManifest,
        ArtifactKind::BootstrapScript,
    ];

    /// Kebab-case identifier, also accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DockerDaemonConfig => "docker-daemon-config",
            Self::DockerSystemdDropin => "docker-systemd-dropin",
            Self::RktletUnit => "rktlet-unit",
            Self::WeaveNetworkdConfig => "weave-networkd-config",
            Self::BootstrapScript => "bootstrap-script",
            Self::KubeletDropin => "kubelet-dropin",
            Self::KubeletConfig => "kubelet-config",
            Self::KubeadmConfig => "kubeadm-config",
            Self::RuncWrapper => "runc-wrapper",
            Self::CniManifest => "cni-manifest",
        }
    }

    /// Name of the template backing this artifact in the template store.
    ///
    /// Overlay directories must use the same file names.
    pub fn template_name(self) -> &'static str {
        match self {
            Self::DockerDaemonConfig => "docker-daemon.json.tera",
            Self::DockerSystemdDropin => "docker-dropin.conf.tera",
            Self::RktletUnit => "rktlet.service.tera",
            Self::WeaveNetworkdConfig => "weave.network.tera",
            Self::BootstrapScript => "bootstrap.sh.tera",
            Self::KubeletDropin => "kubelet-dropin.conf.tera",
            Self::KubeletConfig => "kubelet-config.yaml.tera",
            Self::KubeadmConfig => "kubeadm.yaml.tera",
            Self::RuncWrapper => "kube-spawn-runc.sh.tera",
            Self::CniManifest => "calico.yaml.tera",
        }
    }

    /// Reverse lookup of [`ArtifactKind::template_name`].
    pub fn from_template_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.template_name() == name)
    }

    /// Absolute path of the artifact inside the node's root filesystem.
    pub fn destination(self) -> &'static str {
        match self {
            Self::DockerDaemonConfig => "/etc/docker/daemon.json",
            Self::DockerSystemdDropin => "/etc/systemd/system/docker.service.d/20-kube-spawn.conf",
            Self::RktletUnit => "/usr/lib/systemd/system/rktlet.service",
            Self::WeaveNetworkdConfig => "/etc/systemd/network/50-weave.network",
            Self::BootstrapScript => "/opt/kube-spawn/bootstrap.sh",
            Self::KubeletDropin => "/etc/systemd/system/kubelet.service.d/20-kube-spawn.conf",
            Self::KubeletConfig => "/etc/kubernetes/kubelet.yaml",
            Self::KubeadmConfig => "/etc/kubeadm/kubeadm.yml",
            Self::RuncWrapper => "/usr/bin/kube-spawn-runc",
            Self::CniManifest => "/etc/kubernetes/cni/calico.yaml",
        }
    }

    /// Unix permission bits for the written file.
    pub fn mode(self) -> u32 {
        match self {
            Self::BootstrapScript | Self::RuncWrapper => 0o755,
            _ => 0o644,
        }
    }

    pub fn is_executable(self) -> bool {
        self.mode() & 0o111 != 0
    }

    pub fn format(self) -> ArtifactFormat {
        match self {
            Self::DockerDaemonConfig => ArtifactFormat::Json,
            Self::DockerSystemdDropin
            | Self::RktletUnit
            | Self::WeaveNetworkdConfig
            | Self::KubeletDropin => ArtifactFormat::Systemd,
            Self::KubeletConfig | Self::KubeadmConfig | Self::CniManifest => ArtifactFormat::Yaml,
            Self::BootstrapScript | Self::RuncWrapper => ArtifactFormat::Shell,
        }
    }

    /// The only runtime this artifact belongs to, if it is runtime specific.
    pub fn runtime_affinity(self) -> Option<ContainerRuntime> {
        match self {
            Self::DockerDaemonConfig | Self::DockerSystemdDropin | Self::RuncWrapper => {
                Some(ContainerRuntime::Docker)
            }
            Self::RktletUnit => Some(ContainerRuntime::Rkt),
            Self::WeaveNetworkdConfig
            | Self::BootstrapScript
            | Self::KubeletDropin
            | Self::KubeletConfig
            | Self::KubeadmConfig
            | Self::CniManifest => None,
        }
    }

    /// Whether the rendered text carries a cgroup driver token.
    pub fn mentions_cgroup_driver(self) -> bool {
        matches!(
            self,
            Self::DockerSystemdDropin | Self::KubeletDropin | Self::KubeletConfig
        )
    }

    /// Whether the rendered text carries the remote-runtime flags when the
    /// runtime is not docker.
    pub fn carries_remote_runtime(self) -> bool {
        matches!(self, Self::KubeletDropin | Self::KubeletConfig)
    }

    /// Every artifact a node running `runtime` needs, in write order.
    pub fn for_runtime(runtime: ContainerRuntime) -> Vec<ArtifactKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.runtime_affinity().is_none_or(|r| r == runtime))
            .collect()
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown artifact name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown artifact kind: '{0}'")]
pub struct UnknownArtifactKind(pub String);

impl FromStr for ArtifactKind {
    type Err = UnknownArtifactKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownArtifactKind(s.to_string()))
    }
}
