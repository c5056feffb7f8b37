//! The parameter set driving one rendering pass.
//!
//! A [`ParameterSet`] is built once per node (programmatically or from a
//! TOML node file) and handed by reference to every render of that pass.
//! Derived decisions such as the cgroup driver token are computed here, once,
//! so every template sees the same value.

mod runtime;
mod validate;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use runtime::{CgroupDriver, ContainerRuntime};
pub use validate::{Field, InvalidValue};

use crate::artifact::ArtifactKind;
use crate::consistency::ConsistencyFinding;
use crate::error::{RenderError, Result};

/// Typed inputs for one node configuration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterSet {
    pub container_runtime: ContainerRuntime,

    /// `true` selects the `cgroupfs` driver, `false` selects `systemd`.
    #[serde(default)]
    pub use_legacy_cgroup_driver: bool,

    /// CRI socket of a remote runtime. Must be absent for docker.
    #[serde(default)]
    pub runtime_endpoint: Option<String>,

    /// Network plugin passed to rktlet (`--net=`).
    #[serde(default)]
    pub cni_plugin: String,

    /// Appended verbatim to `kubeadm reset` in the bootstrap script.
    #[serde(default)]
    pub kubeadm_reset_options: String,

    #[serde(default)]
    pub kubernetes_version: String,

    /// kube-proxy cluster CIDR; empty omits the `kubeProxy` block.
    #[serde(default)]
    pub cluster_cidr: String,

    /// Pod subnet; empty omits the `networking` block.
    #[serde(default)]
    pub pod_network_cidr: String,

    /// Unified control plane image; empty omits the key.
    #[serde(default)]
    pub hyperkube_image: String,
}

impl ParameterSet {
    fn new(container_runtime: ContainerRuntime, kubernetes_version: impl Into<String>) -> Self {
        Self {
            container_runtime,
            use_legacy_cgroup_driver: false,
            runtime_endpoint: None,
            cni_plugin: String::new(),
            kubeadm_reset_options: String::new(),
            kubernetes_version: kubernetes_version.into(),
            cluster_cidr: String::new(),
            pod_network_cidr: String::new(),
            hyperkube_image: String::new(),
        }
    }

    /// Parameters for a docker node.
    pub fn docker(kubernetes_version: impl Into<String>) -> Self {
        Self::new(ContainerRuntime::Docker, kubernetes_version)
    }

    /// Parameters for an rkt node whose rktlet listens on `runtime_endpoint`.
    pub fn rkt(kubernetes_version: impl Into<String>, runtime_endpoint: impl Into<String>) -> Self {
        Self::new(ContainerRuntime::Rkt, kubernetes_version).with_runtime_endpoint(runtime_endpoint)
    }

    pub fn with_legacy_cgroup_driver(mut self, use_legacy: bool) -> Self {
        self.use_legacy_cgroup_driver = use_legacy;
        self
    }

    pub fn with_runtime_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.runtime_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_cni_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.cni_plugin = plugin.into();
        self
    }

    pub fn with_kubeadm_reset_options(mut self, options: impl Into<String>) -> Self {
        self.kubeadm_reset_options = options.into();
        self
    }

    pub fn with_cluster_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.cluster_cidr = cidr.into();
        self
    }

    pub fn with_pod_network_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.pod_network_cidr = cidr.into();
        self
    }

    pub fn with_hyperkube_image(mut self, image: impl Into<String>) -> Self {
        self.hyperkube_image = image.into();
        self
    }

    /// Parse a TOML node file.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Read and parse a TOML node file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| RenderError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let params = Self::from_toml_str(&contents).map_err(|e| RenderError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(?path, runtime = %params.container_runtime, "Loaded node parameters");
        Ok(params)
    }

    /// The single cgroup driver every artifact of this pass must name.
    pub fn cgroup_driver(&self) -> CgroupDriver {
        CgroupDriver::from_legacy_flag(self.use_legacy_cgroup_driver)
    }

    pub fn is_remote_runtime(&self) -> bool {
        self.container_runtime.is_remote()
    }

    /// The runtime endpoint, treating an empty string as absent.
    pub fn runtime_endpoint(&self) -> Option<&str> {
        self.runtime_endpoint.as_deref().filter(|e| !e.is_empty())
    }

    /// An endpoint was supplied although docker needs none.
    pub fn has_contradictory_endpoint(&self) -> bool {
        !self.is_remote_runtime() && self.runtime_endpoint().is_some()
    }

    /// Fields that must be non-empty to render `kind` with these parameters.
    pub fn required_fields(&self, kind: ArtifactKind) -> Vec<Field> {
        match kind {
            ArtifactKind::RktletUnit => vec![Field::CniPlugin],
            ArtifactKind::KubeletDropin | ArtifactKind::KubeletConfig
                if self.is_remote_runtime() =>
            {
                vec![Field::RuntimeEndpoint]
            }
            ArtifactKind::KubeadmConfig => vec![Field::KubernetesVersion],
            _ => Vec::new(),
        }
    }

    /// Required fields for `kind` that are empty.
    pub fn missing_fields(&self, kind: ArtifactKind) -> Vec<Field> {
        self.required_fields(kind)
            .into_iter()
            .filter(|&field| self.is_empty(field))
            .collect()
    }

    fn is_empty(&self, field: Field) -> bool {
        match field {
            Field::ContainerRuntime | Field::UseLegacyCgroupDriver => false,
            Field::RuntimeEndpoint => self.runtime_endpoint().is_none(),
            Field::CniPlugin => self.cni_plugin.trim().is_empty(),
            Field::KubeadmResetOptions => self.kubeadm_reset_options.is_empty(),
            Field::KubernetesVersion => self.kubernetes_version.trim().is_empty(),
            Field::ClusterCidr => self.cluster_cidr.is_empty(),
            Field::PodNetworkCidr => self.pod_network_cidr.is_empty(),
            Field::HyperkubeImage => self.hyperkube_image.is_empty(),
        }
    }

    /// Every supplied value that fails its format check.
    pub fn invalid_values(&self) -> Vec<InvalidValue> {
        let mut invalid = Vec::new();
        if let Some(endpoint) = self.runtime_endpoint() {
            invalid.extend(validate::check_runtime_endpoint(endpoint).err());
        }
        if !self.kubernetes_version.is_empty() {
            invalid.extend(validate::check_kubernetes_version(&self.kubernetes_version).err());
        }
        if !self.cluster_cidr.is_empty() {
            invalid.extend(validate::check_cidr(Field::ClusterCidr, &self.cluster_cidr).err());
        }
        if !self.pod_network_cidr.is_empty() {
            invalid.extend(validate::check_cidr(Field::PodNetworkCidr, &self.pod_network_cidr).err());
        }
        if !self.hyperkube_image.is_empty() {
            invalid.extend(
                validate::check_image_reference(Field::HyperkubeImage, &self.hyperkube_image).err(),
            );
        }
        invalid
    }

    /// Check these parameters before rendering a single `kind`.
    ///
    /// Contradictions come first, then missing fields, then malformed values;
    /// the first problem found is returned.
    pub fn validate_for(&self, kind: ArtifactKind) -> Result<()> {
        if self.has_contradictory_endpoint() {
            return Err(RenderError::ConsistencyViolation {
                findings: vec![ConsistencyFinding::endpoint_without_remote_runtime(self)],
            });
        }
        if let Some(field) = self.missing_fields(kind).into_iter().next() {
            return Err(RenderError::MissingParameter { kind, field });
        }
        if let Some(invalid) = self.invalid_values().into_iter().next() {
            return Err(invalid.into());
        }
        Ok(())
    }
}
