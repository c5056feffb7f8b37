//! Field names and value checks for [`ParameterSet`](super::ParameterSet).

use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

static KUBERNETES_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?\d+\.\d+\.\d+(-[0-9A-Za-z][0-9A-Za-z.-]*)?$")
        .expect("kubernetes version pattern is valid")
});

/// A parameter set field, named the way node files spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    ContainerRuntime,
    UseLegacyCgroupDriver,
    RuntimeEndpoint,
    CniPlugin,
    KubeadmResetOptions,
    KubernetesVersion,
    ClusterCidr,
    PodNetworkCidr,
    HyperkubeImage,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContainerRuntime => "container-runtime",
            Self::UseLegacyCgroupDriver => "use-legacy-cgroup-driver",
            Self::RuntimeEndpoint => "runtime-endpoint",
            Self::CniPlugin => "cni-plugin",
            Self::KubeadmResetOptions => "kubeadm-reset-options",
            Self::KubernetesVersion => "kubernetes-version",
            Self::ClusterCidr => "cluster-cidr",
            Self::PodNetworkCidr => "pod-network-cidr",
            Self::HyperkubeImage => "hyperkube-image",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field whose value was supplied but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    pub field: Field,
    pub value: String,
    pub reason: String,
}

impl InvalidValue {
    pub(crate) fn new(field: Field, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Check an `ADDR/PREFIX` network, IPv4 or IPv6.
pub(crate) fn check_cidr(field: Field, value: &str) -> Result<(), InvalidValue> {
    let (addr, prefix) = value
        .split_once('/')
        .ok_or_else(|| InvalidValue::new(field, value, "expected ADDR/PREFIX"))?;
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| InvalidValue::new(field, value, format!("'{addr}' is not an IP address")))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| InvalidValue::new(field, value, format!("'{prefix}' is not a prefix length")))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(InvalidValue::new(
            field,
            value,
            format!("prefix /{prefix} exceeds /{max}"),
        ));
    }
    Ok(())
}

pub(crate) fn check_kubernetes_version(value: &str) -> Result<(), InvalidValue> {
    if KUBERNETES_VERSION.is_match(value) {
        Ok(())
    } else {
        Err(InvalidValue::new(
            Field::KubernetesVersion,
            value,
            "expected a semantic version such as v1.10.0",
        ))
    }
}

/// The endpoint must name a unix socket, optionally with a `unix://` scheme.
pub(crate) fn check_runtime_endpoint(value: &str) -> Result<(), InvalidValue> {
    let path = value.strip_prefix("unix://").unwrap_or(value);
    if path.starts_with('/') && path.len() > 1 && !has_blank_or_control(path) {
        Ok(())
    } else {
        Err(InvalidValue::new(
            Field::RuntimeEndpoint,
            value,
            "expected an absolute unix socket path",
        ))
    }
}

/// An image reference is one token: no whitespace, no control characters.
pub(crate) fn check_image_reference(field: Field, value: &str) -> Result<(), InvalidValue> {
    if value.trim().is_empty() {
        return Err(InvalidValue::new(field, value, "image reference is blank"));
    }
    if has_blank_or_control(value) {
        return Err(InvalidValue::new(
            field,
            value,
            "image reference must not contain whitespace or control characters",
        ));
    }
    Ok(())
}

fn has_blank_or_control(value: &str) -> bool {
    value.chars().any(|c| c.is_whitespace() || c.is_control())
}
