//! Parameter set → Tera context.

use tera::Context;

use crate::params::ParameterSet;

/// Build the context every template of one pass is rendered with.
///
/// Derived values are computed here once: `cgroup_driver` is the only
/// spelling of the driver any template sees.
pub(crate) fn build(params: &ParameterSet) -> Context {
    let mut context = Context::new();
    context.insert("container_runtime", params.container_runtime.as_str());
    context.insert("cgroup_driver", params.cgroup_driver().as_str());
    context.insert("runtime_endpoint", params.runtime_endpoint().unwrap_or_default());
    context.insert("cni_plugin", &params.cni_plugin);
    context.insert("kubeadm_reset_options", &params.kubeadm_reset_options);
    context.insert("kubernetes_version", &params.kubernetes_version);
    context.insert("cluster_cidr", &params.cluster_cidr);
    context.insert("pod_network_cidr", &params.pod_network_cidr);
    context.insert("hyperkube_image", &params.hyperkube_image);
    context
}
