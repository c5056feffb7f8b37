//! Immutable mapping from artifact kind to compiled template.

use std::collections::BTreeMap;
use std::path::Path;

use tera::Tera;

use super::loader::load_overlays;
use crate::artifact::ArtifactKind;
use crate::error::{RenderError, Result};

const BUILTIN_TEMPLATES: [(ArtifactKind, &str); 10] = [
    (
        ArtifactKind::DockerDaemonConfig,
        include_str!("../../templates/docker-daemon.json.tera"),
    ),
    (
        ArtifactKind::DockerSystemdDropin,
        include_str!("../../templates/docker-dropin.conf.tera"),
    ),
    (
        ArtifactKind::RktletUnit,
        include_str!("../../templates/rktlet.service.tera"),
    ),
    (
        ArtifactKind::WeaveNetworkdConfig,
        include_str!("../../templates/weave.network.tera"),
    ),
    (
        ArtifactKind::BootstrapScript,
        include_str!("../../templates/bootstrap.sh.tera"),
    ),
    (
        ArtifactKind::KubeletDropin,
        include_str!("../../templates/kubelet-dropin.conf.tera"),
    ),
    (
        ArtifactKind::KubeletConfig,
        include_str!("../../templates/kubelet-config.yaml.tera"),
    ),
    (
        ArtifactKind::KubeadmConfig,
        include_str!("../../templates/kubeadm.yaml.tera"),
    ),
    (
        ArtifactKind::RuncWrapper,
        include_str!("../../templates/kube-spawn-runc.sh.tera"),
    ),
    (
        ArtifactKind::CniManifest,
        include_str!("../../templates/calico.yaml.tera"),
    ),
];

/// One compiled template per artifact kind, complete and read-only.
#[derive(Debug)]
pub struct TemplateStore {
    sources: BTreeMap<ArtifactKind, String>,
    tera: Tera,
}

impl TemplateStore {
    /// The templates embedded in this crate.
    pub fn builtin() -> Result<Self> {
        Self::from_sources(builtin_sources())
    }

    /// The embedded templates, with any matching `.tera` files in `dir`
    /// taking their place.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut sources = builtin_sources();
        for (kind, source) in load_overlays(dir)? {
            tracing::info!(%kind, ?dir, "Overriding built-in template");
            sources.insert(kind, source);
        }
        Self::from_sources(sources)
    }

    /// Build a store from explicit sources.
    ///
    /// Every artifact kind must be present and every template must compile;
    /// the first failure aborts the load.
    pub fn from_sources(sources: BTreeMap<ArtifactKind, String>) -> Result<Self> {
        if let Some(kind) = ArtifactKind::ALL
            .into_iter()
            .find(|kind| !sources.contains_key(kind))
        {
            return Err(RenderError::TemplateNotFound { kind });
        }

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        for (kind, source) in &sources {
            tera.add_raw_template(kind.template_name(), source)
                .map_err(|source| RenderError::TemplateSyntaxError {
                    template: kind.template_name().to_string(),
                    source,
                })?;
        }

        tracing::debug!(templates = sources.len(), "Template store loaded");
        Ok(Self { sources, tera })
    }

    /// Template source for `kind`.
    pub fn get(&self, kind: ArtifactKind) -> Result<&str> {
        self.sources
            .get(&kind)
            .map(String::as_str)
            .ok_or(RenderError::TemplateNotFound { kind })
    }

    pub fn kinds(&self) -> impl Iterator<Item = ArtifactKind> + '_ {
        self.sources.keys().copied()
    }

    pub(crate) fn tera(&self) -> &Tera {
        &self.tera
    }
}

fn builtin_sources() -> BTreeMap<ArtifactKind, String> {
    BUILTIN_TEMPLATES
        .iter()
        .map(|(kind, source)| (*kind, (*source).to_string()))
        .collect()
}
