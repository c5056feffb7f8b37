//! Rendering of single artifacts and of whole node artifact sets.

use tera::Context;

use super::context;
use super::store::TemplateStore;
use crate::artifact::ArtifactKind;
use crate::config::EngineConfig;
use crate::consistency;
use crate::error::{RenderError, Result};
use crate::params::ParameterSet;

/// Stateless renderer over an immutable [`TemplateStore`].
///
/// Shareable across threads; concurrent renders need no coordination.
#[derive(Debug)]
pub struct RenderEngine {
    store: TemplateStore,
    verify_rendered: bool,
}

/// A rendered artifact ready to be written to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub kind: ArtifactKind,
    /// Destination inside the node's root filesystem.
    pub path: String,
    /// Unix permission bits.
    pub mode: u32,
    /// Rendered content.
    pub content: String,
}

impl RenderedFile {
    pub fn new(kind: ArtifactKind, content: String) -> Self {
        Self {
            kind,
            path: kind.destination().to_string(),
            mode: kind.mode(),
            content,
        }
    }
}

/// The artifacts of one pass, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSet {
    files: Vec<RenderedFile>,
}

impl RenderedSet {
    pub fn get(&self, kind: ArtifactKind) -> Option<&RenderedFile> {
        self.files.iter().find(|f| f.kind == kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderedFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_files(self) -> Vec<RenderedFile> {
        self.files
    }
}

impl IntoIterator for RenderedSet {
    type Item = RenderedFile;
    type IntoIter = std::vec::IntoIter<RenderedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a RenderedSet {
    type Item = &'a RenderedFile;
    type IntoIter = std::slice::Iter<'a, RenderedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

impl RenderEngine {
    pub fn new(store: TemplateStore) -> Self {
        Self {
            store,
            verify_rendered: true,
        }
    }

    /// Engine over the embedded templates.
    pub fn builtin() -> Result<Self> {
        TemplateStore::builtin().map(Self::new)
    }

    /// Engine as described by an [`EngineConfig`].
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let store = match config.template_dir() {
            Some(dir) => TemplateStore::from_dir(&dir)?,
            None => TemplateStore::builtin()?,
        };
        Ok(Self::new(store).with_verification(config.verify_rendered))
    }

    /// Toggle the post-render agreement check of [`RenderEngine::render_set`].
    pub fn with_verification(mut self, verify_rendered: bool) -> Self {
        self.verify_rendered = verify_rendered;
        self
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Render one artifact. All-or-nothing: no partial text on failure.
    pub fn render(&self, kind: ArtifactKind, params: &ParameterSet) -> Result<String> {
        params.validate_for(kind)?;
        self.render_with(kind, &context::build(params))
    }

    /// Render `kinds` from one parameter set.
    ///
    /// The whole request is checked up front and every problem is reported
    /// in one [`RenderError::ConsistencyViolation`]. Unless disabled, the
    /// rendered text is checked afterwards for cgroup driver and runtime
    /// agreement.
    pub fn render_set(&self, kinds: &[ArtifactKind], params: &ParameterSet) -> Result<RenderedSet> {
        let report = consistency::preflight(params, kinds);
        if !report.is_consistent() {
            tracing::warn!(findings = report.findings.len(), "Preflight rejected parameter set");
        }
        report.into_result()?;

        let context = context::build(params);
        let files = kinds
            .iter()
            .map(|&kind| Ok(RenderedFile::new(kind, self.render_with(kind, &context)?)))
            .collect::<Result<Vec<_>>>()?;

        if self.verify_rendered {
            consistency::verify_rendered(params, &files)
                .into_result()
                .inspect_err(|e| tracing::warn!(error = %e, "Rendered artifacts disagree"))?;
        }

        tracing::debug!(
            artifacts = files.len(),
            runtime = %params.container_runtime,
            cgroup_driver = %params.cgroup_driver(),
            "Rendered artifact set"
        );
        Ok(RenderedSet { files })
    }

    /// Render everything a node with this runtime needs.
    pub fn render_node(&self, params: &ParameterSet) -> Result<RenderedSet> {
        self.render_set(&ArtifactKind::for_runtime(params.container_runtime), params)
    }

    fn render_with(&self, kind: ArtifactKind, context: &Context) -> Result<String> {
        self.store.get(kind)?;
        let rendered = self
            .store
            .tera()
            .render(kind.template_name(), context)
            .map_err(|source| RenderError::ExecutionError { kind, source })?;
        tracing::debug!(%kind, bytes = rendered.len(), "Rendered artifact");
        Ok(rendered)
    }
}
