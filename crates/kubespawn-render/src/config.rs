//! Engine configuration and its discovery on disk.
//!
//! [`ConfigSearch`] looks in two places, most specific first:
//! 1. `<project>/.kubespawn-render.toml`
//! 2. `<home>/.config/kubespawn-render.toml`
//!
//! A relative `template-dir` is resolved against the directory of the file
//! that named it, so a project config can ship its overlays next to itself.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{RenderError, Result};

const PROJECT_CONFIG: &str = ".kubespawn-render.toml";
const USER_CONFIG: [&str; 2] = [".config", "kubespawn-render.toml"];

fn default_true() -> bool {
    true
}

/// How the render engine is assembled.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Directory of `.tera` files overriding the built-in templates.
    pub template_dir: Option<String>,

    /// Re-check rendered artifact sets for cgroup driver and runtime
    /// agreement. Default: true.
    #[serde(default = "default_true")]
    pub verify_rendered: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_dir: None,
            verify_rendered: true,
        }
    }
}

impl EngineConfig {
    /// Read a config file, failing on any I/O or parse problem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let config_err = |reason: String| RenderError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        let mut config: Self = toml::from_str(&contents).map_err(|e| config_err(e.to_string()))?;

        if let (Some(dir), Some(base)) = (config.template_dir.as_mut(), path.parent()) {
            if !dir.starts_with("~/") && Path::new(dir.as_str()).is_relative() {
                *dir = base.join(&*dir).to_string_lossy().into_owned();
            }
        }
        Ok(config)
    }

    /// Overlay directory with a leading `~/` resolved against `$HOME`.
    pub fn template_dir(&self) -> Option<PathBuf> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        self.template_dir
            .as_deref()
            .map(|dir| resolve_home(dir, home.as_deref()))
    }
}

/// The places an [`EngineConfig`] may live for one project and one user.
#[derive(Debug, Clone)]
pub struct ConfigSearch {
    project_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl ConfigSearch {
    pub fn new(project_dir: impl Into<PathBuf>, home_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            home_dir,
        }
    }

    /// The working directory and `$HOME` of this process.
    pub fn from_env() -> Self {
        Self::new(".", std::env::var_os("HOME").map(PathBuf::from))
    }

    /// Candidate files in precedence order, whether or not they exist.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let user = self
            .home_dir
            .as_ref()
            .map(|home| USER_CONFIG.iter().fold(home.clone(), |p, part| p.join(part)));
        std::iter::once(self.project_dir.join(PROJECT_CONFIG))
            .chain(user)
            .collect()
    }

    /// The first candidate that exists.
    pub fn find(&self) -> Option<PathBuf> {
        self.candidates().into_iter().find(|path| path.is_file())
    }

    /// Load the first config found. A config that fails to load is logged and
    /// replaced by defaults; lower-precedence files are not consulted.
    pub fn load(&self) -> EngineConfig {
        let Some(path) = self.find() else {
            tracing::debug!("No render config found, using defaults");
            return EngineConfig::default();
        };
        match EngineConfig::from_path(&path) {
            Ok(config) => {
                tracing::debug!(?path, "Loaded render config");
                config
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "Failed to load render config, using defaults");
                EngineConfig::default()
            }
        }
    }
}

/// Load config for the current process, or return defaults.
pub fn load_engine_config() -> EngineConfig {
    ConfigSearch::from_env().load()
}

fn resolve_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
