//! Rendering of the configuration artifacts that bootstrap a kube-spawn node.
//!
//! A node running inside a systemd-nspawn container needs a container runtime
//! config, systemd unit and drop-in overrides, kubelet and kubeadm
//! configuration, a bootstrap script, a runc wrapper and a CNI manifest. All
//! of them are rendered from one [`ParameterSet`] by a [`RenderEngine`] over an
//! immutable [`TemplateStore`].
//!
//! Several artifacts encode the same decision independently (cgroup driver,
//! container runtime). [`RenderEngine::render_set`] checks the parameter set
//! against the full request before rendering and re-checks the rendered text
//! afterwards, failing with a single aggregated error rather than producing
//! artifacts that disagree.
//!
//! # Modules
//!
//! - [`artifact`]: The closed set of artifact kinds and their destinations
//! - [`params`]: Parameter set, runtime and cgroup driver selection, validation
//! - [`template_engine`]: Template store and Tera-based rendering
//! - [`consistency`]: Preflight and post-render cross-artifact checks
//! - [`config`]: Engine configuration discovery
//! - [`error`]: Error taxonomy
//!
//! ```no_run
//! use kubespawn_render::{ArtifactKind, ParameterSet, RenderEngine};
//!
//! # fn main() -> kubespawn_render::Result<()> {
//! let engine = RenderEngine::builtin()?;
//! let params = ParameterSet::rkt("v1.10.0", "/run/rktlet.sock")
//!     .with_cni_plugin("ptp")
//!     .with_pod_network_cidr("10.32.0.0/12");
//!
//! let kubelet = engine.render(ArtifactKind::KubeletConfig, &params)?;
//! assert!(kubelet.contains("CRISocket: /run/rktlet.sock"));
//!
//! for file in &engine.render_node(&params)? {
//!     println!("{} ({:o})", file.path, file.mode);
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod consistency;
pub mod error;
pub mod params;
pub mod template_engine;

pub use artifact::{ArtifactFormat, ArtifactKind};
pub use config::{load_engine_config, ConfigSearch, EngineConfig};
pub use consistency::{ConsistencyFinding, ConsistencyReport};
pub use error::{RenderError, Result};
pub use params::{CgroupDriver, ContainerRuntime, Field, ParameterSet};
pub use template_engine::{RenderEngine, RenderedFile, RenderedSet, TemplateStore};
