//! Tera-based rendering of node artifacts.
//!
//! The [`TemplateStore`] holds exactly one compiled template per
//! [`ArtifactKind`](crate::ArtifactKind). It is built once, from the embedded
//! templates optionally overlaid by a directory of `.tera` files, and is
//! read-only afterwards. The [`RenderEngine`] turns a kind plus a
//! [`ParameterSet`](crate::ParameterSet) into text.
//!
//! Templates use Tera's whitespace control: `{%-` strips all whitespace
//! (newlines included) before a tag and `-%}` strips all whitespace after it.
//! Nothing else is trimmed, so the line-continued kubelet drop-in keeps its
//! exact layout.

mod context;
mod engine;
mod loader;
mod store;

pub use engine::{RenderEngine, RenderedFile, RenderedSet};
pub use store::TemplateStore;
