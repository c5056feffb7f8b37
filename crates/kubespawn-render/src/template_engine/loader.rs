//! Load `.tera` overlay templates from a directory.

use std::path::Path;

use crate::artifact::ArtifactKind;
use crate::error::{RenderError, Result};

/// Read every `.tera` file in `dir` whose name matches an artifact's
/// template name.
///
/// Unknown `.tera` files are skipped with a warning; other files are ignored.
/// The result is ordered by artifact kind.
pub(crate) fn load_overlays(dir: &Path) -> Result<Vec<(ArtifactKind, String)>> {
    let io_err = |source| RenderError::TemplateLoad {
        dir: dir.to_path_buf(),
        source,
    };

    let mut overlays = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "tera") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match ArtifactKind::from_template_name(name) {
            Some(kind) => {
                let source = std::fs::read_to_string(&path).map_err(io_err)?;
                tracing::debug!(?path, %kind, "Loaded overlay template");
                overlays.push((kind, source));
            }
            None => {
                tracing::warn!(?path, "Skipping template: no artifact uses this name");
            }
        }
    }

    overlays.sort_by_key(|(kind, _)| *kind);
    Ok(overlays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_overlays() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rktlet.service.tera"), "--net={{ cni_plugin }}\n").unwrap();
        fs::write(dir.path().join("bootstrap.sh.tera"), "#!/bin/sh\n").unwrap();

        let overlays = load_overlays(dir.path()).unwrap();
        let kinds: Vec<_> = overlays.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![ArtifactKind::RktletUnit, ArtifactKind::BootstrapScript]);
        assert_eq!(overlays[1].1, "#!/bin/sh\n");
    }

    #[test]
    fn test_ignores_unknown_and_non_tera_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("kubelet-config.yaml.tera"), "cgroupDriver: x").unwrap();
        fs::write(dir.path().join("extra.tera"), "{{ nope }}").unwrap();
        fs::write(dir.path().join("README.md"), "# Not a template").unwrap();
        fs::create_dir(dir.path().join("nested.tera")).unwrap();

        let overlays = load_overlays(dir.path()).unwrap();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].0, ArtifactKind::KubeletConfig);
    }

    #[test]
    fn test_missing_dir_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_overlays(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, RenderError::TemplateLoad { .. }));
        assert!(err.to_string().contains("absent"));
    }
}
