//! Integration tests for cross-artifact agreement, overlays and sharing one
//! engine between threads.

mod common;

use std::fs;

use common::{engine, init_tracing, minimal_docker, minimal_rkt};
use kubespawn_render::consistency::{self, cgroup_driver_tokens};
use kubespawn_render::{
    ArtifactKind, CgroupDriver, ContainerRuntime, EngineConfig, Field, RenderEngine, RenderError,
};

fn overlay_engine(files: &[(&str, &str)]) -> (tempfile::TempDir, kubespawn_render::Result<RenderEngine>) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    let config = EngineConfig {
        template_dir: Some(dir.path().to_string_lossy().into_owned()),
        verify_rendered: true,
    };
    let engine = RenderEngine::from_config(&config);
    (dir, engine)
}

fn violation_codes(err: &RenderError) -> Vec<&str> {
    match err {
        RenderError::ConsistencyViolation { findings } => {
            findings.iter().map(|f| f.code.as_str()).collect()
        }
        other => panic!("Expected ConsistencyViolation, got {other:?}"),
    }
}

// ==========================================================================
// cgroup driver agreement
// ==========================================================================

#[test]
fn test_cgroup_driver_agrees_across_artifacts() {
    let engine = engine().with_verification(false);

    for legacy in [false, true] {
        let expected = CgroupDriver::from_legacy_flag(legacy).as_str();
        for (params, mentions) in [(minimal_docker(), 3), (minimal_rkt(), 2)] {
            let params = params.with_legacy_cgroup_driver(legacy);
            let set = engine.render_node(&params).unwrap();

            let tokens: Vec<&str> = set
                .iter()
                .flat_map(|file| cgroup_driver_tokens(&file.content))
                .collect();
            assert_eq!(
                tokens.len(),
                mentions,
                "{} node with legacy={legacy}",
                params.container_runtime
            );
            assert!(
                tokens.iter().all(|&t| t == expected),
                "expected only {expected}, got {tokens:?}"
            );
        }
    }
}

#[test]
fn test_legacy_flag_selects_cgroupfs() {
    let params = minimal_docker().with_legacy_cgroup_driver(true);
    let set = engine().render_node(&params).unwrap();

    let dropin = &set.get(ArtifactKind::DockerSystemdDropin).unwrap().content;
    assert!(dropin.contains("native.cgroupdriver=cgroupfs"));
    let kubelet = &set.get(ArtifactKind::KubeletDropin).unwrap().content;
    assert!(kubelet.contains("--cgroup-driver=cgroupfs"));
    let config = &set.get(ArtifactKind::KubeletConfig).unwrap().content;
    assert!(config.contains("cgroupDriver: cgroupfs"));
}

#[test]
fn test_verify_rendered_accepts_builtin_output() {
    let engine = engine().with_verification(false);
    for params in [minimal_docker(), minimal_rkt()] {
        let set = engine.render_node(&params).unwrap();
        let files = set.into_files();
        let report = consistency::verify_rendered(&params, &files);
        assert!(report.is_consistent(), "{:?}", report.findings);
    }
}

// ==========================================================================
// Preflight
// ==========================================================================

#[test]
fn test_preflight_collects_every_problem() {
    let params = kubespawn_render::ParameterSet {
        kubernetes_version: "1.10".into(),
        cluster_cidr: "not-a-cidr".into(),
        ..minimal_docker().with_runtime_endpoint("rktlet.sock")
    };
    let kinds = [
        ArtifactKind::RktletUnit,
        ArtifactKind::KubeadmConfig,
        ArtifactKind::KubeadmConfig,
    ];

    let err = engine().render_set(&kinds, &params).unwrap_err();
    let codes = violation_codes(&err);
    for code in [
        "DUPLICATE_KIND",
        "ENDPOINT_WITHOUT_REMOTE_RUNTIME",
        "RUNTIME_MISMATCH",
        "MISSING_PARAMETER",
        "INVALID_PARAMETER",
    ] {
        assert!(codes.contains(&code), "missing {code} in {codes:?}");
    }
    // endpoint, version and cluster CIDR are each malformed
    assert_eq!(codes.iter().filter(|&&c| c == "INVALID_PARAMETER").count(), 3);

    let fields = err.offending_fields();
    for field in [
        Field::RuntimeEndpoint,
        Field::ContainerRuntime,
        Field::CniPlugin,
        Field::KubernetesVersion,
        Field::ClusterCidr,
    ] {
        assert!(fields.contains(&field), "missing {field} in {fields:?}");
    }
}

#[test]
fn test_endpoint_with_docker_is_rejected_for_any_kind() {
    let params = minimal_docker().with_runtime_endpoint("/run/rktlet.sock");
    let err = engine()
        .render(ArtifactKind::WeaveNetworkdConfig, &params)
        .unwrap_err();
    assert_eq!(violation_codes(&err), vec!["ENDPOINT_WITHOUT_REMOTE_RUNTIME"]);
    assert!(err.is_caller_error());
}

#[test]
fn test_empty_endpoint_counts_as_absent() {
    let params = minimal_docker().with_runtime_endpoint("");
    assert!(engine().render_node(&params).is_ok());
}

#[test]
fn test_rkt_node_without_endpoint_reports_both_kubelet_artifacts() {
    let mut params = minimal_rkt();
    params.runtime_endpoint = None;

    let err = engine().render_node(&params).unwrap_err();
    let RenderError::ConsistencyViolation { findings } = &err else {
        panic!("Expected ConsistencyViolation, got {err:?}");
    };
    let kinds: Vec<_> = findings
        .iter()
        .filter(|f| f.code == "MISSING_PARAMETER")
        .filter_map(|f| f.kind)
        .collect();
    assert_eq!(kinds, vec![ArtifactKind::KubeletDropin, ArtifactKind::KubeletConfig]);
}

#[test]
fn test_render_node_skips_other_runtime_artifacts() {
    let engine = engine();

    let docker = engine.render_node(&minimal_docker()).unwrap();
    assert!(docker.get(ArtifactKind::RktletUnit).is_none());
    assert_eq!(docker.len(), ArtifactKind::for_runtime(ContainerRuntime::Docker).len());

    let rkt = engine.render_node(&minimal_rkt()).unwrap();
    for kind in [
        ArtifactKind::DockerDaemonConfig,
        ArtifactKind::DockerSystemdDropin,
        ArtifactKind::RuncWrapper,
    ] {
        assert!(rkt.get(kind).is_none(), "{kind} rendered for rkt");
    }
}

// ==========================================================================
// Overlays
// ==========================================================================

#[test]
fn test_overlay_hardcoding_cgroupfs_is_caught() {
    let (_dir, engine) = overlay_engine(&[(
        "kubelet-config.yaml.tera",
        "kind: KubeletConfiguration\ncgroupDriver: cgroupfs\n",
    )]);
    let engine = engine.unwrap();

    let err = engine.render_node(&minimal_docker()).unwrap_err();
    let RenderError::ConsistencyViolation { findings } = &err else {
        panic!("Expected ConsistencyViolation, got {err:?}");
    };
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, "CGROUP_DRIVER_MISMATCH");
    assert_eq!(findings[0].kind, Some(ArtifactKind::KubeletConfig));

    // the overlay agrees once the node really uses cgroupfs
    let legacy = minimal_docker().with_legacy_cgroup_driver(true);
    assert!(engine.render_node(&legacy).is_ok());
}

#[test]
fn test_overlay_dropping_driver_is_caught() {
    let (_dir, engine) = overlay_engine(&[(
        "docker-dropin.conf.tera",
        "[Service]\nEnvironment=\"DOCKER_OPTS=\"\n",
    )]);
    let err = engine.unwrap().render_node(&minimal_docker()).unwrap_err();
    assert_eq!(violation_codes(&err), vec!["CGROUP_DRIVER_ABSENT"]);
}

#[test]
fn test_overlay_starting_wrong_runtime_is_caught() {
    let (_dir, engine) = overlay_engine(&[(
        "bootstrap.sh.tera",
        "#!/bin/bash\nsystemctl start --no-block docker.service\n",
    )]);
    let err = engine.unwrap().render_node(&minimal_rkt()).unwrap_err();
    let codes = violation_codes(&err);
    assert!(codes.iter().all(|&c| c == "RUNTIME_SERVICE_MISMATCH"), "{codes:?}");
    assert!(!codes.is_empty());
}

#[test]
fn test_overlay_with_remote_flags_on_docker_is_caught() {
    let (_dir, engine) = overlay_engine(&[(
        "kubelet-dropin.conf.tera",
        "[Service]\nEnvironment=\"KUBELET_EXTRA_ARGS=--cgroup-driver={{ cgroup_driver }} --container-runtime=remote\"\n",
    )]);
    let err = engine.unwrap().render_node(&minimal_docker()).unwrap_err();
    assert_eq!(violation_codes(&err), vec!["REMOTE_RUNTIME_UNEXPECTED"]);
}

#[test]
fn test_overlay_dropping_remote_switch_is_caught() {
    let (_dir, engine) = overlay_engine(&[(
        "kubelet-dropin.conf.tera",
        "[Service]\nEnvironment=\"KUBELET_EXTRA_ARGS=--cgroup-driver={{ cgroup_driver }} --container-runtime-endpoint={{ runtime_endpoint }}\"\n",
    )]);
    let err = engine.unwrap().render_node(&minimal_rkt()).unwrap_err();
    let RenderError::ConsistencyViolation { findings } = &err else {
        panic!("Expected ConsistencyViolation, got {err:?}");
    };
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, "REMOTE_RUNTIME_MISSING");
    assert_eq!(findings[0].kind, Some(ArtifactKind::KubeletDropin));
}

#[test]
fn test_malformed_overlay_fails_to_load() {
    let (_dir, engine) = overlay_engine(&[("kubeadm.yaml.tera", "{% if cluster_cidr %}\nunclosed\n")]);
    match engine {
        Err(RenderError::TemplateSyntaxError { template, .. }) => {
            assert_eq!(template, "kubeadm.yaml.tera")
        }
        other => panic!("Expected TemplateSyntaxError, got {other:?}"),
    }
}

#[test]
fn test_missing_overlay_dir_fails_to_load() {
    let config = EngineConfig {
        template_dir: Some("/nonexistent/kubespawn-render/templates".into()),
        verify_rendered: true,
    };
    assert!(matches!(
        RenderEngine::from_config(&config),
        Err(RenderError::TemplateLoad { .. })
    ));
}

#[test]
fn test_unrelated_overlay_files_are_ignored() {
    let (_dir, engine) = overlay_engine(&[
        ("README.md", "not a template"),
        ("unused.tera", "{{ nothing }}"),
    ]);
    let engine = engine.unwrap();
    let builtin = common::engine();
    for kind in ArtifactKind::ALL {
        assert_eq!(engine.store().get(kind).unwrap(), builtin.store().get(kind).unwrap());
    }
}

// ==========================================================================
// Sharing
// ==========================================================================

#[test]
fn test_concurrent_renders_share_one_engine() {
    let engine = engine();
    let expected_docker = engine.render_node(&minimal_docker()).unwrap();
    let expected_rkt = engine.render_node(&minimal_rkt()).unwrap();

    std::thread::scope(|s| {
        for i in 0..8 {
            let engine = &engine;
            let (expected_docker, expected_rkt) = (&expected_docker, &expected_rkt);
            s.spawn(move || {
                for _ in 0..10 {
                    if i % 2 == 0 {
                        assert_eq!(&engine.render_node(&minimal_docker()).unwrap(), expected_docker);
                    } else {
                        assert_eq!(&engine.render_node(&minimal_rkt()).unwrap(), expected_rkt);
                    }
                }
            });
        }
    });
}
