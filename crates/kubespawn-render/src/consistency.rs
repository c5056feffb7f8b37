//! Cross-artifact consistency checks.
//!
//! Several artifacts of one node encode the same decision independently: the
//! cgroup driver appears in the docker drop-in, the kubelet drop-in and the
//! kubelet config, and the runtime choice shapes the kubelet flags and the
//! bootstrap script. [`preflight`] validates a parameter set against the kinds
//! requested for a pass before anything is rendered; [`verify_rendered`]
//! re-reads the rendered text and confirms every artifact made the same
//! choice. Both collect every finding instead of stopping at the first.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::artifact::ArtifactKind;
use crate::error::{RenderError, Result};
use crate::params::{Field, ParameterSet};
use crate::template_engine::RenderedFile;

static CGROUP_DRIVER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:--cgroup-driver=|native\.cgroupdriver=|cgroupDriver:[ \t]*)([A-Za-z]+)")
        .expect("cgroup driver pattern is valid")
});

static REMOTE_RUNTIME_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--container-runtime=remote|--container-runtime-endpoint|CRISocket:")
        .expect("remote runtime pattern is valid")
});

static STARTED_RUNTIME_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"systemctl start --no-block (docker|rktlet)\.service")
        .expect("runtime unit pattern is valid")
});

/// One broken cross-artifact invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyFinding {
    /// Machine-readable code (e.g., `CGROUP_DRIVER_MISMATCH`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Parameter fields involved.
    pub fields: Vec<Field>,
    /// Artifact involved, if applicable.
    pub kind: Option<ArtifactKind>,
}

impl ConsistencyFinding {
    pub(crate) fn endpoint_without_remote_runtime(params: &ParameterSet) -> Self {
        Self {
            code: "ENDPOINT_WITHOUT_REMOTE_RUNTIME".into(),
            message: format!(
                "{} '{}' supplied but container runtime '{}' does not use one",
                Field::RuntimeEndpoint,
                params.runtime_endpoint().unwrap_or_default(),
                params.container_runtime
            ),
            fields: vec![Field::RuntimeEndpoint, Field::ContainerRuntime],
            kind: None,
        }
    }
}

impl fmt::Display for ConsistencyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// All findings of one check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub findings: Vec<ConsistencyFinding>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// Collapse the report into one aggregated error, or `Ok` when clean.
    pub fn into_result(self) -> Result<()> {
        if self.findings.is_empty() {
            Ok(())
        } else {
            Err(RenderError::ConsistencyViolation {
                findings: self.findings,
            })
        }
    }

    fn push(
        &mut self,
        code: &str,
        message: String,
        fields: Vec<Field>,
        kind: Option<ArtifactKind>,
    ) {
        self.findings.push(ConsistencyFinding {
            code: code.into(),
            message,
            fields,
            kind,
        });
    }
}

/// Validate `params` against every kind requested for one pass.
pub fn preflight(params: &ParameterSet, kinds: &[ArtifactKind]) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();

    check_duplicate_kinds(kinds, &mut report);
    check_endpoint_coupling(params, &mut report);
    check_runtime_affinity(params, kinds, &mut report);
    check_required_fields(params, kinds, &mut report);
    check_values(params, &mut report);

    report
}

fn check_duplicate_kinds(kinds: &[ArtifactKind], report: &mut ConsistencyReport) {
    let mut seen = HashSet::new();
    for &kind in kinds {
        if !seen.insert(kind) {
            report.push(
                "DUPLICATE_KIND",
                format!("artifact '{kind}' requested more than once"),
                Vec::new(),
                Some(kind),
            );
        }
    }
}

fn check_endpoint_coupling(params: &ParameterSet, report: &mut ConsistencyReport) {
    if params.has_contradictory_endpoint() {
        report
            .findings
            .push(ConsistencyFinding::endpoint_without_remote_runtime(params));
    }
}

fn check_runtime_affinity(
    params: &ParameterSet,
    kinds: &[ArtifactKind],
    report: &mut ConsistencyReport,
) {
    for &kind in kinds {
        if let Some(runtime) = kind.runtime_affinity() {
            if runtime != params.container_runtime {
                report.push(
                    "RUNTIME_MISMATCH",
                    format!(
                        "artifact '{kind}' belongs to runtime '{runtime}' but the node runs '{}'",
                        params.container_runtime
                    ),
                    vec![Field::ContainerRuntime],
                    Some(kind),
                );
            }
        }
    }
}

fn check_required_fields(
    params: &ParameterSet,
    kinds: &[ArtifactKind],
    report: &mut ConsistencyReport,
) {
    for &kind in kinds {
        for field in params.missing_fields(kind) {
            report.push(
                "MISSING_PARAMETER",
                format!("artifact '{kind}' requires parameter '{field}'"),
                vec![field],
                Some(kind),
            );
        }
    }
}

fn check_values(params: &ParameterSet, report: &mut ConsistencyReport) {
    for invalid in params.invalid_values() {
        report.push(
            "INVALID_PARAMETER",
            format!(
                "invalid value {:?} for parameter '{}': {}",
                invalid.value, invalid.field, invalid.reason
            ),
            vec![invalid.field],
            None,
        );
    }
}

/// Confirm the rendered artifacts of one pass agree with `params` and with
/// each other.
pub fn verify_rendered(params: &ParameterSet, files: &[RenderedFile]) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();

    for file in files {
        if file.kind.mentions_cgroup_driver() {
            check_cgroup_driver(params, file, &mut report);
        }
        if file.kind.carries_remote_runtime() {
            check_remote_runtime(params, file, &mut report);
        }
        if file.kind == ArtifactKind::BootstrapScript {
            check_started_runtime(params, file, &mut report);
        }
    }

    report
}

/// cgroup driver tokens named in a rendered artifact, in order of appearance.
pub fn cgroup_driver_tokens(content: &str) -> Vec<&str> {
    CGROUP_DRIVER_TOKEN
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

fn check_cgroup_driver(params: &ParameterSet, file: &RenderedFile, report: &mut ConsistencyReport) {
    let expected = params.cgroup_driver().as_str();
    let tokens = cgroup_driver_tokens(&file.content);

    if tokens.is_empty() {
        report.push(
            "CGROUP_DRIVER_ABSENT",
            format!("artifact '{}' does not name a cgroup driver", file.kind),
            vec![Field::UseLegacyCgroupDriver],
            Some(file.kind),
        );
    }
    for token in tokens.into_iter().filter(|&t| t != expected) {
        report.push(
            "CGROUP_DRIVER_MISMATCH",
            format!(
                "artifact '{}' uses cgroup driver '{token}' but the node uses '{expected}'",
                file.kind
            ),
            vec![Field::UseLegacyCgroupDriver],
            Some(file.kind),
        );
    }
}

fn check_remote_runtime(params: &ParameterSet, file: &RenderedFile, report: &mut ConsistencyReport) {
    if params.is_remote_runtime() {
        // a missing endpoint is preflight's finding, not this one
        let Some(endpoint) = params.runtime_endpoint() else {
            return;
        };
        let switch = remote_runtime_switch(file.kind);
        if !file.content.contains(endpoint) || !file.content.contains(switch) {
            report.push(
                "REMOTE_RUNTIME_MISSING",
                format!(
                    "artifact '{}' does not point kubelet at runtime endpoint '{endpoint}' via '{switch}'",
                    file.kind
                ),
                vec![Field::ContainerRuntime, Field::RuntimeEndpoint],
                Some(file.kind),
            );
        }
    } else if REMOTE_RUNTIME_FLAG.is_match(&file.content) {
        report.push(
            "REMOTE_RUNTIME_UNEXPECTED",
            format!(
                "artifact '{}' configures a remote runtime for a '{}' node",
                file.kind, params.container_runtime
            ),
            vec![Field::ContainerRuntime],
            Some(file.kind),
        );
    }
}

/// The setting that puts kubelet on a remote runtime in each artifact that
/// carries one.
fn remote_runtime_switch(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::KubeletConfig => "CRISocket:",
        _ => "--container-runtime=remote",
    }
}

fn check_started_runtime(params: &ParameterSet, file: &RenderedFile, report: &mut ConsistencyReport) {
    let expected = params.container_runtime.service_unit();
    let started: Vec<&str> = STARTED_RUNTIME_UNIT
        .find_iter(&file.content)
        .filter_map(|m| m.as_str().rsplit(' ').next())
        .collect();

    if !started.contains(&expected) {
        report.push(
            "RUNTIME_SERVICE_MISMATCH",
            format!("bootstrap script never starts '{expected}'"),
            vec![Field::ContainerRuntime],
            Some(file.kind),
        );
    }
    for unit in started.into_iter().filter(|&u| u != expected) {
        report.push(
            "RUNTIME_SERVICE_MISMATCH",
            format!(
                "bootstrap script starts '{unit}' on a '{}' node",
                params.container_runtime
            ),
            vec![Field::ContainerRuntime],
            Some(file.kind),
        );
    }
}
