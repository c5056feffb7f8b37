//! Error types for artifact rendering

use std::error::Error as _;
use std::path::PathBuf;

use crate::artifact::ArtifactKind;
use crate::consistency::ConsistencyFinding;
use crate::params::{Field, InvalidValue};

/// Result type alias for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Everything that can go wrong between loading templates and handing back
/// rendered text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// No template is registered for the artifact kind
    #[error("no template registered for artifact '{kind}'")]
    TemplateNotFound { kind: ArtifactKind },

    /// A template failed to compile; the store is unusable
    #[error("template '{template}' failed to parse: {}", describe(.source))]
    TemplateSyntaxError {
        template: String,
        source: tera::Error,
    },

    /// A field the artifact needs was absent or empty
    #[error("artifact '{kind}' requires parameter '{field}'")]
    MissingParameter { kind: ArtifactKind, field: Field },

    /// A field was supplied with a value that cannot be used
    #[error("invalid value {value:?} for parameter '{field}': {reason}")]
    InvalidParameter {
        field: Field,
        value: String,
        reason: String,
    },

    /// Template evaluation failed for a reason other than the above
    #[error("rendering '{kind}' failed: {}", describe(.source))]
    ExecutionError {
        kind: ArtifactKind,
        source: tera::Error,
    },

    /// Parameters or rendered artifacts disagree with each other
    #[error("inconsistent node artifacts: {}", summarize(.findings))]
    ConsistencyViolation { findings: Vec<ConsistencyFinding> },

    /// A template overlay directory could not be read
    #[error("failed to load templates from {dir}: {source}")]
    TemplateLoad {
        dir: PathBuf,
        source: std::io::Error,
    },

    /// A config or node file could not be read or parsed
    #[error("failed to load {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl RenderError {
    /// Errors the caller fixes by supplying different parameters.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter { .. }
                | Self::InvalidParameter { .. }
                | Self::ConsistencyViolation { .. }
        )
    }

    /// Names of the parameter fields this error is about, for reporting.
    pub fn offending_fields(&self) -> Vec<Field> {
        match self {
            Self::MissingParameter { field, .. } | Self::InvalidParameter { field, .. } => {
                vec![*field]
            }
            Self::ConsistencyViolation { findings } => {
                let mut fields: Vec<Field> =
                    findings.iter().flat_map(|f| f.fields.iter().copied()).collect();
                fields.sort();
                fields.dedup();
                fields
            }
            _ => Vec::new(),
        }
    }
}

impl From<InvalidValue> for RenderError {
    fn from(invalid: InvalidValue) -> Self {
        Self::InvalidParameter {
            field: invalid.field,
            value: invalid.value,
            reason: invalid.reason,
        }
    }
}

// Tera keeps the useful detail (line, undefined variable) in the source chain.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn summarize(findings: &[ConsistencyFinding]) -> String {
    findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
