//! Error types for the zmarkdown library.
//!
//! Setup and conversion fail in different ways, and the variants of
//! [`MarkupError`] say which one happened:
//!
//! * **Setup** ([`MarkupError::Config`], [`MarkupError::InvalidConfig`]):
//!   a stage registration directive could not be applied, or a builder
//!   rejected its settings. Nothing has been converted yet.
//!
//! * **Lookup** ([`MarkupError::NotFound`]): a registry was asked for a
//!   stage name it does not hold. The caller may register it and retry.
//!
//! * **Conversion** ([`MarkupError::Stage`]): a stage failed while running.
//!   The whole conversion is aborted and no partial output is returned.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by stage run functions.
///
/// Stages are free to fail with anything; the runner wraps the failure in
/// [`MarkupError::Stage`] together with the stage name.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The four pipeline kinds, in the order they run during a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Preprocess,
    Block,
    Inline,
    Tree,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 4] = [
        PipelineKind::Preprocess,
        PipelineKind::Block,
        PipelineKind::Inline,
        PipelineKind::Tree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Preprocess => "preprocess",
            PipelineKind::Block => "block",
            PipelineKind::Inline => "inline",
            PipelineKind::Tree => "tree",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors returned by the zmarkdown library.
#[derive(Debug, Error)]
pub enum MarkupError {
    // ── Setup errors ──────────────────────────────────────────────────────
    /// A registration directive was malformed, referenced an unknown stage,
    /// or tried to reuse a name.
    #[error("Stage configuration error: {message}")]
    Config { message: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Lookup errors ─────────────────────────────────────────────────────
    /// No stage is registered under this name.
    #[error("No stage named '{name}' is registered")]
    NotFound { name: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// A stage failed during conversion.
    #[error("{kind} stage '{stage}' failed: {source}")]
    Stage {
        kind: PipelineKind,
        stage: String,
        #[source]
        source: BoxError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MarkupError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        MarkupError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        MarkupError::NotFound { name: name.into() }
    }

    /// Wrap a stage failure, keeping an inner stage error as-is.
    ///
    /// Block stages re-enter the block parser, so a failure deep inside a
    /// nested parse reaches the outer stage already wrapped. Reporting the
    /// innermost stage is what points at the actual culprit.
    pub(crate) fn stage(kind: PipelineKind, stage: &str, err: BoxError) -> Self {
        match err.downcast::<MarkupError>() {
            Ok(inner) => match *inner {
                stage_err @ MarkupError::Stage { .. } => stage_err,
                other => MarkupError::Stage {
                    kind,
                    stage: stage.to_string(),
                    source: Box::new(other),
                },
            },
            Err(source) => MarkupError::Stage {
                kind,
                stage: stage.to_string(),
                source,
            },
        }
    }

    /// `true` for errors raised while configuring an engine.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            MarkupError::Config { .. } | MarkupError::InvalidConfig(_)
        )
    }
}
