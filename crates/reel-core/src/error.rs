//! Error types for Reel Core
//!
//! Three tiers, kept distinct so callers can tell them apart:
//! - Fatal-to-run errors abort a run and surface to the caller
//! - Frame-local render errors are converted into frame state
//! - Configuration errors are blocking preconditions checked before a run

use crate::types::{FrameState, Phase};
use std::path::PathBuf;
use std::time::Duration;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Idea generator failed or returned a malformed batch
    #[error("idea generation failed: {0}")]
    IdeaGenerationFailed(#[source] GenerationError),

    /// Idea generator returned no ideas
    #[error("idea generation returned no ideas")]
    EmptyIdeaBatch,

    /// Storyboard generator failed or returned a malformed storyboard
    #[error("storyboard generation failed: {0}")]
    StoryboardFailed(#[source] GenerationError),

    /// Generation requested before an idea was selected
    #[error("no idea selected")]
    NoIdeaSelected,

    /// Selected idea is not part of the current batch
    #[error("unknown idea: {0}")]
    UnknownIdea(String),

    /// Operation not valid in the current phase
    #[error("operation requires phase {expected}, run is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// Run cancelled before all frames were attempted
    #[error("run cancelled after {attempted} of {total} frames")]
    Cancelled { attempted: usize, total: usize },

    /// Illegal state transition
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Configuration precondition failed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export hand-off failed
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

impl PipelineError {
    /// Whether this error aborted a run because a collaborator failed
    #[inline]
    #[must_use]
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Self::IdeaGenerationFailed(_) | Self::EmptyIdeaBatch | Self::StoryboardFailed(_)
        )
    }

    /// Whether this is a blocking configuration precondition
    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether re-invoking the same operation may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::IdeaGenerationFailed(e) | Self::StoryboardFailed(e) => e.is_retryable(),
            Self::EmptyIdeaBatch => true,
            _ => false,
        }
    }
}

/// Errors returned by the idea and storyboard generators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Service could not be reached or refused the request
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Response missing, unparsable or incomplete
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No credentials configured for the service
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Non-success HTTP status
    #[error("http status {status}: {body}")]
    Http { status: u16, body: String },

    /// Request exceeded its deadline
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl GenerationError {
    /// Create malformed-response error
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Check if error is transient
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::MissingCredentials(_) => false,
        }
    }
}

/// Frame-local render failure
///
/// Never propagated past the render loop; recorded on the frame instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Renderer reported a failure
    #[error("render failed: {0}")]
    Failed(String),

    /// Renderer exceeded the per-frame deadline
    #[error("render timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Response carried no image
    #[error("no image data returned")]
    NoImageData,

    /// Run was cancelled while the frame was rendering
    #[error("render cancelled")]
    Cancelled,

    /// Underlying service call failed
    #[error(transparent)]
    Service(#[from] GenerationError),
}

impl RenderError {
    /// Check if the render ran out of time or was cancelled
    ///
    /// These always leave the frame FAILED, whatever the failure policy.
    #[inline]
    #[must_use]
    pub fn is_deadline(&self) -> bool {
        matches!(
            self,
            Self::TimedOut(_) | Self::Cancelled | Self::Service(GenerationError::Timeout { .. })
        )
    }
}

/// Configuration errors, detected before a run starts
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No API key available
    #[error("missing API key (set GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,

    /// Field has an unusable value
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Config file could not be read or written
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Config could not be serialized
    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

impl ConfigError {
    /// Create invalid-value error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Illegal state machine transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Frame transition not in the state machine
    #[error("illegal frame transition {from} -> {to}")]
    IllegalFrameTransition { from: FrameState, to: FrameState },

    /// Phase would regress or skip
    #[error("illegal phase transition {from} -> {to}")]
    IllegalPhaseTransition { from: Phase, to: Phase },

    /// Run already has a selected idea
    #[error("an idea is already selected for this run")]
    IdeaAlreadySelected,
}

/// Export hand-off errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// Run has not reached review
    #[error("run is in {0}, export requires REVIEW")]
    NotReviewed(Phase),

    /// Collaborator refused the payload
    #[error("export rejected: {0}")]
    Rejected(String),

    /// Payload could not be delivered
    #[error("export transport failed: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::StoryboardFailed(GenerationError::malformed("missing steps"));
        assert!(err.to_string().contains("storyboard generation failed"));
        assert!(err.to_string().contains("missing steps"));
    }

    #[test]
    fn fatal_and_config_are_distinct() {
        let fatal = PipelineError::StoryboardFailed(GenerationError::Unavailable("down".into()));
        let config = PipelineError::Config(ConfigError::MissingApiKey);

        assert!(fatal.is_fatal_to_run());
        assert!(!fatal.is_config());
        assert!(config.is_config());
        assert!(!config.is_fatal_to_run());
        assert!(!PipelineError::NoIdeaSelected.is_fatal_to_run());
    }

    #[test]
    fn generation_error_is_retryable() {
        assert!(GenerationError::Unavailable("x".into()).is_retryable());
        assert!(GenerationError::Timeout { secs: 30 }.is_retryable());
        assert!(GenerationError::Http { status: 503, body: String::new() }.is_retryable());
        assert!(GenerationError::Http { status: 429, body: String::new() }.is_retryable());
        assert!(!GenerationError::Http { status: 400, body: String::new() }.is_retryable());
        assert!(!GenerationError::malformed("x").is_retryable());
    }

    #[test]
    fn render_timeout_display() {
        let err = RenderError::TimedOut(Duration::from_secs(90));
        assert_eq!(err.to_string(), "render timed out after 90s");
    }

    #[test]
    fn deadline_errors() {
        assert!(RenderError::TimedOut(Duration::from_secs(1)).is_deadline());
        assert!(RenderError::Cancelled.is_deadline());
        assert!(RenderError::Service(GenerationError::Timeout { secs: 5 }).is_deadline());
        assert!(!RenderError::NoImageData.is_deadline());
        assert!(!RenderError::Service(GenerationError::Unavailable("down".into())).is_deadline());
    }
}
