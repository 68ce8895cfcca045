use thiserror::Error;

use crate::llm::LlmError;
use crate::pipeline::RunStatus;

/// Errors decoding observer messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("message is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unknown message type '{0}'")]
    UnknownType(String),
}

/// Errors from the page-scraping collaborator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("scraper connection failed: {0}")]
    Connection(String),

    #[error("navigation to '{url}' failed: {message}")]
    Navigation { url: String, message: String },

    #[error("scraper operation '{0}' is not supported")]
    Unsupported(&'static str),

    #[error("scraper error: {0}")]
    Other(String),
}

/// Transient errors fetching a single remote asset.
///
/// These never escape the asset resolver; they select the placeholder path.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out")]
    Timeout,
}

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid artifact path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that terminate a clone or modification run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("AI error: {0}")]
    Capability(#[from] LlmError),

    #[error("{0}")]
    Scrape(#[from] ScrapeError),

    #[error("{0}")]
    Artifact(#[from] ArtifactError),

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("section plan is not valid JSON: {0}")]
    InvalidSectionPlan(String),

    #[error("stage '{stage}' timed out after {secs}s")]
    StageTimeout { stage: String, secs: u64 },

    #[error("invalid run transition: {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    #[error("observer disconnected")]
    ObserverGone,

    #[error("run cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether the observer is no longer around to hear about this error.
    pub fn is_silent(&self) -> bool {
        matches!(self, PipelineError::ObserverGone | PipelineError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MissingField("url");
        assert_eq!(err.to_string(), "message is missing required field 'url'");
    }

    #[test]
    fn test_pipeline_error_from_llm() {
        let err: PipelineError = LlmError::AuthenticationFailed.into();
        assert_eq!(err.to_string(), "AI error: authentication failed");
        assert!(!err.is_silent());
    }

    #[test]
    fn test_transition_error_display() {
        let err = PipelineError::InvalidTransition {
            from: RunStatus::Ready,
            to: RunStatus::Generating,
        };
        assert_eq!(err.to_string(), "invalid run transition: ready -> generating");
    }

    #[test]
    fn test_silent_errors() {
        assert!(PipelineError::ObserverGone.is_silent());
        assert!(PipelineError::Cancelled.is_silent());
        assert!(!PipelineError::Internal("boom".to_string()).is_silent());
    }
}
