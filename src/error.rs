use crate::cancel::CancelReason;
use crate::schema::SchemaError;
use thiserror::Error;

/// Errors produced by the analysis client and its components.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// Low-level HTTP transport failure (connection refused, reset, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization or parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP status with a short prefix of the response body.
    #[error("HTTP {status} {status_text}{}", snippet_suffix(.snippet))]
    HttpError {
        /// HTTP status code (e.g. 404, 500).
        status: u16,
        /// Canonical reason phrase for the status, empty if unknown.
        status_text: String,
        /// At most 300 characters of the body, `…`-terminated when cut.
        snippet: String,
    },

    /// The request was aborted: explicit cancel, superseded call, external
    /// signal, or timeout.
    #[error("{0}")]
    Cancelled(CancelReason),

    /// The response body does not match the response contract.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Schema failure as reported by [`AnalyzeSession`](crate::AnalyzeSession).
    #[error("Schema validation failed: {0}")]
    SchemaValidation(SchemaError),

    /// Invalid per-call or default options.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

fn snippet_suffix(snippet: &str) -> String {
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

impl AnalyzeError {
    /// Whether this error came from the cancellation signal firing.
    pub fn is_abort(&self) -> bool {
        matches!(self, AnalyzeError::Cancelled(_))
    }

    /// Whether this error is an abort caused by the request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AnalyzeError::Cancelled(CancelReason::TimedOut(_)))
    }

    /// HTTP status code, if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            AnalyzeError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The underlying schema error, raw or rewrapped.
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            AnalyzeError::Schema(e) | AnalyzeError::SchemaValidation(e) => Some(e),
            _ => None,
        }
    }

    /// Promote a raw schema failure to the caller-facing
    /// [`SchemaValidation`](AnalyzeError::SchemaValidation) form.
    pub(crate) fn into_surfaced(self) -> Self {
        match self {
            AnalyzeError::Schema(e) => AnalyzeError::SchemaValidation(e),
            other => other,
        }
    }
}

impl From<anyhow::Error> for AnalyzeError {
    fn from(err: anyhow::Error) -> Self {
        AnalyzeError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;
