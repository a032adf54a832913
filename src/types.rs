use crate::cancel::CancelSignal;
use crate::endpoint::DEFAULT_PATH;
use crate::error::{AnalyzeError, Result};
use crate::schema::AnalyzeResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default request timeout: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Payload sent to the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Reference to the uploaded transcript or recording.
    pub transcript_key: String,

    /// Optional BCP-47 language hint (e.g. `"en"`, `"en-US"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(transcript_key: impl Into<String>) -> Self {
        Self {
            transcript_key: transcript_key.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Per-call options. Every field is optional; unset fields fall back to
/// the session defaults and then to the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// API base URL override (e.g. `https://api.example.com`).
    pub base_url: Option<String>,

    /// Endpoint path. Default: `/analyze`.
    pub path: Option<String>,

    /// Request timeout. Default: 30 seconds. Must be non-zero.
    pub timeout: Option<Duration>,

    /// External cancellation signal, merged with the timeout.
    pub signal: Option<CancelSignal>,

    /// Return the stub without any network I/O or base URL resolution.
    pub dry_run: Option<bool>,
}

impl AnalyzeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_timeout_ms(self, ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(ms))
    }

    pub fn with_signal(mut self, signal: CancelSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = Some(enabled);
        self
    }

    /// Field-by-field merge: values set on `self` win over `defaults`.
    pub fn merged_over(self, defaults: &AnalyzeOptions) -> AnalyzeOptions {
        AnalyzeOptions {
            base_url: self.base_url.or_else(|| defaults.base_url.clone()),
            path: self.path.or_else(|| defaults.path.clone()),
            timeout: self.timeout.or(defaults.timeout),
            signal: self.signal.or_else(|| defaults.signal.clone()),
            dry_run: self.dry_run.or(defaults.dry_run),
        }
    }

    pub fn timeout_or_default(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn path_or_default(&self) -> &str {
        self.path.as_deref().unwrap_or(DEFAULT_PATH)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run.unwrap_or(false)
    }

    /// Reject option values the client cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_or_default().is_zero() {
            return Err(AnalyzeError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Observable state of an [`AnalyzeSession`](crate::AnalyzeSession).
#[derive(Debug, Clone, Default)]
pub struct AnalyzeState {
    /// A call is in flight and still owns the session.
    pub loading: bool,

    /// Error from the most recent call, if it failed.
    pub error: Option<Arc<AnalyzeError>>,

    /// Result of the most recent successful call.
    pub data: Option<AnalyzeResponse>,
}

impl AnalyzeState {
    /// Not loading, no error, no data.
    pub fn is_pristine(&self) -> bool {
        !self.loading && self.error.is_none() && self.data.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let req = AnalyzeRequest::new("uploads/42.m4a");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "transcript_key": "uploads/42.m4a" })
        );

        let req = req.with_language("en-US");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "transcript_key": "uploads/42.m4a", "language": "en-US" })
        );
    }

    #[test]
    fn test_options_defaults() {
        let opts = AnalyzeOptions::default();
        assert_eq!(opts.timeout_or_default(), Duration::from_secs(30));
        assert_eq!(opts.path_or_default(), "/analyze");
        assert!(!opts.is_dry_run());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_merge_prefers_call_values() {
        let defaults = AnalyzeOptions::new()
            .with_base_url("https://default.example.com")
            .with_path("/v1/analyze")
            .with_timeout_ms(5_000)
            .with_dry_run(true);

        let merged = AnalyzeOptions::new()
            .with_timeout_ms(100)
            .with_dry_run(false)
            .merged_over(&defaults);

        assert_eq!(merged.base_url.as_deref(), Some("https://default.example.com"));
        assert_eq!(merged.path_or_default(), "/v1/analyze");
        assert_eq!(merged.timeout_or_default(), Duration::from_millis(100));
        assert!(!merged.is_dry_run());
    }

    #[test]
    fn test_merge_keeps_call_signal() {
        let default_signal = CancelSignal::new();
        let call_signal = CancelSignal::new();
        let defaults = AnalyzeOptions::new().with_signal(default_signal.clone());

        let merged = AnalyzeOptions::new().merged_over(&defaults);
        assert!(merged.signal.unwrap().same_as(&default_signal));

        let merged = AnalyzeOptions::new()
            .with_signal(call_signal.clone())
            .merged_over(&defaults);
        assert!(merged.signal.unwrap().same_as(&call_signal));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = AnalyzeOptions::new().with_timeout_ms(0).validate().unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidConfig(_)));
    }

    #[test]
    fn test_default_state_is_pristine() {
        assert!(AnalyzeState::default().is_pristine());
    }
}
