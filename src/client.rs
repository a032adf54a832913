//! Stateless analysis client.
//!
//! [`AnalyzeClient`] carries the transport and endpoint configuration. It
//! decides between the stub and the live endpoint, performs one call, and
//! validates the result. It keeps no state between calls; the
//! single-in-flight bookkeeping lives in [`AnalyzeSession`](crate::AnalyzeSession).

use crate::cancel::{compose_cancellation, CancelSignal};
use crate::endpoint::{join_url, EndpointConfig};
use crate::error::Result;
use crate::schema::{validate_response, AnalyzeResponse};
use crate::stub::make_stub;
use crate::transport::{self, HttpTransport, Transport};
use crate::types::{AnalyzeOptions, AnalyzeRequest};
use reqwest::Client;
use std::sync::Arc;

/// Where a call will be served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Dry run, or no base URL configured.
    Stub,
    /// Live endpoint at `url`.
    Live { url: String },
}

/// Analysis client: transport plus endpoint configuration.
///
/// # Example
///
/// ```
/// use speakmate_client::{AnalyzeClient, EndpointConfig};
/// use std::sync::Arc;
///
/// let client = AnalyzeClient::builder()
///     .endpoints(Arc::new(EndpointConfig::new(Some("https://api.example.com".into()))))
///     .build();
/// ```
#[derive(Clone)]
pub struct AnalyzeClient {
    transport: Arc<dyn Transport>,
    endpoints: Arc<EndpointConfig>,
}

impl AnalyzeClient {
    /// Create a new builder.
    pub fn builder() -> AnalyzeClientBuilder {
        AnalyzeClientBuilder {
            transport: None,
            http_client: None,
            endpoints: None,
        }
    }

    pub fn endpoints(&self) -> &EndpointConfig {
        &self.endpoints
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Pick the target for a call. Dry run wins without resolving anything.
    pub fn target(&self, options: &AnalyzeOptions) -> Target {
        if options.is_dry_run() {
            return Target::Stub;
        }
        match self.endpoints.resolve_base_url(options.base_url.as_deref()) {
            Some(base) => Target::Live {
                url: join_url(&base, options.path_or_default()),
            },
            None => Target::Stub,
        }
    }

    /// Send `request` to `url` bound to `signal` and validate the response.
    ///
    /// Schema failures are returned as [`AnalyzeError::Schema`](crate::AnalyzeError::Schema).
    pub async fn fetch(
        &self,
        url: &str,
        request: &AnalyzeRequest,
        signal: &CancelSignal,
    ) -> Result<AnalyzeResponse> {
        let body = serde_json::to_value(request)?;
        let value = transport::invoke(self.transport.as_ref(), url, &body, signal).await?;
        Ok(validate_response(&value)?)
    }

    /// One-shot call: stub or live, with the options' timeout and signal.
    ///
    /// Errors, aborts included, are returned as-is. Use
    /// [`AnalyzeSession`](crate::AnalyzeSession) for managed state.
    pub async fn analyze(
        &self,
        request: &AnalyzeRequest,
        options: &AnalyzeOptions,
    ) -> Result<AnalyzeResponse> {
        let url = match self.target(options) {
            Target::Stub => return Ok(make_stub(request)),
            Target::Live { url } => url,
        };
        options.validate()?;

        let (signal, guard) =
            compose_cancellation(options.signal.as_ref(), options.timeout_or_default());
        let result = self.fetch(&url, request, &signal).await;
        guard.release();
        result
    }
}

impl Default for AnalyzeClient {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for AnalyzeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzeClient")
            .field("transport", &self.transport.name())
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Builder for [`AnalyzeClient`].
pub struct AnalyzeClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    http_client: Option<Client>,
    endpoints: Option<Arc<EndpointConfig>>,
}

impl AnalyzeClientBuilder {
    /// Set the transport. Default: [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the HTTP client used by the default [`HttpTransport`].
    ///
    /// Ignored if a custom transport is set via [`transport`](Self::transport).
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the endpoint configuration. Default: [`EndpointConfig::global`].
    pub fn endpoints(mut self, endpoints: Arc<EndpointConfig>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Build the client.
    pub fn build(self) -> AnalyzeClient {
        let http_client = self.http_client;
        AnalyzeClient {
            transport: self.transport.unwrap_or_else(|| {
                Arc::new(HttpTransport::new(http_client.unwrap_or_default()))
            }),
            endpoints: self.endpoints.unwrap_or_else(EndpointConfig::global),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelReason;
    use crate::transport::{MockReply, MockTransport};
    use crate::AnalyzeError;
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn valid_body(key: &str) -> Value {
        json!({
            "scores": {
                "vocabulary": 70, "filler_control": 60, "clarity_structure": 50,
                "idea_quality": 40, "pacing": 30, "overall": 55
            },
            "feedback": {
                "vocabulary": "v", "filler": "f", "clarity": "c", "idea": "i",
                "actions": ["slow down"]
            },
            "assets": { "transcript_key": key }
        })
    }

    fn client_with(mock: Arc<MockTransport>, base: Option<&str>) -> AnalyzeClient {
        AnalyzeClient::builder()
            .transport(mock)
            .endpoints(Arc::new(EndpointConfig::new(base.map(str::to_owned))))
            .build()
    }

    #[test]
    fn test_target_selection() {
        let client = client_with(Arc::new(MockTransport::fixed(json!({}))), None);
        assert_eq!(client.target(&AnalyzeOptions::new()), Target::Stub);
        assert_eq!(
            client.target(&AnalyzeOptions::new().with_base_url("http://api.local/")),
            Target::Live { url: "http://api.local/analyze".into() }
        );
        assert_eq!(
            client.target(
                &AnalyzeOptions::new()
                    .with_base_url("http://api.local")
                    .with_path("v2/score")
            ),
            Target::Live { url: "http://api.local/v2/score".into() }
        );
        assert_eq!(
            client.target(
                &AnalyzeOptions::new()
                    .with_base_url("http://api.local")
                    .with_dry_run(true)
            ),
            Target::Stub
        );
    }

    #[tokio::test]
    async fn test_unconfigured_returns_stub_without_io() {
        let mock = Arc::new(MockTransport::fixed(json!({})));
        let client = client_with(mock.clone(), None);
        let resp = client
            .analyze(&AnalyzeRequest::new("k"), &AnalyzeOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.assets.transcript_key, "k");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_live_call_validates_response() {
        let mock = Arc::new(MockTransport::fixed(valid_body("t/1")));
        let client = client_with(mock.clone(), Some("http://api.local"));
        let resp = client
            .analyze(&AnalyzeRequest::new("t/1").with_language("en"), &AnalyzeOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.scores.overall(), 55.0);

        let calls = mock.calls();
        assert_eq!(calls[0].0, "http://api.local/analyze");
        assert_eq!(calls[0].1, json!({ "transcript_key": "t/1", "language": "en" }));
    }

    #[tokio::test]
    async fn test_schema_failure_is_raw_schema_error() {
        let mut body = valid_body("x");
        body["assets"]["transcript_key"] = json!(123);
        let client = client_with(Arc::new(MockTransport::fixed(body)), Some("http://api.local"));

        let err = client
            .analyze(&AnalyzeRequest::new("x"), &AnalyzeOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::Schema(_)));
        assert_eq!(
            err.schema_error().map(|e| e.dotted_path()).as_deref(),
            Some("assets.transcript_key")
        );
    }

    #[tokio::test]
    async fn test_timeout_aborts_with_reason() {
        let client = client_with(
            Arc::new(MockTransport::new(vec![MockReply::Hang])),
            Some("http://api.local"),
        );
        let err = client
            .analyze(&AnalyzeRequest::new("x"), &AnalyzeOptions::new().with_timeout_ms(5))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Request timed out after 5 ms");
    }

    #[tokio::test]
    async fn test_external_signal_reason_wins() {
        let client = client_with(
            Arc::new(MockTransport::new(vec![MockReply::Hang])),
            Some("http://api.local"),
        );
        let signal = CancelSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel(CancelReason::Custom("screen closed".into()));
        });

        let err = client
            .analyze(
                &AnalyzeRequest::new("x"),
                &AnalyzeOptions::new().with_signal(signal).with_timeout_ms(30_000),
            )
            .await
            .unwrap_err();
        assert!(err.is_abort());
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "screen closed");
    }

    #[tokio::test]
    async fn test_zero_timeout_rejected() {
        let client = client_with(Arc::new(MockTransport::fixed(json!({}))), Some("http://api.local"));
        let err = client
            .analyze(&AnalyzeRequest::new("x"), &AnalyzeOptions::new().with_timeout(Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_dry_run_skips_option_validation() {
        let mock = Arc::new(MockTransport::fixed(json!({})));
        let client = client_with(mock.clone(), Some("http://api.local"));
        let resp = client
            .analyze(
                &AnalyzeRequest::new("k"),
                &AnalyzeOptions::new().with_dry_run(true).with_timeout(Duration::ZERO),
            )
            .await
            .unwrap();
        assert_eq!(resp.assets.transcript_key, "k");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_body("remote")))
            .mount(&server)
            .await;

        let client = AnalyzeClient::builder()
            .endpoints(Arc::new(EndpointConfig::new(None)))
            .build();
        let resp = client
            .analyze(
                &AnalyzeRequest::new("remote"),
                &AnalyzeOptions::new().with_base_url(format!("{}/", server.uri())),
            )
            .await
            .unwrap();
        assert_eq!(resp.assets.transcript_key, "remote");
        assert_eq!(resp.feedback.actions, vec!["slow down".to_string()]);
    }
}
