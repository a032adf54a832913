//! Transport trait and the cancellable invoker.
//!
//! The [`Transport`] trait abstracts over how the analysis request reaches
//! the server. [`invoke`] wraps any transport with the derived
//! [`CancelSignal`], so cancellation works the same for real and mock
//! transports.
//!
//! ```text
//! AnalyzeClient::fetch ──► invoke(signal) ──► Transport::post_json() ──► Value
//!                                                     │
//!                                        ┌────────────┴────────────┐
//!                                  HttpTransport              MockTransport
//!                                  (reqwest)                  (scripted replies)
//! ```

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};

use crate::cancel::CancelSignal;
use crate::error::{AnalyzeError, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Abstraction over the request channel to the analysis endpoint.
///
/// Implementors send `body` as a JSON `POST` to `url` and return the
/// response body as an untyped structural value. Status errors map to
/// [`AnalyzeError::HttpError`]. Implementors need not observe cancellation
/// themselves: [`invoke`] drops the future when the signal fires.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON and return the decoded response body.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Run one transport call bound to `signal`.
///
/// Returns [`AnalyzeError::Cancelled`] with the signal's reason if it has
/// already fired or fires before the transport finishes; the in-flight
/// request future is dropped in that case.
pub async fn invoke(
    transport: &dyn Transport,
    url: &str,
    body: &Value,
    signal: &CancelSignal,
) -> Result<Value> {
    if let Some(reason) = signal.reason() {
        return Err(AnalyzeError::Cancelled(reason));
    }

    tracing::debug!(transport = transport.name(), url, "sending analysis request");
    tokio::select! {
        biased;
        reason = signal.cancelled() => {
            tracing::debug!(url, %reason, "analysis request aborted");
            Err(AnalyzeError::Cancelled(reason))
        }
        result = transport.post_json(url, body) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelReason;
    use serde_json::json;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_invoke_passes_through_result() {
        let mock = MockTransport::fixed(json!({ "ok": true }));
        let value = assert_ok!(invoke(&mock, "http://unused/analyze", &json!({}), &CancelSignal::new()).await);
        assert_eq!(value, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_invoke_refuses_fired_signal() {
        let mock = MockTransport::fixed(json!({}));
        let signal = CancelSignal::new();
        signal.cancel(CancelReason::Canceled);

        let err = assert_err!(invoke(&mock, "http://unused", &json!({}), &signal).await);
        assert!(err.is_abort());
        // The transport was never reached.
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invoke_aborts_hanging_transport() {
        let mock = MockTransport::new(vec![MockReply::Hang]);
        let signal = CancelSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel(CancelReason::Custom("navigated away".into()));
        });

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            invoke(&mock, "http://unused", &json!({}), &signal),
        )
        .await
        .expect("invoke should return once the signal fires");

        match result {
            Err(AnalyzeError::Cancelled(reason)) => {
                assert_eq!(reason.to_string(), "navigated away");
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
    }
}
