//! HTTP transport backed by `reqwest`.
//!
//! Sends `POST {url}` with JSON `content-type` and `accept` headers.
//! Non-2xx responses become [`AnalyzeError::HttpError`] carrying a short
//! body snippet. Successful bodies are decoded as JSON when the server says
//! they are JSON, and best-effort otherwise.

use super::Transport;
use crate::error::{AnalyzeError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::{json, Value};

/// Maximum number of body characters kept in an HTTP error snippet.
pub const SNIPPET_MAX_CHARS: usize = 300;

/// Transport that talks to the analysis endpoint over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Use an existing client (cheap to clone -- uses `Arc` internally).
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Turn a non-success response into an [`AnalyzeError::HttpError`].
    async fn status_error(resp: Response) -> AnalyzeError {
        let status = resp.status();
        let snippet = resp
            .text()
            .await
            .map(|text| truncate_snippet(&text))
            .unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %snippet, "analysis endpoint returned an error status");
        AnalyzeError::HttpError {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            snippet,
        }
    }

    fn is_json(resp: &Response) -> bool {
        resp.headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }

        let declared_json = Self::is_json(&resp);
        let text = resp.text().await?;
        if declared_json {
            Ok(serde_json::from_str(&text)?)
        } else {
            // Some proxies rewrite content-type; try JSON anyway.
            Ok(parse_lenient(&text))
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Keep the first [`SNIPPET_MAX_CHARS`] characters, appending `…` when cut.
pub fn truncate_snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Parse JSON text, or wrap it as `{"_raw": text}` so schema validation
/// reports a readable error instead of a parse failure.
pub fn parse_lenient(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "_raw": text }))
}
