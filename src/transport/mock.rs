//! Mock transport for testing without a live analysis server.
//!
//! [`MockTransport`] plays back scripted [`MockReply`]s in order, allowing
//! downstream consumers to write deterministic tests against this crate.
//!
//! # Example
//!
//! ```
//! use speakmate_client::transport::{MockReply, MockTransport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new(vec![
//!     MockReply::Json(json!({ "scores": {} })),
//!     MockReply::Status { status: 503, body: "try later".into() },
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::http::{parse_lenient, truncate_snippet};
use super::Transport;
use crate::error::{AnalyzeError, Result};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 2xx with a JSON body.
    Json(Value),
    /// 2xx with a non-JSON content type; decoded best-effort like the HTTP
    /// transport does.
    Text(String),
    /// Non-success status with a body.
    Status { status: u16, body: String },
    /// Never completes. Only cancellation ends the call.
    Hang,
    /// Wait, then play the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// Wrap this reply so it completes after `delay`.
    pub fn after(self, delay: Duration) -> Self {
        MockReply::Delayed(delay, Box::new(self))
    }
}

/// A test transport that returns scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
/// Every call is recorded and can be inspected with [`calls`](Self::calls).
#[derive(Debug)]
pub struct MockTransport {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    /// Create a mock transport with the given scripted replies.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockTransport requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same JSON body.
    pub fn fixed(body: Value) -> Self {
        Self::new(vec![MockReply::Json(body)])
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `(url, body)` for every call made so far, oldest first.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }

    async fn play(reply: MockReply) -> Result<Value> {
        let mut reply = reply;
        loop {
            match reply {
                MockReply::Json(value) => return Ok(value),
                MockReply::Text(text) => return Ok(parse_lenient(&text)),
                MockReply::Status { status, body } => {
                    let status_text = reqwest::StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or_default()
                        .to_string();
                    return Err(AnalyzeError::HttpError {
                        status,
                        status_text,
                        snippet: truncate_snippet(&body),
                    });
                }
                MockReply::Hang => std::future::pending::<()>().await,
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), body.clone()));
        let reply = self.next_reply();
        Self::play(reply).await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
