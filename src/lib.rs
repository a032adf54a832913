//! # SpeakMate Client
//!
//! Client for a speech-analysis backend. Given a storage key pointing at an
//! uploaded transcript, it calls the analysis endpoint, validates the
//! returned report against a strict schema, and exposes the outcome as an
//! observable `(loading, data, error)` triple.
//!
//! ## Core Concepts
//!
//! - **[`AnalyzeSession`]**: single-in-flight lifecycle manager. A new call
//!   cancels the previous one, and results of superseded calls never reach
//!   the observable state.
//! - **[`AnalyzeClient`]**: stateless one-shot client (transport plus
//!   endpoint configuration).
//! - **[`EndpointConfig`]**: base URL resolution. An explicit option wins,
//!   then the runtime override, then the build-time `SPEAKMATE_API_BASE_URL`.
//!   With nothing configured, calls return a stub report without any I/O.
//! - **[`schema`]**: fail-fast validation of untrusted JSON into
//!   [`AnalyzeResponse`], reporting the path of the first bad field.
//! - **[`cancel`]**: composable cancellation signals with per-call timeout.
//!
//! ## Quick Start
//!
//! ```no_run
//! use speakmate_client::{set_runtime_base_url, AnalyzeOptions, AnalyzeRequest, AnalyzeSession};
//!
//! #[tokio::main]
//! async fn main() {
//!     set_runtime_base_url("https://api.example.com/");
//!
//!     let session = AnalyzeSession::new();
//!     let request = AnalyzeRequest::new("uploads/2024/talk.json").with_language("en");
//!     let options = AnalyzeOptions::new().with_timeout_ms(10_000);
//!
//!     match session.analyze(&request, Some(options)).await {
//!         Some(report) => println!("overall score: {}", report.scores.overall()),
//!         None => match session.error() {
//!             Some(err) => eprintln!("analysis failed: {err}"),
//!             None => eprintln!("analysis was cancelled"),
//!         },
//!     }
//! }
//! ```
//!
//! ## One-shot calls
//!
//! ```no_run
//! use speakmate_client::{AnalyzeClient, AnalyzeOptions, AnalyzeRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), speakmate_client::AnalyzeError> {
//!     let client = AnalyzeClient::default();
//!     let report = client
//!         .analyze(
//!             &AnalyzeRequest::new("uploads/42"),
//!             &AnalyzeOptions::new().with_base_url("http://localhost:8080"),
//!         )
//!         .await?;
//!     for action in &report.feedback.actions {
//!         println!("- {action}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod schema;
pub mod session;
pub mod stub;
pub mod transport;
pub mod types;

pub use cancel::{compose_cancellation, CancelGuard, CancelReason, CancelSignal};
pub use client::{AnalyzeClient, AnalyzeClientBuilder, Target};
pub use endpoint::{clear_runtime_base_url, set_runtime_base_url, EndpointConfig};
pub use error::{AnalyzeError, Result};
pub use events::{Event, EventHandler, FnEventHandler, Outcome};
pub use schema::{
    make_empty_response, try_validate_response, validate_response, AnalyzeResponse, Assets,
    Feedback, SchemaError, ScoreKey, Scores,
};
pub use session::{AnalyzeSession, AnalyzeSessionBuilder};
pub use stub::make_stub;
pub use transport::{HttpTransport, MockReply, MockTransport, Transport};
pub use types::{AnalyzeOptions, AnalyzeRequest, AnalyzeState};
