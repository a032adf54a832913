//! Request lifecycle manager.
//!
//! [`AnalyzeSession`] runs at most one analysis call at a time and exposes
//! the outcome as an observable `(loading, data, error)` triple. Starting a
//! new call cancels the previous one; `cancel()` and `reset()` do the same
//! on demand.
//!
//! Every call is tagged with a generation number. The session records the
//! generation and cancellation signal of the newest call as the *active
//! call*, and a finishing call may only touch the state if it is still the
//! active one. A slow transport that ignores cancellation therefore cannot
//! overwrite the result of a newer call.
//!
//! ```text
//! analyze(A) ──► active = A ──► transport ...............► A settles: stale, dropped
//! analyze(B) ──► cancel A, active = B ──► transport ──► B settles: published
//! ```

use crate::cancel::{compose_cancellation, CancelReason, CancelSignal};
use crate::client::{AnalyzeClient, Target};
use crate::error::{AnalyzeError, Result};
use crate::events::{emit, Event, EventHandler, Outcome};
use crate::schema::AnalyzeResponse;
use crate::stub::make_stub;
use crate::types::{AnalyzeOptions, AnalyzeRequest, AnalyzeState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The call that currently owns the session.
#[derive(Debug)]
struct ActiveCall {
    generation: u64,
    signal: CancelSignal,
}

#[derive(Debug, Default)]
struct SessionState {
    loading: bool,
    error: Option<Arc<AnalyzeError>>,
    data: Option<AnalyzeResponse>,
    active: Option<ActiveCall>,
    last_generation: u64,
}

impl SessionState {
    fn snapshot(&self) -> AnalyzeState {
        AnalyzeState {
            loading: self.loading,
            error: self.error.clone(),
            data: self.data.clone(),
        }
    }

    fn owns(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.generation == generation)
    }

    /// Cancel and forget the active call, returning its generation.
    fn cancel_active(&mut self) -> Option<u64> {
        let active = self.active.take()?;
        active.signal.cancel(CancelReason::Canceled);
        Some(active.generation)
    }
}

/// Single-in-flight analysis session with observable state.
///
/// Share it behind an `Arc` when `analyze` and `cancel` are driven from
/// different tasks.
///
/// # Example
///
/// ```no_run
/// use speakmate_client::{AnalyzeRequest, AnalyzeSession};
///
/// #[tokio::main]
/// async fn main() {
///     let session = AnalyzeSession::new();
///     if let Some(report) = session.analyze(&AnalyzeRequest::new("uploads/42"), None).await {
///         println!("overall: {}", report.scores.overall());
///     } else if let Some(err) = session.error() {
///         eprintln!("analysis failed: {err}");
///     }
/// }
/// ```
pub struct AnalyzeSession {
    client: AnalyzeClient,
    defaults: AnalyzeOptions,
    event_handler: Option<Arc<dyn EventHandler>>,
    state: Mutex<SessionState>,
}

impl AnalyzeSession {
    /// A session with the default client and no default options.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new builder.
    pub fn builder() -> AnalyzeSessionBuilder {
        AnalyzeSessionBuilder {
            client: None,
            defaults: AnalyzeOptions::default(),
            event_handler: None,
        }
    }

    /// Snapshot of the observable state.
    pub fn state(&self) -> AnalyzeState {
        self.lock().snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn data(&self) -> Option<AnalyzeResponse> {
        self.lock().data.clone()
    }

    pub fn error(&self) -> Option<Arc<AnalyzeError>> {
        self.lock().error.clone()
    }

    /// Run one analysis call, superseding any call in flight.
    ///
    /// `options` are merged over the session defaults field by field.
    /// Returns the validated response if this call succeeded and was not
    /// superseded; otherwise `None`, with any error published to
    /// [`error`](Self::error). Aborts (cancel, supersede, timeout, external
    /// signal) are not errors and leave the state pristine.
    pub async fn analyze(
        &self,
        request: &AnalyzeRequest,
        options: Option<AnalyzeOptions>,
    ) -> Option<AnalyzeResponse> {
        let options = options.unwrap_or_default().merged_over(&self.defaults);
        let (signal, guard) =
            compose_cancellation(options.signal.as_ref(), options.timeout_or_default());

        let (generation, superseded, snapshot) = {
            let mut state = self.lock();
            let superseded = state.cancel_active();
            state.last_generation += 1;
            let generation = state.last_generation;
            state.active = Some(ActiveCall {
                generation,
                signal: signal.clone(),
            });
            state.loading = true;
            state.error = None;
            (generation, superseded, state.snapshot())
        };

        if let Some(previous) = superseded {
            tracing::debug!(previous, generation, "superseding in-flight analysis call");
            self.emit(Event::Superseded {
                generation: previous,
            });
        }
        tracing::debug!(generation, transcript_key = %request.transcript_key, "analysis call started");
        self.emit(Event::Started { generation });
        self.emit(Event::StateChanged(snapshot));

        let mut pending = PendingCall {
            session: self,
            generation,
            armed: true,
        };
        let result = self.run(request, &options, &signal).await;
        guard.release();
        pending.armed = false;
        self.settle(generation, result)
    }

    /// Cancel the call in flight, if any. Idempotent.
    ///
    /// The cancelled call's eventual result is discarded and the state
    /// returns to not loading, no error, no data.
    pub fn cancel(&self) {
        let (cancelled, snapshot) = {
            let mut state = self.lock();
            let Some(generation) = state.cancel_active() else {
                return;
            };
            state.loading = false;
            state.error = None;
            state.data = None;
            (generation, state.snapshot())
        };
        tracing::debug!(generation = cancelled, "analysis call cancelled");
        self.emit(Event::Superseded {
            generation: cancelled,
        });
        self.emit(Event::StateChanged(snapshot));
    }

    /// Cancel any call in flight and clear error and data.
    pub fn reset(&self) {
        let (cancelled, snapshot) = {
            let mut state = self.lock();
            let cancelled = state.cancel_active();
            state.loading = false;
            state.error = None;
            state.data = None;
            (cancelled, state.snapshot())
        };
        if let Some(generation) = cancelled {
            self.emit(Event::Superseded { generation });
        }
        self.emit(Event::StateChanged(snapshot));
    }

    async fn run(
        &self,
        request: &AnalyzeRequest,
        options: &AnalyzeOptions,
        signal: &CancelSignal,
    ) -> Result<AnalyzeResponse> {
        match self.client.target(options) {
            Target::Stub => {
                tracing::debug!(dry_run = options.is_dry_run(), "serving stub analysis response");
                Ok(make_stub(request))
            }
            Target::Live { url } => {
                options.validate()?;
                self.client.fetch(&url, request, signal).await
            }
        }
    }

    /// Release the session held by a call whose future was dropped.
    fn abandon(&self, generation: u64) {
        let snapshot = {
            let mut state = self.lock();
            if !state.owns(generation) {
                return;
            }
            state.cancel_active();
            state.loading = false;
            state.error = None;
            state.data = None;
            state.snapshot()
        };
        tracing::debug!(generation, "analysis call dropped before settling");
        self.emit(Event::Settled {
            generation,
            outcome: Outcome::Aborted(CancelReason::Canceled),
        });
        self.emit(Event::StateChanged(snapshot));
    }

    /// Publish a finished call's result if it still owns the session.
    fn settle(&self, generation: u64, result: Result<AnalyzeResponse>) -> Option<AnalyzeResponse> {
        let mut state = self.lock();
        if !state.owns(generation) {
            drop(state);
            tracing::debug!(generation, "discarding result of superseded analysis call");
            self.emit(Event::Discarded { generation });
            return None;
        }

        state.active = None;
        state.loading = false;
        let (outcome, returned) = match result {
            Ok(response) => {
                state.data = Some(response.clone());
                (Outcome::Data, Some(response))
            }
            Err(AnalyzeError::Cancelled(reason)) => {
                tracing::debug!(generation, %reason, "analysis call aborted");
                state.error = None;
                state.data = None;
                (Outcome::Aborted(reason), None)
            }
            Err(err) => {
                let err = err.into_surfaced();
                tracing::warn!(generation, error = %err, "analysis call failed");
                state.error = Some(Arc::new(err));
                (Outcome::Error, None)
            }
        };
        let snapshot = state.snapshot();
        drop(state);

        self.emit(Event::Settled {
            generation,
            outcome,
        });
        self.emit(Event::StateChanged(snapshot));
        returned
    }

    fn emit(&self, event: Event) {
        emit(&self.event_handler, event);
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Armed while `analyze` awaits its result. Dropping it armed means the
/// caller dropped the `analyze` future.
struct PendingCall<'a> {
    session: &'a AnalyzeSession,
    generation: u64,
    armed: bool,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.abandon(self.generation);
        }
    }
}

impl Default for AnalyzeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnalyzeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("AnalyzeSession")
            .field("client", &self.client)
            .field("loading", &state.loading)
            .field("has_data", &state.data.is_some())
            .field("has_error", &state.error.is_some())
            .field("active_generation", &state.active.as_ref().map(|a| a.generation))
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`AnalyzeSession`].
pub struct AnalyzeSessionBuilder {
    client: Option<AnalyzeClient>,
    defaults: AnalyzeOptions,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl AnalyzeSessionBuilder {
    /// Set the client. Default: [`AnalyzeClient::default`].
    pub fn client(mut self, client: AnalyzeClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the session-wide default options.
    pub fn defaults(mut self, defaults: AnalyzeOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Build the session.
    pub fn build(self) -> AnalyzeSession {
        AnalyzeSession {
            client: self.client.unwrap_or_default(),
            defaults: self.defaults,
            event_handler: self.event_handler,
            state: Mutex::new(SessionState::default()),
        }
    }
}
