//! Event system for session lifecycle and state hooks.
//!
//! Provides an optional, non-intrusive way to observe an
//! [`AnalyzeSession`](crate::AnalyzeSession). The session emits events when
//! a call starts, when a call is superseded, when a stale result is
//! dropped, and whenever the observable state changes. Presentation code
//! implements [`EventHandler`] to re-render from [`Event::StateChanged`].

use crate::cancel::CancelReason;
use crate::types::AnalyzeState;
use std::sync::Arc;

/// How a call ended, from the session's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A validated response was published.
    Data,
    /// An error was published.
    Error,
    /// The call was aborted; nothing was published.
    Aborted(CancelReason),
}

/// Events emitted by an analysis session.
#[derive(Debug, Clone)]
pub enum Event {
    /// A call has started and owns the session.
    Started {
        /// Generation number of the call.
        generation: u64,
    },
    /// An in-flight call was cancelled by `cancel()`, `reset()` or a newer call.
    Superseded {
        /// Generation number of the cancelled call.
        generation: u64,
    },
    /// A call that still owned the session has finished.
    Settled {
        /// Generation number of the call.
        generation: u64,
        /// What the call published.
        outcome: Outcome,
    },
    /// A call finished after losing ownership; its result was dropped.
    Discarded {
        /// Generation number of the stale call.
        generation: u64,
    },
    /// The observable state changed.
    StateChanged(AnalyzeState),
}

/// Handler for session events.
///
/// This is entirely optional -- sessions work without an event handler.
///
/// # Example
///
/// ```
/// use speakmate_client::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         if let Event::StateChanged(state) = event {
///             println!("loading={} has_data={}", state.loading, state.data.is_some());
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the session emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use speakmate_client::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::Discarded { generation } = event {
///         eprintln!("dropped stale result from call {}", generation);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
