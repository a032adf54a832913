//! Cancellation signals and timeout composition.
//!
//! A [`CancelSignal`] is a cloneable token that fires at most once and
//! remembers why. Callers hand one to
//! [`AnalyzeOptions::with_signal`](crate::AnalyzeOptions::with_signal);
//! [`compose_cancellation`] merges it with a request timeout into a single
//! derived signal that the transport races against.
//!
//! ```text
//! caller signal ──┐
//!                 ├──► derived signal ──► transport::invoke aborts
//! timeout timer ──┘
//! ```
//!
//! The first parent to fire decides the [`CancelReason`] recorded on the
//! derived signal.

use futures::future::select_all;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why a signal fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// Explicit cancellation (`cancel()`, `reset()`, or a superseding call).
    Canceled,
    /// The request timeout elapsed.
    TimedOut(Duration),
    /// Caller-supplied reason.
    Custom(String),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Canceled => f.write_str("canceled"),
            CancelReason::TimedOut(after) => {
                write!(f, "Request timed out after {} ms", after.as_millis())
            }
            CancelReason::Custom(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Default)]
struct SignalInner {
    token: CancellationToken,
    reason: OnceLock<CancelReason>,
}

/// A one-shot cancellation signal carrying a reason.
///
/// Clones share state: cancelling any clone cancels them all.
///
/// # Example
///
/// ```
/// use speakmate_client::cancel::{CancelReason, CancelSignal};
///
/// let signal = CancelSignal::new();
/// assert!(signal.cancel(CancelReason::Custom("user left".into())));
/// assert!(!signal.cancel(CancelReason::Canceled)); // first reason wins
/// assert_eq!(signal.reason().unwrap().to_string(), "user left");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<SignalInner>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `false` if it had already fired, in which
    /// case the original reason is kept.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        if self.inner.reason.set(reason).is_err() {
            return false;
        }
        self.inner.token.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// The reason the signal fired, if it has.
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason.get().cloned()
    }

    /// Wait until the signal fires and return its reason.
    pub async fn cancelled(&self) -> CancelReason {
        self.inner.token.cancelled().await;
        self.reason().unwrap_or(CancelReason::Canceled)
    }

    /// Whether `other` is a clone of this signal.
    pub fn same_as(&self, other: &CancelSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Derive a signal that fires when any parent fires, with that
    /// parent's reason.
    ///
    /// An already-fired parent fires the derived signal immediately and no
    /// watcher is spawned. Otherwise a background task forwards the first
    /// parent to fire; it is stopped by the returned guard or by the
    /// derived signal firing on its own. Must be called inside a Tokio
    /// runtime when any parent is still pending.
    pub fn any(parents: &[CancelSignal]) -> (CancelSignal, CancelGuard) {
        let derived = CancelSignal::new();
        let mut guard = CancelGuard::default();

        if let Some(reason) = parents.iter().find_map(CancelSignal::reason) {
            derived.cancel(reason);
            return (derived, guard);
        }
        if parents.is_empty() {
            return (derived, guard);
        }

        let parents = parents.to_vec();
        let target = derived.clone();
        guard.tasks.push(tokio::spawn(async move {
            let waits = parents.iter().map(|p| Box::pin(p.cancelled()));
            tokio::select! {
                (reason, _, _) = select_all(waits) => {
                    target.cancel(reason);
                }
                _ = target.cancelled() => {}
            }
        }));
        (derived, guard)
    }
}

/// Owns the background tasks behind a derived signal.
///
/// Dropping the guard (or calling [`release`](Self::release)) stops the
/// timer and the parent watchers. It does not fire the signal.
#[derive(Debug, Default)]
pub struct CancelGuard {
    tasks: Vec<JoinHandle<()>>,
}

impl CancelGuard {
    /// Stop the timer and watchers now.
    pub fn release(self) {
        drop(self);
    }

    /// Number of background tasks still attached to this guard.
    pub fn active_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Merge an optional external signal with a timeout.
///
/// The derived signal fires with [`CancelReason::TimedOut`] once `timeout`
/// elapses, or with the external reason if the external signal fires
/// first. An external signal that has already fired cancels the derived
/// signal immediately and no timer is started.
pub fn compose_cancellation(
    external: Option<&CancelSignal>,
    timeout: Duration,
) -> (CancelSignal, CancelGuard) {
    let parents: Vec<CancelSignal> = external.into_iter().cloned().collect();
    let (derived, mut guard) = CancelSignal::any(&parents);
    if derived.is_cancelled() {
        return (derived, guard);
    }

    let timer = derived.clone();
    guard.tasks.push(tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(timeout) => {
                timer.cancel(CancelReason::TimedOut(timeout));
            }
            _ = timer.cancelled() => {}
        }
    }));
    (derived, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reason_text() {
        let reason = CancelReason::TimedOut(Duration::from_millis(30_000));
        assert_eq!(reason.to_string(), "Request timed out after 30000 ms");
        assert_eq!(CancelReason::Canceled.to_string(), "canceled");
    }

    #[test]
    fn test_clones_share_state() {
        let a = CancelSignal::new();
        let b = a.clone();
        assert!(a.same_as(&b));
        assert!(!a.same_as(&CancelSignal::new()));
        b.cancel(CancelReason::Canceled);
        assert!(a.is_cancelled());
        assert_eq!(a.reason(), Some(CancelReason::Canceled));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_with_reason() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        signal.cancel(CancelReason::Custom("stop".into()));
        assert_eq!(handle.await.unwrap(), CancelReason::Custom("stop".into()));
    }

    #[tokio::test]
    async fn test_timer_fires_with_timeout_reason() {
        let (derived, _guard) = compose_cancellation(None, Duration::from_millis(5));
        let reason = tokio::time::timeout(Duration::from_secs(2), derived.cancelled())
            .await
            .expect("timer should fire");
        assert_eq!(reason, CancelReason::TimedOut(Duration::from_millis(5)));
    }

    #[tokio::test]
    async fn test_pre_cancelled_external_propagates_immediately() {
        let external = CancelSignal::new();
        external.cancel(CancelReason::Custom("already gone".into()));

        let (derived, guard) = compose_cancellation(Some(&external), Duration::from_secs(30));
        assert!(derived.is_cancelled());
        assert_eq!(derived.reason(), Some(CancelReason::Custom("already gone".into())));
        assert_eq!(guard.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_external_fires_before_timeout() {
        let external = CancelSignal::new();
        let (derived, _guard) = compose_cancellation(Some(&external), Duration::from_secs(30));
        assert!(!derived.is_cancelled());

        external.cancel(CancelReason::Canceled);
        let reason = tokio::time::timeout(Duration::from_secs(2), derived.cancelled())
            .await
            .expect("external cancel should propagate");
        assert_eq!(reason, CancelReason::Canceled);
    }

    #[tokio::test]
    async fn test_released_guard_stops_timer() {
        let (derived, guard) = compose_cancellation(None, Duration::from_millis(10));
        guard.release();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!derived.is_cancelled());
    }

    #[tokio::test]
    async fn test_any_picks_first_parent() {
        let a = CancelSignal::new();
        let b = CancelSignal::new();
        let (derived, _guard) = CancelSignal::any(&[a.clone(), b.clone()]);

        b.cancel(CancelReason::Custom("b".into()));
        let reason = tokio::time::timeout(Duration::from_secs(2), derived.cancelled())
            .await
            .unwrap();
        assert_eq!(reason, CancelReason::Custom("b".into()));

        a.cancel(CancelReason::Custom("a".into()));
        assert_eq!(derived.reason(), Some(CancelReason::Custom("b".into())));
    }

    #[test]
    fn test_any_without_parents_never_fires() {
        let (derived, guard) = CancelSignal::any(&[]);
        assert!(!derived.is_cancelled());
        assert_eq!(guard.active_tasks(), 0);
    }
}
