//! API base URL discovery.
//!
//! Sources, first non-blank match wins:
//!
//! 1. the per-call override ([`AnalyzeOptions::base_url`](crate::AnalyzeOptions::base_url))
//! 2. the runtime override held by an [`EndpointConfig`]
//! 3. the `SPEAKMATE_API_BASE_URL` environment variable, captured at build time
//!
//! No match is not an error: the client falls back to the stub response.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Name of the build-time environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "SPEAKMATE_API_BASE_URL";

/// Endpoint path used when the caller does not set one.
pub const DEFAULT_PATH: &str = "/analyze";

static GLOBAL: OnceLock<Arc<EndpointConfig>> = OnceLock::new();

/// Process-wide endpoint configuration.
///
/// Holds the build-time base URL plus a runtime override that can be
/// changed at any time. Tests create isolated instances with
/// [`EndpointConfig::new`]; everything else shares [`EndpointConfig::global`].
#[derive(Debug, Default)]
pub struct EndpointConfig {
    runtime: RwLock<Option<String>>,
    build_time: Option<String>,
}

impl EndpointConfig {
    /// A config with the given build-time value and no runtime override.
    pub fn new(build_time: Option<String>) -> Self {
        Self {
            runtime: RwLock::new(None),
            build_time,
        }
    }

    /// A config seeded from `SPEAKMATE_API_BASE_URL` as seen by the compiler.
    pub fn from_build_env() -> Self {
        Self::new(option_env!("SPEAKMATE_API_BASE_URL").map(str::to_owned))
    }

    /// The shared process-wide instance, created on first use.
    pub fn global() -> Arc<EndpointConfig> {
        GLOBAL
            .get_or_init(|| Arc::new(EndpointConfig::from_build_env()))
            .clone()
    }

    /// Set the runtime override. The stored value has one trailing `/`
    /// removed.
    pub fn set_runtime_base_url(&self, url: impl Into<String>) {
        let url = strip_trailing_slash(&url.into());
        tracing::info!(base_url = %url, "runtime base URL override set");
        *self.runtime.write().unwrap_or_else(PoisonError::into_inner) = Some(url);
    }

    pub fn runtime_base_url(&self) -> Option<String> {
        self.runtime
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove the runtime override.
    pub fn clear_runtime_base_url(&self) {
        self.runtime
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn build_time_base_url(&self) -> Option<&str> {
        self.build_time.as_deref()
    }

    /// Resolve the base URL for one call. `None` means stub mode.
    pub fn resolve_base_url(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(url) = explicit.and_then(non_blank) {
            return Some(url);
        }
        if let Some(url) = self.runtime_base_url().as_deref().and_then(non_blank) {
            return Some(url);
        }
        self.build_time_base_url().and_then(non_blank)
    }
}

/// Set the runtime override on the global [`EndpointConfig`].
pub fn set_runtime_base_url(url: impl Into<String>) {
    EndpointConfig::global().set_runtime_base_url(url);
}

/// Clear the runtime override on the global [`EndpointConfig`].
pub fn clear_runtime_base_url() {
    EndpointConfig::global().clear_runtime_base_url();
}

fn non_blank(url: &str) -> Option<String> {
    if url.trim().is_empty() {
        None
    } else {
        Some(strip_trailing_slash(url))
    }
}

/// Remove exactly one trailing `/`.
pub fn strip_trailing_slash(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Join a normalized base URL and an endpoint path, adding the leading `/`
/// if the path lacks one.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
