//! Rotation and failure tracking for CORS relay endpoints.
//!
//! The browser-facing playlist source and most stream hosts forbid direct
//! cross-origin access, so every request goes through one of a fixed list
//! of public relays. Failed relays are skipped until a periodic reset;
//! when every relay has failed the set is cleared and selection restarts
//! at the first entry (fail-open: availability over strict correctness).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How a relay expects the target URL to be attached.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProxyStyle {
    /// Percent-encoded target appended as a query value
    QueryEncoded,
    /// Raw target appended to the path
    PathRaw,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub base: String,
    pub style: ProxyStyle,
}

impl ProxyEndpoint {
    pub fn new(base: impl Into<String>, style: ProxyStyle) -> Self {
        Self {
            base: base.into(),
            style,
        }
    }

    /// Compose the final request URL for `target`.
    pub fn compose(&self, target: &str) -> String {
        match self.style {
            ProxyStyle::QueryEncoded => format!("{}{}", self.base, urlencoding::encode(target)),
            ProxyStyle::PathRaw => format!("{}{}", self.base, target),
        }
    }
}

/// The endpoint chosen for one request, with its index so the caller can
/// report a failure back.
#[derive(Debug, Clone)]
pub struct ProxySelection {
    pub endpoint: ProxyEndpoint,
    pub index: usize,
}

struct ProxyState {
    cursor: usize,
    failed: HashSet<usize>,
    last_reset: Instant,
}

/// Owned, injectable relay selector (one instance shared by the fetcher
/// and the prober). Interior mutability keeps `select`/`mark_failed`
/// read-then-write atomic.
pub struct ProxySelector {
    endpoints: Vec<ProxyEndpoint>,
    reset_interval: Duration,
    state: Mutex<ProxyState>,
}

impl ProxySelector {
    pub fn new(endpoints: Vec<ProxyEndpoint>) -> Self {
        Self::with_reset_interval(endpoints, Duration::from_secs(5 * 60))
    }

    pub fn with_reset_interval(endpoints: Vec<ProxyEndpoint>, reset_interval: Duration) -> Self {
        assert!(!endpoints.is_empty(), "at least one proxy endpoint required");
        Self {
            endpoints,
            reset_interval,
            state: Mutex::new(ProxyState {
                cursor: 0,
                failed: HashSet::new(),
                last_reset: Instant::now(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Pick the first non-failed endpoint at or after the cursor.
    ///
    /// Clears the failed set when the reset interval has elapsed, and
    /// fail-open resets to index 0 when every endpoint is marked failed.
    pub fn select(&self) -> ProxySelection {
        let mut state = self.state.lock().expect("proxy state poisoned");

        if state.last_reset.elapsed() > self.reset_interval {
            state.failed.clear();
            state.cursor = 0;
            state.last_reset = Instant::now();
        }

        let n = self.endpoints.len();
        for offset in 0..n {
            let index = (state.cursor + offset) % n;
            if !state.failed.contains(&index) {
                state.cursor = index;
                return ProxySelection {
                    endpoint: self.endpoints[index].clone(),
                    index,
                };
            }
        }

        // All endpoints failed: reset and hand back the first one anyway.
        tracing::warn!("all proxy endpoints marked failed, resetting");
        state.failed.clear();
        state.cursor = 0;
        ProxySelection {
            endpoint: self.endpoints[0].clone(),
            index: 0,
        }
    }

    /// Record a failure for `index`. Idempotent. The cursor moves past the
    /// failed endpoint so the next selection starts elsewhere.
    pub fn mark_failed(&self, index: usize) {
        if index >= self.endpoints.len() {
            return;
        }
        let mut state = self.state.lock().expect("proxy state poisoned");
        if state.failed.insert(index) {
            tracing::debug!(base = %self.endpoints[index].base, "proxy marked failed");
        }
        if state.cursor == index {
            state.cursor = (index + 1) % self.endpoints.len();
        }
    }

    pub fn is_marked_failed(&self, index: usize) -> bool {
        self.state
            .lock()
            .expect("proxy state poisoned")
            .failed
            .contains(&index)
    }

    /// Select a relay and compose the proxied URL for `target` in one step.
    pub fn proxied_url(&self, target: &str) -> (String, usize) {
        let selection = self.select();
        (selection.endpoint.compose(target), selection.index)
    }
}

impl Default for ProxySelector {
    fn default() -> Self {
        Self::new(crate::config::default_proxy_endpoints())
    }
}
