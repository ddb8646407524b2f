//! Incremental variant of the parser: a cheap per-group count index over
//! the raw playlist, then full parse+enrichment of one group on demand.
//!
//! At most one scan runs per group at a time; a second request for a
//! group already in flight attaches to the same shared future instead of
//! starting a duplicate scan. Scans check a cancellation token between
//! lines, so a superseded load stops promptly without being recorded as a
//! fault.

use crate::channel::Channel;
use crate::errors::GroupLoadError;
use crate::parser::{self, UNGROUPED};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cooperative cancellation signal, checked at line boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Index entry for one raw group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    pub name: String,
    pub count: usize,
    pub loaded: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// Single pass over the raw text counting `group-title` occurrences on
/// metadata lines. No channel records are materialized: O(lines) time,
/// O(distinct groups) space.
pub fn build_group_index(text: &str) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if !line.starts_with("#EXTINF:") {
            continue;
        }
        let group = parser::GROUP_TITLE_RE
            .captures(line)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| UNGROUPED.to_string());
        *counts.entry(group).or_insert(0) += 1;
    }
    counts
}

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Vec<Channel>>, GroupLoadError>>>;

struct LoaderInner {
    raw: String,
    index: Mutex<HashMap<String, GroupInfo>>,
    loaded: Mutex<HashMap<String, Arc<Vec<Channel>>>>,
    inflight: Mutex<HashMap<String, SharedLoad>>,
}

pub struct GroupLoader {
    inner: Arc<LoaderInner>,
}

/// Lines scanned between cooperative yields.
const YIELD_EVERY: usize = 512;

/// At most this many groups preload concurrently.
const PRELOAD_LIMIT: usize = 3;

impl GroupLoader {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let index = build_group_index(&raw)
            .into_iter()
            .map(|(name, count)| {
                (
                    name.clone(),
                    GroupInfo {
                        name,
                        count,
                        loaded: false,
                        loading: false,
                        error: None,
                    },
                )
            })
            .collect();
        Self {
            inner: Arc::new(LoaderInner {
                raw,
                index: Mutex::new(index),
                loaded: Mutex::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Index entries, locale-collated by group name.
    pub fn group_index(&self) -> Vec<GroupInfo> {
        let mut entries: Vec<GroupInfo> = self
            .inner
            .index
            .lock()
            .expect("index poisoned")
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            parser::collate_key(&a.name)
                .cmp(&parser::collate_key(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }

    pub fn group_info(&self, name: &str) -> Option<GroupInfo> {
        self.inner
            .index
            .lock()
            .expect("index poisoned")
            .get(name)
            .cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.inner
            .loaded
            .lock()
            .expect("loaded poisoned")
            .contains_key(name)
    }

    pub fn loaded_channels(&self, name: &str) -> Option<Arc<Vec<Channel>>> {
        self.inner
            .loaded
            .lock()
            .expect("loaded poisoned")
            .get(name)
            .cloned()
    }

    /// Parse and enrich the channels of one group.
    ///
    /// Returns the cached result immediately when the group is already
    /// loaded. Otherwise joins the in-flight scan for that group, or
    /// starts one. On failure the group's index entry records the error
    /// and the group becomes eligible for a fresh retry; a cancelled scan
    /// records nothing.
    pub async fn load_group(
        &self,
        name: &str,
        token: CancelToken,
    ) -> Result<Arc<Vec<Channel>>, GroupLoadError> {
        if let Some(hit) = self.loaded_channels(name) {
            return Ok(hit);
        }
        if self.group_info(name).is_none() {
            return Err(GroupLoadError::UnknownGroup(name.to_string()));
        }

        let load = {
            let mut inflight = self.inner.inflight.lock().expect("inflight poisoned");
            if let Some(existing) = inflight.get(name) {
                existing.clone()
            } else {
                if let Some(entry) = self
                    .inner
                    .index
                    .lock()
                    .expect("index poisoned")
                    .get_mut(name)
                {
                    entry.loading = true;
                    entry.error = None;
                }

                let inner = self.inner.clone();
                let group = name.to_string();
                let load = async move {
                    let result = scan_group(&inner.raw, &group, &token).await;
                    match &result {
                        Ok(channels) => {
                            inner
                                .loaded
                                .lock()
                                .expect("loaded poisoned")
                                .insert(group.clone(), channels.clone());
                            if let Some(entry) =
                                inner.index.lock().expect("index poisoned").get_mut(&group)
                            {
                                entry.loaded = true;
                                entry.loading = false;
                                entry.error = None;
                            }
                        }
                        Err(err) => {
                            if let Some(entry) =
                                inner.index.lock().expect("index poisoned").get_mut(&group)
                            {
                                entry.loading = false;
                                if !err.is_cancelled() {
                                    entry.error = Some(err.to_string());
                                }
                            }
                        }
                    }
                    inner
                        .inflight
                        .lock()
                        .expect("inflight poisoned")
                        .remove(&group);
                    result
                }
                .boxed()
                .shared();

                inflight.insert(name.to_string(), load.clone());
                load
            }
        };

        load.await
    }

    /// Kick off loads for up to three not-yet-loaded groups. Each load
    /// settles independently; individual failures are ignored.
    pub async fn preload_groups<S: AsRef<str>>(&self, names: &[S]) {
        let targets: Vec<String> = {
            let index = self.inner.index.lock().expect("index poisoned");
            names
                .iter()
                .map(|n| n.as_ref())
                .filter(|n| index.get(*n).is_some_and(|e| !e.loaded))
                .take(PRELOAD_LIMIT)
                .map(str::to_string)
                .collect()
        };
        let loads = targets
            .iter()
            .map(|name| self.load_group(name, CancelToken::new()));
        let _ = futures::future::join_all(loads).await;
    }
}

/// Re-scan the full text, materializing enriched records only for
/// entries whose group title matches `target`.
async fn scan_group(
    raw: &str,
    target: &str,
    token: &CancelToken,
) -> Result<Arc<Vec<Channel>>, GroupLoadError> {
    let mut channels = Vec::new();
    let mut pending = None;
    let mut in_target = false;

    for (i, raw_line) in raw.lines().enumerate() {
        if token.is_cancelled() {
            return Err(GroupLoadError::Cancelled);
        }
        if i % YIELD_EVERY == YIELD_EVERY - 1 {
            tokio::task::yield_now().await;
        }

        let line = raw_line.trim();
        if line.starts_with("#EXTINF:") {
            let group = parser::GROUP_TITLE_RE
                .captures(line)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| UNGROUPED.to_string());
            in_target = group == target;
            if in_target {
                pending = Some(parser::parse_extinf(line));
            }
        } else if in_target && !line.is_empty() && !line.starts_with('#') {
            if let Some(p) = pending.take() {
                channels.push(parser::finish_channel(p, line.to_string()));
            }
        }
    }

    channels.sort_by(|a, b| {
        parser::collate_key(&a.name)
            .cmp(&parser::collate_key(&b.name))
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(Arc::new(channels))
}
