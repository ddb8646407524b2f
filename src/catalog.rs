//! Service layer tying the fetcher, cache and parser together: the
//! cache-or-network load pipeline, organization-mode switching with
//! preference persistence, per-facet statistics and search filtering.

use crate::cache::{ChannelCache, DiskStorage, MemoryStorage, Storage};
use crate::channel::{
    flatten, Channel, ChannelStatus, OrganizationMode, OrganizedChannels,
};
use crate::config::ClientConfig;
use crate::errors::{FetchError, LoadingStage, LoadingState};
use crate::fetcher::PlaylistFetcher;
use crate::parser::{self, OrganizationInfo};
use crate::prober::ChannelProber;
use crate::proxy::ProxySelector;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

const ORGANIZATION_MODE_KEY: &str = "mayo-tv-organization-mode";
const THEME_KEY: &str = "mayo-tv-theme";

const MAX_SUGGESTIONS: usize = 5;
const MIN_SUGGESTION_LEN: usize = 2;

/// Aggregate counts over the loaded channel set.
#[derive(Debug, Clone, Default)]
pub struct CatalogStats {
    pub total_channels: usize,
    pub total_groups: usize,
    pub by_kind: HashMap<String, usize>,
    pub by_quality: HashMap<String, usize>,
    pub by_category: HashMap<String, usize>,
    pub by_country: HashMap<String, usize>,
    pub by_language: HashMap<String, usize>,
}

pub fn catalog_stats(channels: &[Channel], total_groups: usize) -> CatalogStats {
    let mut stats = CatalogStats {
        total_channels: channels.len(),
        total_groups,
        ..Default::default()
    };
    for channel in channels {
        *stats
            .by_kind
            .entry(channel.kind.label().to_string())
            .or_insert(0) += 1;
        *stats
            .by_quality
            .entry(channel.quality.badge().to_string())
            .or_insert(0) += 1;
        *stats
            .by_category
            .entry(channel.category.label().to_string())
            .or_insert(0) += 1;
        *stats.by_country.entry(channel.country.clone()).or_insert(0) += 1;
        *stats
            .by_language
            .entry(channel.language.clone())
            .or_insert(0) += 1;
    }
    stats
}

fn matches_term(channel: &Channel, term: &str) -> bool {
    channel.name.to_lowercase().contains(term)
        || channel.category.label().contains(term)
        || channel.country.to_lowercase().contains(term)
        || channel.language.to_lowercase().contains(term)
        || channel.kind.label().to_lowercase().contains(term)
        || channel.quality.badge().to_lowercase().contains(term)
}

/// Substring filter over name, category, country, language, kind and
/// quality. An empty term keeps everything.
pub fn filter_channels<'a>(channels: &'a [Channel], term: &str) -> Vec<&'a Channel> {
    if term.is_empty() {
        return channels.iter().collect();
    }
    let term = term.to_lowercase();
    channels.iter().filter(|c| matches_term(c, &term)).collect()
}

/// Up to five distinct completion suggestions for a partial search term.
pub fn search_suggestions(channels: &[Channel], term: &str) -> Vec<String> {
    if term.len() < MIN_SUGGESTION_LEN {
        return Vec::new();
    }
    let term = term.to_lowercase();
    let mut seen = HashSet::new();
    let mut suggestions = Vec::new();
    for channel in channels {
        let mut candidates: Vec<&str> = Vec::new();
        if channel.name.to_lowercase().contains(&term) {
            candidates.push(&channel.name);
        }
        if channel.category.label().contains(&term) {
            candidates.push(channel.category.label());
        }
        if channel.country.to_lowercase().contains(&term) {
            candidates.push(&channel.country);
        }
        if channel.language.to_lowercase().contains(&term) {
            candidates.push(&channel.language);
        }
        for value in candidates {
            if suggestions.len() >= MAX_SUGGESTIONS {
                return suggestions;
            }
            if seen.insert(value.to_string()) {
                suggestions.push(value.to_string());
            }
        }
    }
    suggestions
}

pub struct Catalog {
    fetcher: PlaylistFetcher,
    cache: ChannelCache,
    storage: Arc<dyn Storage>,
    state_tx: watch::Sender<LoadingState>,
    channels: Vec<Channel>,
    organized: OrganizedChannels,
    mode: OrganizationMode,
}

impl Catalog {
    pub fn new(config: &ClientConfig) -> Self {
        let storage: Arc<dyn Storage> = match DiskStorage::new() {
            Some(disk) => Arc::new(disk),
            None => {
                tracing::warn!("no cache directory available, falling back to memory");
                Arc::new(MemoryStorage::new())
            }
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: &ClientConfig, storage: Arc<dyn Storage>) -> Self {
        let proxies = Arc::new(ProxySelector::with_reset_interval(
            config.proxy_endpoints.clone(),
            config.proxy_reset_interval(),
        ));
        let fetcher = PlaylistFetcher::new(config, proxies);
        let cache = ChannelCache::new(storage.clone(), config.cache_ttl());
        let (state_tx, _) = watch::channel(LoadingState::starting());
        Self {
            fetcher,
            cache,
            storage,
            state_tx,
            channels: Vec::new(),
            organized: Vec::new(),
            mode: OrganizationMode::Country,
        }
    }

    /// Watch the load pipeline. The receiver sees every state transition
    /// published by [`load`](Self::load).
    pub fn subscribe(&self) -> watch::Receiver<LoadingState> {
        self.state_tx.subscribe()
    }

    fn emit(&self, state: LoadingState) {
        let _ = self.state_tx.send(state);
    }

    /// Run the load pipeline: cache check, proxied download with byte
    /// progress, parse, cache write. `force_refresh` bypasses the cache
    /// check. A failure surfaces both as the returned error and as a
    /// terminal non-loading state carrying the message.
    pub async fn load(&mut self, force_refresh: bool) -> Result<(), FetchError> {
        self.emit(LoadingState::at(
            LoadingStage::Cache,
            10,
            "Vérification du cache...",
        ));

        if !force_refresh {
            if let Some(cached) = self.cache.read() {
                if !cached.is_empty() {
                    self.channels = flatten(&cached);
                    self.restore_saved_mode();
                    self.organized = parser::organize(&self.channels, self.mode);
                    self.emit(LoadingState::complete("Chargé depuis le cache"));
                    return Ok(());
                }
            }
        }

        self.emit(LoadingState::at(
            LoadingStage::Network,
            30,
            "Téléchargement de la playlist...",
        ));
        let tx = self.state_tx.clone();
        let text = match self
            .fetcher
            .fetch_with_progress(move |progress, message| {
                let _ = tx.send(LoadingState::at(LoadingStage::Network, progress, message));
            })
            .await
        {
            Ok(text) => text,
            Err(err) => {
                self.emit(LoadingState::failed(err.to_string()));
                return Err(err);
            }
        };

        self.emit(LoadingState::at(
            LoadingStage::Parsing,
            85,
            "Analyse de la playlist...",
        ));
        self.channels = parser::parse_channels(&text);
        self.restore_saved_mode();
        self.organized = parser::organize(&self.channels, self.mode);

        self.emit(LoadingState::at(LoadingStage::Parsing, 95, "Finalisation..."));
        let cached_view = if self.mode == OrganizationMode::Country {
            self.organized.clone()
        } else {
            parser::organize(&self.channels, OrganizationMode::Country)
        };
        self.cache.write(&cached_view);

        self.emit(LoadingState::complete(format!(
            "{} groupes chargés",
            self.organized.len()
        )));
        Ok(())
    }

    /// Force-refresh bypassing the cache.
    pub async fn reload(&mut self) -> Result<(), FetchError> {
        self.cache.clear();
        self.load(true).await
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn organized(&self) -> &OrganizedChannels {
        &self.organized
    }

    pub fn mode(&self) -> OrganizationMode {
        self.mode
    }

    /// Regroup under a new mode and remember the choice.
    pub fn set_mode(&mut self, mode: OrganizationMode) {
        self.mode = mode;
        self.organized = parser::organize(&self.channels, mode);
        if let Err(err) = self.storage.set(ORGANIZATION_MODE_KEY, mode.as_str()) {
            tracing::warn!(%err, "impossible d'enregistrer le mode d'organisation");
        }
    }

    /// Modes worth offering: more than one distinct group key.
    pub fn available_organizations(&self) -> Vec<OrganizationInfo> {
        parser::available_organizations(&self.channels)
            .into_iter()
            .filter(|info| info.count > 1)
            .collect()
    }

    /// Apply the persisted mode preference, but only when that mode is
    /// currently among the available organizations.
    fn restore_saved_mode(&mut self) {
        let saved = self
            .storage
            .get(ORGANIZATION_MODE_KEY)
            .and_then(|s| OrganizationMode::parse(s.trim()));
        if let Some(mode) = saved {
            let usable = self
                .available_organizations()
                .iter()
                .any(|info| info.mode == mode);
            if usable {
                self.mode = mode;
            }
        }
    }

    pub fn stats(&self) -> CatalogStats {
        catalog_stats(&self.channels, self.organized.len())
    }

    pub fn filter<'a>(&'a self, term: &str) -> Vec<&'a Channel> {
        filter_channels(&self.channels, term)
    }

    pub fn suggestions(&self, term: &str) -> Vec<String> {
        search_suggestions(&self.channels, term)
    }

    /// Probe one channel of one displayed group, updating its status.
    pub async fn probe_channel(
        &mut self,
        prober: &ChannelProber,
        group_key: &str,
        index: usize,
    ) -> Option<ChannelStatus> {
        let group = self.organized.iter_mut().find(|g| g.key == group_key)?;
        let channel = group.channels.get_mut(index)?;
        channel.status = ChannelStatus::Checking;
        let status = prober.probe_url(&channel.url).await;
        channel.status = status;
        Some(status)
    }

    /// Probe every channel of one displayed group in batches.
    pub async fn probe_group(&mut self, prober: &ChannelProber, group_key: &str) {
        if let Some(group) = self.organized.iter_mut().find(|g| g.key == group_key) {
            prober.probe_all(&mut group.channels).await;
        }
    }

    pub fn set_theme(&self, theme: &str) {
        if let Err(err) = self.storage.set(THEME_KEY, theme) {
            tracing::warn!(%err, "impossible d'enregistrer le thème");
        }
    }

    pub fn theme(&self) -> Option<String> {
        self.storage.get(THEME_KEY)
    }
}
