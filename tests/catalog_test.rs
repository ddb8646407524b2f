use mayotv::cache::{ChannelCache, MemoryStorage, Storage};
use mayotv::catalog::{catalog_stats, filter_channels, search_suggestions, Catalog};
use mayotv::channel::OrganizationMode;
use mayotv::config::ClientConfig;
use mayotv::errors::LoadingStage;
use mayotv::parser::{parse, parse_channels};
use mayotv::proxy::{ProxyEndpoint, ProxyStyle};
use std::sync::Arc;
use std::time::Duration;

const PLAYLIST: &str = "\
#EXTINF:-1 group-title=\"France\",TF1 HD
http://stream.example/tf1
#EXTINF:-1 group-title=\"France\",France Info
http://stream.example/finfo
#EXTINF:-1 group-title=\"Spain\",TVE Sport
http://stream.example/tve
";

fn seeded_storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    let cache = ChannelCache::new(storage.clone(), Duration::from_secs(30 * 60));
    cache.write(&parse(PLAYLIST));
    storage
}

#[test]
fn stats_count_every_facet() {
    let channels = parse_channels(PLAYLIST);
    let stats = catalog_stats(&channels, 2);
    assert_eq!(stats.total_channels, 3);
    assert_eq!(stats.total_groups, 2);
    assert_eq!(stats.by_country.get("France"), Some(&2));
    assert_eq!(stats.by_country.get("Spain"), Some(&1));
    assert_eq!(stats.by_quality.get("HD"), Some(&1));
    assert_eq!(stats.by_category.get("news"), Some(&1));
}

#[test]
fn filter_matches_name_and_metadata() {
    let channels = parse_channels(PLAYLIST);
    assert_eq!(filter_channels(&channels, "").len(), 3);
    assert_eq!(filter_channels(&channels, "tf1").len(), 1);
    // Matches the derived country, not just the name.
    assert_eq!(filter_channels(&channels, "spain").len(), 1);
    assert!(filter_channels(&channels, "zzz").is_empty());
}

#[test]
fn suggestions_need_two_chars_and_stay_distinct() {
    let channels = parse_channels(PLAYLIST);
    assert!(search_suggestions(&channels, "t").is_empty());
    let suggestions = search_suggestions(&channels, "fr");
    assert!(suggestions.contains(&"France Info".to_string()));
    assert!(suggestions.contains(&"France".to_string()));
    assert!(suggestions.len() <= 5);
    let mut deduped = suggestions.clone();
    deduped.dedup();
    assert_eq!(deduped, suggestions);
}

#[tokio::test]
async fn load_serves_from_cache_without_network() {
    // Only a dead relay is configured: a cache miss would make this fail.
    let config = ClientConfig {
        proxy_endpoints: vec![ProxyEndpoint::new("http://127.0.0.1:9/", ProxyStyle::PathRaw)],
        fetch_timeout_secs: 1,
        retry_delay_ms: 1,
        ..ClientConfig::default()
    };
    let mut catalog = Catalog::with_storage(&config, seeded_storage());
    let rx = catalog.subscribe();

    catalog.load(false).await.expect("cache hit");
    assert_eq!(catalog.channels().len(), 3);
    assert_eq!(catalog.organized().len(), 2);

    let state = rx.borrow();
    assert!(!state.is_loading);
    assert_eq!(state.stage, LoadingStage::Complete);
    assert_eq!(state.message, "Chargé depuis le cache");
}

#[tokio::test]
async fn set_mode_regroups_and_persists_preference() {
    let storage = seeded_storage();
    let config = ClientConfig::default();
    let mut catalog = Catalog::with_storage(&config, storage.clone());
    catalog.load(false).await.expect("cache hit");

    catalog.set_mode(OrganizationMode::Category);
    assert_eq!(catalog.mode(), OrganizationMode::Category);
    let total: usize = catalog.organized().iter().map(|g| g.channels.len()).sum();
    assert_eq!(total, 3);
    assert_eq!(
        storage.get("mayo-tv-organization-mode"),
        Some("category".to_string())
    );
}

#[tokio::test]
async fn saved_mode_is_restored_when_available() {
    let storage = seeded_storage();
    storage.set("mayo-tv-organization-mode", "category").unwrap();
    let config = ClientConfig::default();
    let mut catalog = Catalog::with_storage(&config, storage);
    catalog.load(false).await.expect("cache hit");
    // The playlist has several categories, so the preference applies.
    assert_eq!(catalog.mode(), OrganizationMode::Category);
}

#[tokio::test]
async fn theme_preference_round_trips() {
    let config = ClientConfig::default();
    let catalog = Catalog::with_storage(&config, Arc::new(MemoryStorage::new()));
    assert_eq!(catalog.theme(), None);
    catalog.set_theme("dark");
    assert_eq!(catalog.theme(), Some("dark".to_string()));
}
