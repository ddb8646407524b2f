use crate::proxy::{ProxyEndpoint, ProxyStyle};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Public playlist served by iptv-org, pre-grouped by country.
pub const DEFAULT_PLAYLIST_URL: &str = "https://iptv-org.github.io/iptv/index.country.m3u";

/// Client configuration. Durations are stored as integers so the file on
/// disk stays hand-editable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    pub playlist_url: String,
    pub proxy_endpoints: Vec<ProxyEndpoint>,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_probe_batch_size")]
    pub probe_batch_size: usize,
    #[serde(default = "default_probe_batch_pause_ms")]
    pub probe_batch_pause_ms: u64,

    #[serde(default = "default_cache_ttl_mins")]
    pub cache_ttl_mins: u64,
    #[serde(default = "default_proxy_reset_mins")]
    pub proxy_reset_mins: u64,
}

fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_fetch_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_probe_timeout_secs() -> u64 {
    10
}
fn default_probe_batch_size() -> usize {
    5
}
fn default_probe_batch_pause_ms() -> u64 {
    1000
}
fn default_cache_ttl_mins() -> u64 {
    30
}
fn default_proxy_reset_mins() -> u64 {
    5
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            playlist_url: DEFAULT_PLAYLIST_URL.to_string(),
            proxy_endpoints: default_proxy_endpoints(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_attempts: default_fetch_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            probe_timeout_secs: default_probe_timeout_secs(),
            probe_batch_size: default_probe_batch_size(),
            probe_batch_pause_ms: default_probe_batch_pause_ms(),
            cache_ttl_mins: default_cache_ttl_mins(),
            proxy_reset_mins: default_proxy_reset_mins(),
        }
    }
}

/// Known public CORS relays. The composition style is a property of each
/// endpoint, configured here rather than inferred at call time.
pub fn default_proxy_endpoints() -> Vec<ProxyEndpoint> {
    vec![
        ProxyEndpoint::new("https://api.allorigins.win/raw?url=", ProxyStyle::QueryEncoded),
        ProxyEndpoint::new("https://cors-anywhere.herokuapp.com/", ProxyStyle::QueryEncoded),
        ProxyEndpoint::new("https://thingproxy.freeboard.io/fetch/", ProxyStyle::PathRaw),
        ProxyEndpoint::new("https://corsproxy.io/?", ProxyStyle::QueryEncoded),
    ]
}

impl ClientConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_batch_pause(&self) -> Duration {
        Duration::from_millis(self.probe_batch_pause_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_mins * 60)
    }

    pub fn proxy_reset_interval(&self) -> Duration {
        Duration::from_secs(self.proxy_reset_mins * 60)
    }

    pub fn load() -> Result<Self, anyhow::Error> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "mayotv", "mayo-tv") {
            let config_path = proj_dirs.config_dir().join("config.json");
            if config_path.exists() {
                let content = fs::read_to_string(config_path)?;
                let config: ClientConfig = serde_json::from_str(&content)?;
                return Ok(config);
            }
        }
        Ok(ClientConfig::default())
    }

    pub fn save(&self) -> Result<(), anyhow::Error> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "mayotv", "mayo-tv") {
            let config_dir = proj_dirs.config_dir();
            fs::create_dir_all(config_dir)?;
            let config_path = config_dir.join("config.json");
            let content = serde_json::to_string_pretty(self)?;
            fs::write(config_path, content)?;
        }
        Ok(())
    }
}
