//! Time-bounded persistence of the parsed channel collection.
//!
//! One shared slot: writing always replaces the previous content. The
//! payload is the JSON record `{data, timestamp}` under a fixed key, with
//! the expiry instant (epoch millis) under a second key. Any storage or
//! decode problem degrades to a cache miss and purges both keys.

use crate::channel::OrganizedChannels;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CACHE_KEY: &str = "mayo-tv-channels";
const CACHE_EXPIRY_KEY: &str = "mayo-tv-channels-expiry";

/// Minimal key/value persistence, so the cache and preference layer can
/// run against disk in the app and against memory in tests.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), anyhow::Error>;
    fn remove(&self, key: &str);
}

/// One file per key under the platform cache directory.
pub struct DiskStorage {
    dir: PathBuf,
}

impl DiskStorage {
    pub fn new() -> Option<Self> {
        use directories::ProjectDirs;
        let proj = ProjectDirs::from("com", "mayotv", "mayo-tv")?;
        let dir = proj.cache_dir().to_path_buf();
        std::fs::create_dir_all(&dir).ok()?;
        Some(Self { dir })
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed ASCII identifiers; keep the mapping readable.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl Storage for DiskStorage {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}

/// In-memory storage for tests.
#[derive(Default)]
pub struct MemoryStorage {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.lock().expect("storage poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().expect("storage poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        self.map
            .lock()
            .expect("storage poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.map.lock().expect("storage poisoned").remove(key);
    }
}

#[derive(Serialize, Deserialize)]
struct CachedChannels {
    data: OrganizedChannels,
    timestamp: i64,
}

pub struct ChannelCache {
    storage: Arc<dyn Storage>,
    ttl: Duration,
}

impl ChannelCache {
    pub fn new(storage: Arc<dyn Storage>, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    /// Persist the collection and stamp its expiry `ttl` from now.
    /// Storage errors are logged and swallowed.
    pub fn write(&self, data: &OrganizedChannels) {
        let now = chrono::Utc::now().timestamp_millis();
        let record = CachedChannels {
            data: data.clone(),
            timestamp: now,
        };
        let payload = match serde_json::to_string(&record) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(%err, "impossible de sérialiser le cache");
                return;
            }
        };
        let expiry = now + self.ttl.as_millis() as i64;
        if let Err(err) = self
            .storage
            .set(CACHE_KEY, &payload)
            .and_then(|_| self.storage.set(CACHE_EXPIRY_KEY, &expiry.to_string()))
        {
            tracing::warn!(%err, "impossible de mettre en cache les chaînes");
        }
    }

    /// Return the cached collection, or `None` (purging storage) when the
    /// expiry marker is absent, unreadable or in the past, or the payload
    /// fails to decode.
    pub fn read(&self) -> Option<OrganizedChannels> {
        let expiry = match self
            .storage
            .get(CACHE_EXPIRY_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            Some(expiry) => expiry,
            None => {
                self.clear();
                return None;
            }
        };
        if chrono::Utc::now().timestamp_millis() > expiry {
            self.clear();
            return None;
        }

        let payload = self.storage.get(CACHE_KEY)?;
        match serde_json::from_str::<CachedChannels>(&payload) {
            Ok(record) => Some(record.data),
            Err(err) => {
                tracing::warn!(%err, "cache corrompu, purge");
                self.clear();
                None
            }
        }
    }

    /// Check the expiry marker without touching the payload.
    pub fn is_valid(&self) -> bool {
        self.storage
            .get(CACHE_EXPIRY_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|expiry| chrono::Utc::now().timestamp_millis() < expiry)
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        self.storage.remove(CACHE_KEY);
        self.storage.remove(CACHE_EXPIRY_KEY);
    }
}
