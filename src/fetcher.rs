//! Playlist download with proxy rotation and byte-progress reporting.

use crate::config::ClientConfig;
use crate::errors::FetchError;
use crate::proxy::ProxySelector;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// The network phase occupies this sub-range of overall loading progress.
pub const NETWORK_PROGRESS_START: u8 = 30;
pub const NETWORK_PROGRESS_END: u8 = 80;

pub struct PlaylistFetcher {
    client: reqwest::Client,
    proxies: Arc<ProxySelector>,
    playlist_url: String,
    timeout: Duration,
    attempts: u32,
    retry_delay: Duration,
}

impl PlaylistFetcher {
    pub fn new(config: &ClientConfig, proxies: Arc<ProxySelector>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("MayoTV/0.1")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            proxies,
            playlist_url: config.playlist_url.clone(),
            timeout: config.fetch_timeout(),
            attempts: config.fetch_attempts.max(1),
            retry_delay: config.retry_delay(),
        }
    }

    /// Download the playlist text, trying up to the configured number of
    /// relays. A failed attempt marks its relay and moves on after a
    /// short pause; only when every attempt is spent does the aggregate
    /// error surface.
    pub async fn fetch(&self) -> Result<String, FetchError> {
        self.fetch_with_progress(|_, _| {}).await
    }

    /// Same as [`fetch`](Self::fetch), reporting overall progress
    /// (scaled into 30–80) and a human message as bytes arrive.
    pub async fn fetch_with_progress(
        &self,
        mut on_progress: impl FnMut(u8, String),
    ) -> Result<String, FetchError> {
        let mut last: Option<FetchError> = None;
        for attempt in 0..self.attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }
            let (url, index) = self.proxies.proxied_url(&self.playlist_url);
            match self.attempt(&url, &mut on_progress).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    tracing::debug!(attempt, %err, "proxied playlist fetch failed");
                    self.proxies.mark_failed(index);
                    last = Some(err);
                }
            }
        }
        Err(FetchError::Exhausted {
            attempts: self.attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn attempt(
        &self,
        url: &str,
        on_progress: &mut impl FnMut(u8, String),
    ) -> Result<String, FetchError> {
        let work = async {
            let resp = self
                .client
                .get(url)
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache")
                .send()
                .await
                .map_err(|e| self.classify(e))?;
            if !resp.status().is_success() {
                return Err(FetchError::Status(resp.status().as_u16()));
            }

            let expected = resp.content_length();
            let mut stream = resp.bytes_stream();
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| self.classify(e))?;
                buf.extend_from_slice(&chunk);
                if let Some(total) = expected.filter(|t| *t > 0) {
                    let span = (NETWORK_PROGRESS_END - NETWORK_PROGRESS_START) as f64;
                    let frac = (buf.len() as f64 / total as f64).min(1.0);
                    let progress = NETWORK_PROGRESS_START + (frac * span) as u8;
                    on_progress(
                        progress,
                        format!("Téléchargement... {}KB", buf.len() / 1024),
                    );
                }
            }

            String::from_utf8(buf).map_err(|e| FetchError::Network(e.to_string()))
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout.as_secs())),
        }
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
