//! Lightweight reachability checks for individual stream URLs.
//!
//! A probe is a proxied HEAD request: no body transfer, bounded by a
//! timeout. Any failure resolves to the `Error` status and reports the
//! relay used back to the selector; nothing throws past this boundary.

use crate::channel::{Channel, ChannelStatus};
use crate::config::ClientConfig;
use crate::proxy::ProxySelector;
use std::sync::Arc;
use std::time::Duration;

pub struct ChannelProber {
    client: reqwest::Client,
    proxies: Arc<ProxySelector>,
    timeout: Duration,
    batch_size: usize,
    batch_pause: Duration,
}

impl ChannelProber {
    pub fn new(config: &ClientConfig, proxies: Arc<ProxySelector>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("MayoTV/0.1")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            proxies,
            timeout: config.probe_timeout(),
            batch_size: config.probe_batch_size.max(1),
            batch_pause: config.probe_batch_pause(),
        }
    }

    pub async fn probe(&self, channel: &Channel) -> ChannelStatus {
        self.probe_url(&channel.url).await
    }

    /// HEAD the URL through the current relay. Success means `Working`;
    /// a non-success status, transport failure or timeout means `Error`
    /// and the relay is marked failed.
    pub async fn probe_url(&self, url: &str) -> ChannelStatus {
        let (proxied, index) = self.proxies.proxied_url(url);
        match tokio::time::timeout(self.timeout, self.client.head(&proxied).send()).await {
            Ok(Ok(resp)) if resp.status().is_success() => ChannelStatus::Working,
            Ok(Ok(resp)) => {
                tracing::debug!(url, status = resp.status().as_u16(), "probe rejected");
                self.proxies.mark_failed(index);
                ChannelStatus::Error
            }
            Ok(Err(err)) => {
                tracing::debug!(url, %err, "probe failed");
                self.proxies.mark_failed(index);
                ChannelStatus::Error
            }
            Err(_) => {
                tracing::debug!(url, "probe timed out");
                self.proxies.mark_failed(index);
                ChannelStatus::Error
            }
        }
    }

    /// Probe every channel, five at a time, pausing between batches to
    /// bound the outbound request rate. A bad batch never aborts the
    /// following ones; probes are not retried automatically.
    pub async fn probe_all(&self, channels: &mut [Channel]) {
        let batch_size = self.batch_size;
        for (i, batch) in channels.chunks_mut(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.batch_pause).await;
            }
            for channel in batch.iter_mut() {
                channel.status = ChannelStatus::Checking;
            }
            let urls: Vec<String> = batch.iter().map(|c| c.url.clone()).collect();
            let results =
                futures::future::join_all(urls.iter().map(|url| self.probe_url(url))).await;
            for (channel, status) in batch.iter_mut().zip(results) {
                channel.status = status;
            }
        }
    }
}
