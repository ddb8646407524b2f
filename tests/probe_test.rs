use mayotv::channel::ChannelStatus;
use mayotv::config::ClientConfig;
use mayotv::parser::parse_channels;
use mayotv::prober::ChannelProber;
use mayotv::proxy::{ProxyEndpoint, ProxySelector, ProxyStyle};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal HTTP endpoint answering every request with a fixed status.
async fn spawn_relay(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    format!("http://{addr}/")
}

fn config_with_probe_timeout(secs: u64) -> ClientConfig {
    ClientConfig {
        probe_timeout_secs: secs,
        probe_batch_pause_ms: 10,
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn reachable_stream_probes_working() {
    let relay = spawn_relay("200 OK").await;
    let proxies = Arc::new(ProxySelector::new(vec![ProxyEndpoint::new(
        relay,
        ProxyStyle::PathRaw,
    )]));
    let prober = ChannelProber::new(&config_with_probe_timeout(5), proxies.clone());

    let status = prober.probe_url("http://upstream.example/stream.m3u8").await;
    assert_eq!(status, ChannelStatus::Working);
    assert!(!proxies.is_marked_failed(0));
}

#[tokio::test]
async fn http_500_probes_error_and_marks_relay_failed() {
    let relay = spawn_relay("500 Internal Server Error").await;
    let proxies = Arc::new(ProxySelector::new(vec![ProxyEndpoint::new(
        relay,
        ProxyStyle::PathRaw,
    )]));
    let prober = ChannelProber::new(&config_with_probe_timeout(5), proxies.clone());

    let status = prober.probe_url("http://upstream.example/stream.m3u8").await;
    assert_eq!(status, ChannelStatus::Error);
    assert!(proxies.is_marked_failed(0));
}

#[tokio::test]
async fn unreachable_relay_probes_error() {
    // Nothing listens on port 9; connection is refused immediately.
    let proxies = Arc::new(ProxySelector::new(vec![ProxyEndpoint::new(
        "http://127.0.0.1:9/",
        ProxyStyle::PathRaw,
    )]));
    let prober = ChannelProber::new(&config_with_probe_timeout(5), proxies.clone());

    let status = prober.probe_url("http://upstream.example/stream.m3u8").await;
    assert_eq!(status, ChannelStatus::Error);
    assert!(proxies.is_marked_failed(0));
}

#[tokio::test]
async fn probe_all_updates_every_status_in_batches() {
    let relay = spawn_relay("200 OK").await;
    let proxies = Arc::new(ProxySelector::new(vec![ProxyEndpoint::new(
        relay,
        ProxyStyle::PathRaw,
    )]));
    let prober = ChannelProber::new(&config_with_probe_timeout(5), proxies);

    let mut text = String::new();
    for i in 0..12 {
        text.push_str(&format!(
            "#EXTINF:-1 group-title=\"France\",Chaîne {i}\nhttp://upstream.example/{i}\n"
        ));
    }
    let mut channels = parse_channels(&text);
    assert!(channels
        .iter()
        .all(|c| c.status == ChannelStatus::Unknown));

    prober.probe_all(&mut channels).await;
    assert!(channels
        .iter()
        .all(|c| c.status == ChannelStatus::Working));
}
