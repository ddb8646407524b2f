use mayotv::config::ClientConfig;
use mayotv::fetcher::{PlaylistFetcher, NETWORK_PROGRESS_END, NETWORK_PROGRESS_START};
use mayotv::proxy::{ProxyEndpoint, ProxySelector, ProxyStyle};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const BODY: &str = "#EXTM3U\n#EXTINF:-1 group-title=\"France\",TF1\nhttp://stream.example/tf1\n";

/// Serves `BODY` with a content-length so the fetcher can report
/// fractional progress.
async fn spawn_playlist_server() -> String {
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
                    "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    BODY.len(),
                    BODY
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    format!("http://{addr}/")
}

fn test_config() -> ClientConfig {
    ClientConfig {
        playlist_url: "http://upstream.example/index.m3u".to_string(),
        fetch_timeout_secs: 5,
        retry_delay_ms: 10,
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn fetch_returns_playlist_text() {
    let server = spawn_playlist_server().await;
    let proxies = Arc::new(ProxySelector::new(vec![ProxyEndpoint::new(
        server,
        ProxyStyle::PathRaw,
    )]));
    let fetcher = PlaylistFetcher::new(&test_config(), proxies);

    let text = fetcher.fetch().await.expect("fetch");
    assert_eq!(text, BODY);
}

#[tokio::test]
async fn fetch_retries_across_proxies_and_marks_failures() {
    let server = spawn_playlist_server().await;
    let proxies = Arc::new(ProxySelector::new(vec![
        // Dead relay first: connection refused.
        ProxyEndpoint::new("http://127.0.0.1:9/", ProxyStyle::PathRaw),
        ProxyEndpoint::new(server, ProxyStyle::PathRaw),
    ]));
    let fetcher = PlaylistFetcher::new(&test_config(), proxies.clone());

    let text = fetcher.fetch().await.expect("fetch via fallback relay");
    assert_eq!(text, BODY);
    assert!(proxies.is_marked_failed(0));
    assert!(!proxies.is_marked_failed(1));
}

#[tokio::test]
async fn progress_stays_within_network_subrange() {
    let server = spawn_playlist_server().await;
    let proxies = Arc::new(ProxySelector::new(vec![ProxyEndpoint::new(
        server,
        ProxyStyle::PathRaw,
    )]));
    let fetcher = PlaylistFetcher::new(&test_config(), proxies);

    let mut seen = Vec::new();
    let text = fetcher
        .fetch_with_progress(|progress, _message| seen.push(progress))
        .await
        .expect("fetch");
    assert_eq!(text, BODY);
    assert!(!seen.is_empty(), "content-length was sent, expected progress");
    assert!(seen
        .iter()
        .all(|p| (NETWORK_PROGRESS_START..=NETWORK_PROGRESS_END).contains(p)));
    // Ends at the top of the network sub-range once all bytes arrived.
    assert_eq!(*seen.last().unwrap(), NETWORK_PROGRESS_END);
}

#[tokio::test]
async fn all_attempts_failing_surfaces_aggregate_error() {
    let proxies = Arc::new(ProxySelector::new(vec![ProxyEndpoint::new(
        "http://127.0.0.1:9/",
        ProxyStyle::PathRaw,
    )]));
    let fetcher = PlaylistFetcher::new(&test_config(), proxies);

    let err = fetcher.fetch().await.expect_err("no relay can work");
    match err {
        mayotv::errors::FetchError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Exhausted, got {other:?}"),
    }
}
