use mayotv::cache::{ChannelCache, MemoryStorage, Storage};
use mayotv::parser::parse;
use std::sync::Arc;
use std::time::Duration;

const PLAYLIST: &str = "\
#EXTINF:-1 group-title=\"France\",TF1
http://stream.example/tf1
#EXTINF:-1 group-title=\"Spain\",TVE
http://stream.example/tve
";

fn storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

#[test]
fn read_after_write_returns_same_collection() {
    let storage = storage();
    let cache = ChannelCache::new(storage.clone(), Duration::from_secs(30 * 60));
    let organized = parse(PLAYLIST);

    cache.write(&organized);
    assert!(cache.is_valid());
    assert_eq!(cache.read(), Some(organized));
}

#[test]
fn expired_cache_reads_none_and_purges() {
    let storage = storage();
    let cache = ChannelCache::new(storage.clone(), Duration::ZERO);
    cache.write(&parse(PLAYLIST));

    // Let the zero-length horizon pass.
    std::thread::sleep(Duration::from_millis(10));
    assert!(!cache.is_valid());
    assert_eq!(cache.read(), None);
    assert!(storage.is_empty());
}

#[test]
fn missing_expiry_marker_is_a_miss() {
    let storage = storage();
    storage
        .set("mayo-tv-channels", "{\"data\":[],\"timestamp\":0}")
        .unwrap();
    let cache = ChannelCache::new(storage.clone(), Duration::from_secs(60));
    assert_eq!(cache.read(), None);
    assert!(storage.is_empty());
}

#[test]
fn corrupt_payload_degrades_to_miss_and_purges() {
    let storage = storage();
    let far_future = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
        + 60_000;
    storage.set("mayo-tv-channels", "not json at all").unwrap();
    storage
        .set("mayo-tv-channels-expiry", &far_future.to_string())
        .unwrap();

    let cache = ChannelCache::new(storage.clone(), Duration::from_secs(60));
    assert_eq!(cache.read(), None);
    assert!(storage.is_empty());
}

#[test]
fn clear_removes_both_keys() {
    let storage = storage();
    let cache = ChannelCache::new(storage.clone(), Duration::from_secs(60));
    cache.write(&parse(PLAYLIST));
    assert_eq!(storage.len(), 2);
    cache.clear();
    assert!(storage.is_empty());
    assert!(!cache.is_valid());
}

#[test]
fn write_replaces_previous_content_wholesale() {
    let storage = storage();
    let cache = ChannelCache::new(storage.clone(), Duration::from_secs(60));
    cache.write(&parse(PLAYLIST));

    let smaller = parse("#EXTINF:-1 group-title=\"France\",TF1\nhttp://stream.example/tf1\n");
    cache.write(&smaller);
    assert_eq!(cache.read(), Some(smaller));
}
