//! The cache-or-fetch decision procedure.

use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::remote::{RemoteSource, classify_fetch, classify_payload};

use super::key::CacheKey;
use super::store::CacheStore;
use super::CachePolicy;

/// Failure to turn a remote payload into a value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Wire decoder for plain JSON payloads.
pub fn json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// What a cache read found.
enum Lookup<T> {
    Hit(T),
    Miss,
    Corrupt(String),
}

/// Serves values from the disk cache when fresh, otherwise from the remote
/// source, writing what it fetched back to disk.
///
/// Entries hold the serde_json form of the decoded value, not the raw
/// response. Two concurrent misses for one key both fetch and both write;
/// each write is atomic and the last one wins.
#[derive(Debug)]
pub struct ReadThroughCache<S> {
    store: CacheStore,
    source: S,
    diagnostics: Diagnostics,
}

impl<S: RemoteSource> ReadThroughCache<S> {
    pub fn new(store: CacheStore, source: S, diagnostics: Diagnostics) -> Self {
        Self {
            store,
            source,
            diagnostics,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// The value for `key`, from disk if a fresh entry exists, otherwise from
    /// `url` through `decode`.
    ///
    /// An entry that can't be read back is deleted and fetched again once.
    pub async fn get_or_fetch<T, F>(
        &self,
        key: &CacheKey,
        url: &str,
        policy: CachePolicy,
        decode: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&[u8]) -> Result<T, DecodeError>,
    {
        if !policy.enabled {
            return self.fetch_decoded(url, decode).await;
        }

        let path = self.store.location_for(key);
        match self.lookup(&path, policy).await {
            Lookup::Hit(value) => {
                tracing::debug!(path = %path.display(), "Cache hit");
                return Ok(value);
            }
            Lookup::Miss => {
                tracing::debug!(path = %path.display(), "Cache miss");
            }
            Lookup::Corrupt(reason) => {
                self.diagnostics.warn(format_args!(
                    "Cache entry {} is unreadable ({reason}); deleting it and fetching again",
                    path.display()
                ));
                if let Err(e) = self.store.delete(&path).await {
                    self.diagnostics.warn(format_args!(
                        "Failed to delete cache entry {}: {e}",
                        path.display()
                    ));
                }
            }
        }

        let value = self.fetch_decoded(url, decode).await?;
        self.persist(&path, &value).await;
        Ok(value)
    }

    /// Fetch and decode without touching the cache.
    pub async fn fetch_decoded<T, F>(&self, url: &str, decode: F) -> Result<T>
    where
        F: FnOnce(&[u8]) -> Result<T, DecodeError>,
    {
        let bytes = self.fetch_bytes(url).await?;
        decode(&bytes).map_err(|e| self.diagnostics.report(classify_payload(&bytes, e)))
    }

    /// The raw payload at `url`.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(resource = resource_name(url), "Fetching from API");
        self.source
            .fetch(url)
            .await
            .map_err(|e| self.diagnostics.report(classify_fetch(e)))
    }

    async fn lookup<T: DeserializeOwned>(&self, path: &Path, policy: CachePolicy) -> Lookup<T> {
        if !self.store.exists(path).await {
            return Lookup::Miss;
        }

        match self.store.age(path, SystemTime::now()).await {
            Ok(age) if policy.is_expired(age) => {
                self.diagnostics.warn(format_args!(
                    "Cache entry {} has expired; fetching a fresh copy",
                    path.display()
                ));
                return Lookup::Miss;
            }
            Ok(_) => {}
            Err(e) => return Lookup::Corrupt(e.to_string()),
        }

        match self.store.read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Lookup::Hit(value),
                Err(e) => Lookup::Corrupt(e.to_string()),
            },
            Err(e) => Lookup::Corrupt(e.to_string()),
        }
    }

    /// Write failures never fail the query.
    async fn persist<T: Serialize>(&self, path: &Path, value: &T) {
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.diagnostics
                    .warn(format_args!("Failed to serialize cache entry {}: {e}", path.display()));
                return;
            }
        };
        if let Err(e) = self.store.write(path, &payload).await {
            self.diagnostics
                .warn(format_args!("Failed to write cache entry {}: {e}", path.display()));
        }
    }
}

/// The URL without its query string, so API keys stay out of the logs.
fn resource_name(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use tempfile::tempdir;

    use super::*;
    use crate::diagnostics::capture::capture_logs;
    use crate::error::BusApiError;
    use crate::remote::MockSource;

    const URL: &str = "http://api/lines?api_token=k";

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Line {
        route_code: String,
    }

    fn cache(dir: &Path, source: MockSource) -> ReadThroughCache<MockSource> {
        let store = CacheStore::new(dir.join("cache"), dir.join("cache-archive"));
        ReadThroughCache::new(store, source, Diagnostics::default())
    }

    fn policy() -> CachePolicy {
        CachePolicy::expiring(true, Duration::from_secs(7 * 86_400))
    }

    #[tokio::test]
    async fn second_read_comes_from_disk() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source.respond(URL, r#"[{"route_code":"17"}]"#);
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();

        let first: Vec<Line> = cache.get_or_fetch(&key, URL, policy(), json).await.unwrap();
        let second: Vec<Line> = cache.get_or_fetch(&key, URL, policy(), json).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].route_code, "17");
        assert_eq!(source.fetch_count(URL), 1);
        assert!(cache.store().exists(&cache.store().location_for(&key)).await);
    }

    #[tokio::test]
    async fn disabled_policy_always_fetches_and_never_writes() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source.respond(URL, r#"[]"#);
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();
        let off = CachePolicy::bypass();

        let _: Vec<Line> = cache.get_or_fetch(&key, URL, off, json).await.unwrap();
        let _: Vec<Line> = cache.get_or_fetch(&key, URL, off, json).await.unwrap();

        assert_eq!(source.fetch_count(URL), 2);
        assert!(!cache.store().exists(&cache.store().location_for(&key)).await);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched_once() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source
            .respond(URL, r#"[{"route_code":"1"}]"#)
            .respond(URL, r#"[{"route_code":"2"}]"#);
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();
        let path = cache.store().location_for(&key);

        let fresh = CachePolicy::expiring(true, Duration::from_secs(3600));
        let _: Vec<Line> = cache.get_or_fetch(&key, URL, fresh, json).await.unwrap();
        let first_age = cache.store().age(&path, SystemTime::now()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let zero_days = CachePolicy::expiring(true, Duration::ZERO);
        let value: Vec<Line> = cache.get_or_fetch(&key, URL, zero_days, json).await.unwrap();
        assert_eq!(value[0].route_code, "2");
        assert_eq!(source.fetch_count(URL), 2);

        // rewritten entry is fresh again
        let age = cache.store().age(&path, SystemTime::now()).await.unwrap();
        assert!(age < first_age + Duration::from_millis(50));
        let again: Vec<Line> = cache.get_or_fetch(&key, URL, fresh, json).await.unwrap();
        assert_eq!(again[0].route_code, "2");
        assert_eq!(source.fetch_count(URL), 2);
    }

    #[tokio::test]
    async fn permanent_entry_never_expires() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source.respond(URL, r#"[]"#);
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();

        let _: Vec<Line> = cache
            .get_or_fetch(&key, URL, CachePolicy::permanent(true), json)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _: Vec<Line> = cache
            .get_or_fetch(&key, URL, CachePolicy::permanent(true), json)
            .await
            .unwrap();

        assert_eq!(source.fetch_count(URL), 1);
    }

    #[tokio::test]
    async fn corrupt_entry_is_deleted_warned_and_refetched() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source.respond(URL, r#"[{"route_code":"17"}]"#);
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();
        let path = cache.store().location_for(&key);
        cache.store().write(&path, b"{not json").await.unwrap();

        let (logs, _guard) = capture_logs();
        let value: Vec<Line> = cache.get_or_fetch(&key, URL, policy(), json).await.unwrap();

        assert_eq!(value[0].route_code, "17");
        assert_eq!(source.fetch_count(URL), 1);
        assert_eq!(logs.count("WARN"), 1);

        // the retry persisted the fresh value
        let stored: Vec<Line> = serde_json::from_slice(&cache.store().read(&path).await.unwrap()).unwrap();
        assert_eq!(stored, value);
    }

    #[tokio::test]
    async fn schema_drift_counts_as_corruption() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source.respond(URL, r#"[{"route_code":"17"}]"#);
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();
        let path = cache.store().location_for(&key);
        cache.store().write(&path, br#"[{"other":1}]"#).await.unwrap();

        let value: Vec<Line> = cache.get_or_fetch(&key, URL, policy(), json).await.unwrap();
        assert_eq!(value.len(), 1);
        assert_eq!(source.fetch_count(URL), 1);
    }

    #[tokio::test]
    async fn corrupt_entry_and_garbage_remote_is_critical() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source.respond(URL, "<html>gateway</html>");
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();
        let path = cache.store().location_for(&key);
        cache.store().write(&path, b"garbage").await.unwrap();

        let result: Result<Vec<Line>> = cache.get_or_fetch(&key, URL, policy(), json).await;
        assert!(result.unwrap_err().is_critical());
        assert_eq!(source.fetch_count(URL), 1);
        assert!(!cache.store().exists(&path).await);
    }

    #[tokio::test]
    async fn structured_error_is_bad_query_and_not_cached() {
        let dir = tempdir().unwrap();
        let source = MockSource::new();
        source.respond(URL, r#"{"status":false,"code":401,"message":"Invalid api token"}"#);
        let cache = cache(dir.path(), source.clone());
        let key = CacheKey::services();

        let result: Result<Vec<Line>> = cache.get_or_fetch(&key, URL, policy(), json).await;
        assert!(matches!(result, Err(BusApiError::BadQuery { code: Some(401), .. })));
        assert!(!cache.store().exists(&cache.store().location_for(&key)).await);
    }

    #[tokio::test]
    async fn transport_failure_is_critical() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path(), MockSource::new());

        let result: Result<Vec<Line>> = cache
            .get_or_fetch(&CacheKey::services(), URL, policy(), json)
            .await;
        assert!(result.unwrap_err().is_critical());
    }

    #[test]
    fn resource_name_drops_query() {
        assert_eq!(resource_name(URL), "http://api/lines");
        assert_eq!(resource_name("http://api/x"), "http://api/x");
    }
}
