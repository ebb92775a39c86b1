//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CachePolicy;

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://reading-opendata.r2p.com/api/v1/";

/// Configuration for the Reading Buses client.
///
/// Only changeable before the index is built; see [`crate::Registry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Read and write cached responses on disk.
    pub use_cache: bool,

    /// Days a cached service or stop list stays valid.
    pub cache_validity_days: u32,

    /// Cache tracking history for past dates (never expires).
    pub archive_cache: bool,

    /// Emit warnings (expired or corrupt cache, unknown services).
    pub print_warnings: bool,

    /// Log the full cause of critical errors.
    pub print_full_errors: bool,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Directory for service, stop and line-pattern data.
    pub cache_root: PathBuf,

    /// Directory for timetable and tracking-history data.
    pub archive_root: PathBuf,

    /// Base URL for the API.
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_validity_days: 7,
            archive_cache: true,
            print_warnings: true,
            print_full_errors: false,
            timeout_secs: 30,
            cache_root: PathBuf::from("cache"),
            archive_root: PathBuf::from("cache-archive"),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Turn disk caching on or off.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Set how many days reference data stays cached.
    pub fn with_cache_validity_days(mut self, days: u32) -> Self {
        self.cache_validity_days = days;
        self
    }

    /// Turn caching of past tracking history on or off.
    pub fn with_archive_cache(mut self, enabled: bool) -> Self {
        self.archive_cache = enabled;
        self
    }

    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.print_warnings = enabled;
        self
    }

    pub fn with_full_errors(mut self, enabled: bool) -> Self {
        self.print_full_errors = enabled;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Put both cache roots under `dir` (as `dir/cache` and `dir/cache-archive`).
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.cache_root = dir.join("cache");
        self.archive_root = dir.join("cache-archive");
        self
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// How long reference data stays valid.
    pub fn cache_validity(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_validity_days) * 24 * 60 * 60)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Policy for services, stops and line patterns.
    pub fn reference_policy(&self) -> CachePolicy {
        CachePolicy::expiring(self.use_cache, self.cache_validity())
    }

    /// Policy for scheduled timetables; they can change, so they expire like reference data.
    pub fn timetable_policy(&self) -> CachePolicy {
        self.reference_policy()
    }

    /// Policy for tracking history of a day that has finished.
    pub fn archive_policy(&self) -> CachePolicy {
        CachePolicy::permanent(self.use_cache && self.archive_cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();

        assert!(config.use_cache);
        assert_eq!(config.cache_validity_days, 7);
        assert!(config.archive_cache);
        assert!(config.print_warnings);
        assert!(!config.print_full_errors);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.cache_root, PathBuf::from("cache"));
        assert_eq!(config.archive_root, PathBuf::from("cache-archive"));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder() {
        let config = ClientConfig::default()
            .with_cache(false)
            .with_cache_validity_days(1)
            .with_archive_cache(false)
            .with_warnings(false)
            .with_full_errors(true)
            .with_timeout(5)
            .with_cache_dir("/tmp/rb")
            .with_base_url("http://localhost:8080/");

        assert!(!config.use_cache);
        assert_eq!(config.cache_validity(), Duration::from_secs(86_400));
        assert!(!config.archive_cache);
        assert!(!config.print_warnings);
        assert!(config.print_full_errors);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_root, PathBuf::from("/tmp/rb/cache"));
        assert_eq!(config.archive_root, PathBuf::from("/tmp/rb/cache-archive"));
        assert_eq!(config.base_url, "http://localhost:8080/");
    }

    #[test]
    fn policies_follow_flags() {
        let config = ClientConfig::default();
        assert!(config.reference_policy().enabled);
        assert_eq!(
            config.reference_policy().max_age,
            Some(Duration::from_secs(7 * 86_400))
        );
        assert_eq!(config.archive_policy().max_age, None);

        let config = ClientConfig::default().with_archive_cache(false);
        assert!(config.reference_policy().enabled);
        assert!(!config.archive_policy().enabled);

        let config = ClientConfig::default().with_cache(false);
        assert!(!config.reference_policy().enabled);
        assert!(!config.archive_policy().enabled);
    }
}
