//! Configure-then-build lifecycle around a single [`ReadingBuses`] client.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::OnceCell;

use crate::cache::CacheStore;
use crate::client::ReadingBuses;
use crate::config::ClientConfig;
use crate::error::{BusApiError, Result};
use crate::remote::{HttpSource, RemoteSource};

/// Where a [`Registry`] is in its lifecycle. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Defaults untouched, nothing built.
    Unconfigured,
    /// Configuration changed, nothing built.
    Configured,
    /// The client exists; configuration is frozen.
    Built,
}

type Connector<S> = Box<dyn Fn(&ClientConfig) -> Result<S> + Send + Sync>;

#[derive(Debug, Default)]
struct Setup {
    config: ClientConfig,
    configured: bool,
    /// Set from the moment a build takes the configuration until it fails.
    building: bool,
}

fn lock(setup: &Mutex<Setup>) -> MutexGuard<'_, Setup> {
    setup.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears `building` when a build fails or is cancelled.
struct BuildGuard<'a> {
    setup: &'a Mutex<Setup>,
    finished: bool,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.setup).building = false;
        }
    }
}

/// Holds the configuration until the client is built, then the client.
///
/// Create one per application and share it. Setters work until
/// [`Registry::initialise`] starts building and fail with
/// [`BusApiError::MalformedConfig`] while it builds and after it succeeds.
pub struct Registry<S = HttpSource> {
    connector: Connector<S>,
    setup: Mutex<Setup>,
    client: OnceCell<ReadingBuses<S>>,
}

impl Registry<HttpSource> {
    /// A registry that talks to the API over HTTP.
    pub fn new() -> Self {
        Self::with_connector(|config: &ClientConfig| {
            HttpSource::new(config.timeout())
                .map_err(|e| BusApiError::critical(format!("failed to create HTTP client: {e}")))
        })
    }
}

impl Default for Registry<HttpSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RemoteSource + Clone + 'static> Registry<S> {
    /// A registry that reads everything from `source`.
    pub fn with_source(source: S) -> Self {
        Self::with_connector(move |_: &ClientConfig| Ok(source.clone()))
    }
}

impl<S: RemoteSource> Registry<S> {
    /// A registry that creates its source from the final configuration.
    pub fn with_connector(
        connector: impl Fn(&ClientConfig) -> Result<S> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            setup: Mutex::new(Setup::default()),
            client: OnceCell::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Setup> {
        lock(&self.setup)
    }

    /// The lock on the pending configuration, or why it can't change.
    fn unfrozen(&self, action: &str) -> Result<MutexGuard<'_, Setup>> {
        let setup = self.lock();
        if self.client.initialized() {
            return Err(BusApiError::MalformedConfig(format!(
                "can't {action} after the client has been initialised"
            )));
        }
        if setup.building {
            return Err(BusApiError::MalformedConfig(format!(
                "can't {action} while the client is being initialised"
            )));
        }
        Ok(setup)
    }

    pub fn state(&self) -> LifecycleState {
        if self.client.initialized() {
            LifecycleState::Built
        } else if self.lock().configured {
            LifecycleState::Configured
        } else {
            LifecycleState::Unconfigured
        }
    }

    /// A copy of the configuration in effect (or that will be).
    pub fn config(&self) -> ClientConfig {
        match self.client.get() {
            Some(client) => client.config().clone(),
            None => self.lock().config.clone(),
        }
    }

    fn configure(&self, setting: &str, change: impl FnOnce(&mut ClientConfig)) -> Result<()> {
        let mut setup = self.unfrozen(&format!("change {setting}"))?;
        change(&mut setup.config);
        setup.configured = true;
        Ok(())
    }

    /// Replace the whole configuration.
    pub fn set_config(&self, config: ClientConfig) -> Result<()> {
        self.configure("the configuration", |c| *c = config)
    }

    pub fn set_use_cache(&self, enabled: bool) -> Result<()> {
        self.configure("use_cache", |c| c.use_cache = enabled)
    }

    pub fn set_cache_validity_days(&self, days: u32) -> Result<()> {
        self.configure("cache_validity_days", |c| c.cache_validity_days = days)
    }

    pub fn set_archive_cache(&self, enabled: bool) -> Result<()> {
        self.configure("archive_cache", |c| c.archive_cache = enabled)
    }

    pub fn set_print_warnings(&self, enabled: bool) -> Result<()> {
        self.configure("print_warnings", |c| c.print_warnings = enabled)
    }

    pub fn set_print_full_errors(&self, enabled: bool) -> Result<()> {
        self.configure("print_full_errors", |c| c.print_full_errors = enabled)
    }

    pub fn set_timeout_secs(&self, secs: u64) -> Result<()> {
        self.configure("timeout_secs", |c| c.timeout_secs = secs)
    }

    /// Put both cache roots under `dir`.
    pub fn set_cache_dir(&self, dir: impl Into<PathBuf>) -> Result<()> {
        let dir = dir.into();
        self.configure("the cache directory", |c| {
            *c = std::mem::take(c).with_cache_dir(dir)
        })
    }

    pub fn set_base_url(&self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        self.configure("base_url", |c| c.base_url = url)
    }

    /// Delete everything cached on disk. Only allowed before initialising.
    pub async fn invalidate_cache(&self) -> Result<()> {
        let store = CacheStore::from_config(&self.unfrozen("invalidate the cache")?.config);
        store
            .clear()
            .await
            .map_err(|e| BusApiError::critical(format!("failed to clear cache: {e}")))?;
        tracing::info!("Cache invalidated");
        Ok(())
    }

    /// Build the client with `api_key`, or return the one already built.
    ///
    /// Only the first successful call builds; later calls return the same
    /// client whatever key they pass. Concurrent first calls wait for a single
    /// build. A failed build leaves the registry unbuilt, so the call can be
    /// retried.
    pub async fn initialise(&self, api_key: &str) -> Result<&ReadingBuses<S>> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        self.client
            .get_or_try_init(|| async {
                let config = {
                    let mut setup = self.lock();
                    setup.building = true;
                    setup.config.clone()
                };
                let mut guard = BuildGuard {
                    setup: &self.setup,
                    finished: false,
                };

                let source = (self.connector)(&config)?;
                tracing::info!(base_url = %config.base_url, "Building Reading Buses client");
                let client = ReadingBuses::connect(config, api_key, source).await?;
                guard.finished = true;
                Ok(client)
            })
            .await
            .map_err(|e| BusApiError::Setup(Box::new(e)))
    }

    /// The built client.
    pub fn instance(&self) -> Result<&ReadingBuses<S>> {
        self.client.get().ok_or(BusApiError::Uninitialised)
    }
}
