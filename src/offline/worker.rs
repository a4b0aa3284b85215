//! Offline cache worker: warm install, version rollover, stale-while-revalidate.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;

use super::network::{Destination, FetchRequest, FetchResponse, Network};
use super::store::{CacheStorage, CacheStore, RequestKey};
use crate::config::OfflineConfig;
use crate::error::{Error, Result};

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, install not started.
    Parsed,
    /// Warm cache being populated.
    Installing,
    /// Installed and waiting to activate.
    Installed,
    /// Removing old cache stores.
    Activating,
    /// Controlling clients and intercepting fetches.
    Activated,
    /// Replaced or shut down; no longer intercepts fetches.
    Redundant,
}

/// Where a response handed to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from the cache store.
    Cache,
    /// Fetched from the network.
    Network,
    /// Offline fallback document after a failed navigation.
    Fallback,
}

impl ResponseSource {
    /// Lowercase name, used in the proxy's `X-Cache-Source` header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response together with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResponse {
    /// Where the response came from.
    pub source: ResponseSource,
    /// The response itself.
    pub response: FetchResponse,
}

/// Outcome of the install-time warm-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Paths stored in the cache.
    pub cached: Vec<String>,
    /// Paths that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    /// Returns true if every listed path was cached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Control messages sent by the owning page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate immediately instead of waiting.
    SkipWaiting,
    /// Delete the current cache store.
    ClearCache,
}

impl ControlMessage {
    /// Parses a JSON message such as `{"type":"CLEAR_CACHE"}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Message`] for malformed JSON or an unknown type.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// The offline cache worker.
///
/// The hosting environment drives the lifecycle: [`install`](Self::install),
/// then [`activate`](Self::activate), then [`fetch`](Self::fetch) for every
/// intercepted request. A worker that skips waiting activates itself at the
/// end of install.
pub struct OfflineWorker {
    config: OfflineConfig,
    origin: Url,
    storage: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    refreshes: TaskTracker,
}

impl OfflineWorker {
    /// Creates a worker over `storage` and `network`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the configured origin is not a URL.
    pub fn new(
        config: OfflineConfig,
        storage: Arc<CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Result<Self> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self {
            config,
            origin,
            storage,
            network,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            refreshes: TaskTracker::new(),
        })
    }

    /// Worker configuration.
    #[must_use]
    pub const fn config(&self) -> &OfflineConfig {
        &self.config
    }

    /// Origin that relative paths resolve against.
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Shared cache storage.
    #[must_use]
    pub const fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Returns true once activation has claimed open pages.
    #[must_use]
    pub fn controls_clients(&self) -> bool {
        self.clients_claimed.load(Ordering::Acquire)
    }

    /// Returns true if the worker will skip the waiting state.
    #[must_use]
    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    /// Resolves a site path such as `/style.css` against the origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the path cannot be joined.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    async fn current_store(&self) -> Arc<CacheStore> {
        self.storage.open(&self.config.version).await
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    /// Opens the current store and fills it with the warm list.
    ///
    /// Individual failures are logged and reported but do not fail the
    /// install: the warm cache is best-effort. When skip-waiting was
    /// requested, by configuration or by a message received mid-install,
    /// the worker goes on to activate.
    pub async fn install(&self) -> InstallReport {
        self.set_state(WorkerState::Installing).await;
        log::info!("Installing offline cache {}", self.config.version);
        if self.config.skip_waiting_on_install {
            self.skip_waiting.store(true, Ordering::Release);
        }

        let store = self.current_store().await;
        let store = &store;
        let results = join_all(self.config.precache.iter().map(|path| async move {
            (path.clone(), self.warm(store, path).await)
        }))
        .await;

        let mut report = InstallReport::default();
        for (path, result) in results {
            match result {
                Ok(()) => report.cached.push(path),
                Err(reason) => {
                    log::warn!("Failed to cache {path}: {reason}");
                    report.failed.push((path, reason));
                }
            }
        }

        log::info!(
            "Cached {}/{} files into {}",
            report.cached.len(),
            self.config.precache.len(),
            self.config.version
        );

        self.set_state(WorkerState::Installed).await;
        if self.skips_waiting() {
            self.activate().await;
        } else {
            log::info!("Offline cache {} installed, waiting", self.config.version);
        }
        report
    }

    async fn warm(&self, store: &CacheStore, path: &str) -> std::result::Result<(), String> {
        let url = self.url_for(path).map_err(|e| e.to_string())?;
        let request = FetchRequest::get(url);
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| e.to_string())?;
        if response.status != 200 {
            return Err(format!("status {}", response.status));
        }
        store.put(RequestKey::from(&request), response).await;
        Ok(())
    }

    /// Deletes every store not named by the current version tag and claims
    /// open pages. Returns the deleted store names.
    pub async fn activate(&self) -> Vec<String> {
        self.set_state(WorkerState::Activating).await;
        log::info!("Activating offline cache {}", self.config.version);

        let mut deleted = Vec::new();
        for name in self.storage.keys().await {
            if name != self.config.version && self.storage.delete(&name).await {
                log::info!("Deleted old cache {name}");
                deleted.push(name);
            }
        }

        self.clients_claimed.store(true, Ordering::Release);
        self.set_state(WorkerState::Activated).await;
        deleted
    }

    /// Answers an intercepted request.
    ///
    /// Before activation, and for non-GET or non-http(s) requests, the
    /// request goes straight to the network and nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns the network error when there is no cached copy and no
    /// offline fallback applies.
    pub async fn fetch(&self, request: FetchRequest) -> Result<WorkerResponse> {
        if self.state().await != WorkerState::Activated || !request.is_cacheable() {
            let response = self.network.fetch(&request).await?;
            return Ok(WorkerResponse {
                source: ResponseSource::Network,
                response,
            });
        }

        let key = RequestKey::from(&request);
        if let Some(cached) = self.storage.match_request(&key).await {
            log::debug!("Cache hit: {}", key.url);
            let store = self.current_store().await;
            self.revalidate(store, request, key);
            return Ok(WorkerResponse {
                source: ResponseSource::Cache,
                response: cached,
            });
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.current_store().await.put(key, response.clone()).await;
                }
                Ok(WorkerResponse {
                    source: ResponseSource::Network,
                    response,
                })
            }
            Err(e) => {
                if request.destination == Destination::Document
                    && let Some(fallback) = self.offline_fallback().await
                {
                    log::info!("Offline, serving fallback for {}", key.url);
                    return Ok(WorkerResponse {
                        source: ResponseSource::Fallback,
                        response: fallback,
                    });
                }
                Err(e)
            }
        }
    }

    async fn offline_fallback(&self) -> Option<FetchResponse> {
        let url = self.url_for(&self.config.offline_fallback).ok()?;
        self.storage.match_request(&RequestKey::get(&url)).await
    }

    /// Refreshes a cached entry in the background. Failures leave the stale
    /// entry in place.
    ///
    /// The refresh writes into `store` as it was at the time of the hit; if
    /// the store is deleted meanwhile the write lands in a detached store.
    fn revalidate(&self, store: Arc<CacheStore>, request: FetchRequest, key: RequestKey) {
        let network = Arc::clone(&self.network);

        self.refreshes.spawn(async move {
            match network.fetch(&request).await {
                Ok(fresh) if fresh.status == 200 => {
                    store.put(key, fresh).await;
                }
                Ok(fresh) => {
                    log::debug!("Background refresh of {} returned {}", key.url, fresh.status);
                }
                Err(e) => log::debug!("Background refresh of {} failed: {e}", key.url),
            }
        });
    }

    /// Marks the worker as replaced. It stops controlling pages and every
    /// later fetch goes straight to the network.
    pub async fn retire(&self) {
        self.clients_claimed.store(false, Ordering::Release);
        self.set_state(WorkerState::Redundant).await;
        log::info!("Offline cache worker {} is redundant", self.config.version);
    }

    /// Waits until every background refresh started so far has finished.
    pub async fn settle(&self) {
        self.refreshes.close();
        self.refreshes.wait().await;
        self.refreshes.reopen();
    }

    /// Applies a control message from the owning page.
    pub async fn handle_message(&self, message: ControlMessage) {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::Release);
                if self.state().await == WorkerState::Installed {
                    self.activate().await;
                }
            }
            ControlMessage::ClearCache => {
                self.storage.delete(&self.config.version).await;
                log::info!("Cleared cache {}", self.config.version);
            }
        }
    }

    /// Parses and applies a raw JSON message. Malformed or unknown messages are ignored.
    pub async fn handle_raw_message(&self, raw: &[u8]) {
        match ControlMessage::parse(raw) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => log::debug!("Ignoring message: {e}"),
        }
    }
}
