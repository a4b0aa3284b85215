//! Named, versioned cache stores.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use tokio::sync::RwLock;

use super::network::{FetchRequest, FetchResponse};

/// Identity of a cached request: method plus URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    /// Uppercase HTTP method.
    pub method: String,
    /// Absolute URL with the fragment removed.
    pub url: String,
}

impl RequestKey {
    /// Builds a key from a method and URL.
    #[must_use]
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_string(),
            url: url.to_string(),
        }
    }

    /// Builds a GET key for `url`.
    #[must_use]
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }
}

impl From<&FetchRequest> for RequestKey {
    fn from(request: &FetchRequest) -> Self {
        Self::new(&request.method, &request.url)
    }
}

/// A stored response and when it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// The stored response.
    pub response: FetchResponse,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

/// One named cache store.
#[derive(Debug)]
pub struct CacheStore {
    name: String,
    entries: RwLock<HashMap<RequestKey, CachedEntry>>,
}

impl CacheStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store name (the version tag).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stored response for `key`.
    pub async fn get(&self, key: &RequestKey) -> Option<FetchResponse> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.response.clone())
    }

    /// Returns the full entry for `key`.
    pub async fn entry(&self, key: &RequestKey) -> Option<CachedEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Adds or replaces the entry for `key`.
    pub async fn put(&self, key: RequestKey, response: FetchResponse) {
        self.insert(
            key,
            CachedEntry {
                response,
                stored_at: Utc::now(),
            },
        )
        .await;
    }

    pub(crate) async fn insert(&self, key: RequestKey, entry: CachedEntry) {
        self.entries.write().await.insert(key, entry);
    }

    /// Removes the entry for `key`. Returns true if it existed.
    pub async fn delete(&self, key: &RequestKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Sorted keys of all entries.
    pub async fn keys(&self) -> Vec<RequestKey> {
        let mut keys: Vec<_> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// All entries sorted by key.
    pub async fn entries(&self) -> Vec<(RequestKey, CachedEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the store has no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// The set of named cache stores.
///
/// Stores never evict by size or age; they disappear only when deleted by
/// name (version rollover or an explicit clear).
#[derive(Debug, Default)]
pub struct CacheStorage {
    stores: RwLock<BTreeMap<String, Arc<CacheStore>>>,
}

impl CacheStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the store called `name`, creating it if absent.
    pub async fn open(&self, name: &str) -> Arc<CacheStore> {
        if let Some(store) = self.stores.read().await.get(name) {
            return Arc::clone(store);
        }
        let mut stores = self.stores.write().await;
        Arc::clone(
            stores
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(CacheStore::new(name))),
        )
    }

    /// Returns true if a store called `name` exists.
    pub async fn has(&self, name: &str) -> bool {
        self.stores.read().await.contains_key(name)
    }

    /// Sorted names of all stores.
    pub async fn keys(&self) -> Vec<String> {
        self.stores.read().await.keys().cloned().collect()
    }

    /// Deletes the store called `name`. Returns true if it existed.
    pub async fn delete(&self, name: &str) -> bool {
        self.stores.write().await.remove(name).is_some()
    }

    /// Looks `key` up in every store, in name order.
    pub async fn match_request(&self, key: &RequestKey) -> Option<FetchResponse> {
        let stores: Vec<_> = self.stores.read().await.values().cloned().collect();
        for store in stores {
            if let Some(response) = store.get(key).await {
                return Some(response);
            }
        }
        None
    }
}
