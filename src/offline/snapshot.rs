//! On-disk snapshots of the cache storage.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::network::FetchResponse;
use super::store::{CacheStorage, CachedEntry, RequestKey};
use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    saved_at: DateTime<Utc>,
    #[serde(default)]
    stores: Vec<StoreSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    name: String,
    #[serde(default)]
    entries: Vec<EntrySnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntrySnapshot {
    method: String,
    url: String,
    status: u16,
    stored_at: DateTime<Utc>,
    /// Base64 of the response body.
    body: String,
    #[serde(default)]
    headers: Vec<(String, String)>,
}

impl CacheStorage {
    /// Writes every store to `path` as TOML, atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the file
    /// cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let mut stores = Vec::new();
        for name in self.keys().await {
            let store = self.open(&name).await;
            let entries = store
                .entries()
                .await
                .into_iter()
                .map(|(key, entry)| EntrySnapshot {
                    method: key.method,
                    url: key.url,
                    status: entry.response.status,
                    stored_at: entry.stored_at,
                    body: BASE64.encode(&entry.response.body),
                    headers: entry.response.headers,
                })
                .collect();
            stores.push(StoreSnapshot { name, entries });
        }

        let snapshot = Snapshot {
            saved_at: Utc::now(),
            stores,
        };
        let text = toml::to_string(&snapshot).map_err(|e| Error::Snapshot(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        tokio::fs::write(&tmp_path, text).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        log::debug!("Saved cache snapshot to {}", path.display());
        Ok(())
    }

    /// Reads a snapshot written by [`CacheStorage::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let snapshot: Snapshot =
            toml::from_str(&text).map_err(|e| Error::Snapshot(e.to_string()))?;

        let storage = Self::new();
        for store_snapshot in snapshot.stores {
            let store = storage.open(&store_snapshot.name).await;
            for entry in store_snapshot.entries {
                let body = BASE64
                    .decode(entry.body.as_bytes())
                    .map_err(|e| Error::Snapshot(format!("{}: {e}", entry.url)))?;
                let key = RequestKey {
                    method: entry.method,
                    url: entry.url,
                };
                let cached = CachedEntry {
                    response: FetchResponse {
                        status: entry.status,
                        headers: entry.headers,
                        body: body.into(),
                    },
                    stored_at: entry.stored_at,
                };
                store.insert(key, cached).await;
            }
        }

        log::info!(
            "Loaded cache snapshot from {} (saved {})",
            path.display(),
            snapshot.saved_at
        );
        Ok(storage)
    }

    /// Loads `path` if it exists, otherwise returns empty storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_and_load_preserve_stores() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/cache.toml");

        let storage = CacheStorage::new();
        let key = RequestKey::get(&Url::parse("http://localhost:3000/img/logo.png").unwrap());
        let response = FetchResponse::new(200, vec![0x89, b'P', b'N', b'G', 0, 0xff])
            .with_header("content-type", "image/png");
        storage.open("fort-boyard-v1").await.put(key.clone(), response.clone()).await;
        storage.open("fort-boyard-v0").await;
        storage.save(&path).await.unwrap();

        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = CacheStorage::load(&path).await.unwrap();
        assert_eq!(
            loaded.keys().await,
            vec!["fort-boyard-v0".to_string(), "fort-boyard-v1".to_string()]
        );
        let original = storage.open("fort-boyard-v1").await.entry(&key).await.unwrap();
        let restored = loaded.open("fort-boyard-v1").await.entry(&key).await.unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.response, response);
    }

    #[tokio::test]
    async fn load_or_default_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::load_or_default(&dir.path().join("missing.toml"))
            .await
            .unwrap();
        assert!(storage.keys().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.toml");
        std::fs::write(&path, "stores = 42").unwrap();

        assert!(matches!(
            CacheStorage::load(&path).await,
            Err(Error::Snapshot(_))
        ));
    }
}
