//! Configuration for the asset server and the offline cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Asset server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory servable files are resolved from.
    pub root: PathBuf,
    /// Bind address.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Document served for `/`.
    pub default_document: String,
    /// Extra extension → content type mappings layered over the built-in table.
    pub content_types: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            host: "0.0.0.0".to_string(),
            port: 3000,
            default_document: "index.html".to_string(),
            content_types: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the content root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the listening port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the document served for `/`.
    #[must_use]
    pub fn with_default_document(mut self, name: impl Into<String>) -> Self {
        self.default_document = name.into();
        self
    }

    /// Adds or overrides a content type for an extension.
    #[must_use]
    pub fn with_content_type(mut self, ext: impl Into<String>, mime: impl Into<String>) -> Self {
        self.content_types.insert(ext.into(), mime.into());
        self
    }

    /// Returns the `host:port` string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Offline cache worker and proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Version tag naming the current cache store.
    pub version: String,
    /// Origin the worker fetches from.
    pub origin: String,
    /// Proxy bind address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Paths fetched into the cache at install time.
    pub precache: Vec<String>,
    /// Document returned for failed navigations.
    pub offline_fallback: String,
    /// Whether install skips the waiting state.
    pub skip_waiting_on_install: bool,
    /// Largest request body the proxy accepts, in bytes.
    pub max_body_bytes: usize,
    /// Where the cache storage snapshot lives. `None` uses the user cache dir.
    pub snapshot: Option<PathBuf>,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            version: "fort-boyard-v1".to_string(),
            origin: "http://localhost:3000".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            precache: [
                "/",
                "/index.html",
                "/style.css",
                "/script.js",
                "/birthday.html",
                "/corporate.html",
                "/class-trip.html",
                "/graduation.html",
                "/contacts.html",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            offline_fallback: "/index.html".to_string(),
            skip_waiting_on_install: true,
            max_body_bytes: 8 * 1024 * 1024,
            snapshot: None,
        }
    }
}

impl OfflineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the version tag.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the origin fetched from.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets the proxy port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replaces the install-time warm list.
    #[must_use]
    pub fn with_precache<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the proxy's request body limit.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Sets where the cache snapshot is stored.
    #[must_use]
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    /// Returns the `host:port` string the proxy binds.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the snapshot path, falling back to `$XDG_CACHE_HOME/fort-serve`.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fort-serve")
                .join("cache-storage.toml")
        })
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Asset server settings.
    pub server: ServerConfig,
    /// Offline cache settings.
    pub offline: OfflineConfig,
}

impl AppConfig {
    /// Parses configuration from TOML text. Missing sections use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration from `path`, or returns the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_toml_str(&text)?;
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.default_document, "index.html");
        assert!(config.content_types.is_empty());
    }

    #[test]
    fn server_config_builder_pattern() {
        let config = ServerConfig::new()
            .with_root("/srv/site")
            .with_host("127.0.0.1")
            .with_port(8080)
            .with_default_document("home.html")
            .with_content_type("webp", "image/webp");

        assert_eq!(config.root, PathBuf::from("/srv/site"));
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.default_document, "home.html");
        assert_eq!(config.content_types["webp"], "image/webp");
    }

    #[test]
    fn default_offline_config() {
        let config = OfflineConfig::default();
        assert_eq!(config.version, "fort-boyard-v1");
        assert_eq!(config.bind_addr(), "127.0.0.1:3001");
        assert_eq!(config.precache.len(), 9);
        assert_eq!(config.precache[0], "/");
        assert_eq!(config.offline_fallback, "/index.html");
        assert!(config.skip_waiting_on_install);
        assert_eq!(config.max_body_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn snapshot_path_prefers_explicit() {
        let config = OfflineConfig::new().with_snapshot("/tmp/snap.toml");
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/snap.toml"));

        let config = OfflineConfig::new();
        assert!(config.snapshot_path().to_string_lossy().contains("fort-serve"));
    }

    #[test]
    fn parses_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 8080

            [server.content_types]
            webp = "image/webp"

            [offline]
            version = "fort-boyard-v2"
            precache = ["/", "/style.css"]
            skip_waiting_on_install = false
            max_body_bytes = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.content_types["webp"], "image/webp");
        assert_eq!(config.offline.version, "fort-boyard-v2");
        assert_eq!(config.offline.precache, vec!["/", "/style.css"]);
        assert_eq!(config.offline.origin, "http://localhost:3000");
        assert!(!config.offline.skip_waiting_on_install);
        assert_eq!(config.offline.max_body_bytes, 1024);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(matches!(
            AppConfig::from_toml_str("[server]\nport = \"three thousand\""),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn load_without_path_is_default() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fort-serve.toml");
        std::fs::write(&path, "[server]\nroot = \"public\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.root, PathBuf::from("public"));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    #[test]
    fn config_serializes_to_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized = AppConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }
}
