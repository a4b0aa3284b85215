//! Browser-side worker script.
//!
//! Renders the `sw.js` a page registers to get the same offline policy the
//! Rust worker implements: warm install, version rollover on activate,
//! stale-while-revalidate for GETs, and the two control messages.

use crate::config::OfflineConfig;

/// Renders the worker script for `config`.
#[must_use]
pub fn worker_script(config: &OfflineConfig) -> String {
    let version = serde_json::Value::from(config.version.as_str());
    let precache = serde_json::Value::from(config.precache.clone());
    let fallback = serde_json::Value::from(config.offline_fallback.as_str());
    let skip_waiting = if config.skip_waiting_on_install {
        "\n  self.skipWaiting();"
    } else {
        ""
    };

    format!(
        r##"// Offline cache worker
const CACHE_NAME = {version};
const PRECACHE = {precache};
const OFFLINE_FALLBACK = {fallback};

self.addEventListener('install', function(event) {{
  event.waitUntil(
    caches.open(CACHE_NAME).then(function(cache) {{
      return Promise.all(PRECACHE.map(function(path) {{
        return fetch(path).then(function(response) {{
          if (response.status === 200) {{
            return cache.put(path, response);
          }}
          console.log('Offline cache: failed to cache', path, response.status);
        }}).catch(function(err) {{
          console.log('Offline cache: failed to cache', path, err);
        }});
      }}));
    }})
  );{skip_waiting}
}});

self.addEventListener('activate', function(event) {{
  event.waitUntil(
    caches.keys().then(function(names) {{
      return Promise.all(
        names.filter(function(n) {{ return n !== CACHE_NAME; }})
             .map(function(n) {{ return caches.delete(n); }})
      );
    }})
  );
  self.clients.claim();
}});

self.addEventListener('fetch', function(event) {{
  if (event.request.method !== 'GET') return;
  if (!event.request.url.startsWith('http')) return;

  event.respondWith(
    caches.match(event.request).then(function(cached) {{
      if (cached) {{
        fetch(event.request).then(function(fresh) {{
          if (fresh && fresh.status === 200) {{
            caches.open(CACHE_NAME).then(function(cache) {{
              cache.put(event.request, fresh);
            }});
          }}
        }}).catch(function() {{}});
        return cached;
      }}
      return fetch(event.request).then(function(response) {{
        if (response && response.status === 200) {{
          var copy = response.clone();
          caches.open(CACHE_NAME).then(function(cache) {{
            cache.put(event.request, copy);
          }});
        }}
        return response;
      }}).catch(function(err) {{
        if (event.request.destination === 'document') {{
          return caches.match(OFFLINE_FALLBACK).then(function(page) {{
            if (page) return page;
            throw err;
          }});
        }}
        throw err;
      }});
    }})
  );
}});

self.addEventListener('message', function(event) {{
  if (!event.data) return;
  if (event.data.type === 'SKIP_WAITING') {{
    self.skipWaiting();
  }}
  if (event.data.type === 'CLEAR_CACHE') {{
    caches.delete(CACHE_NAME);
  }}
}});
"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_version_and_precache() {
        let script = worker_script(&OfflineConfig::default());
        assert!(script.contains(r#"const CACHE_NAME = "fort-boyard-v1";"#));
        assert!(script.contains(r#""/corporate.html""#));
        assert!(script.contains(r#"const OFFLINE_FALLBACK = "/index.html";"#));
        assert!(script.contains("self.skipWaiting();\n});"));
    }

    #[test]
    fn quotes_are_escaped() {
        let config = OfflineConfig::new().with_version(r#"v"2"#);
        let script = worker_script(&config);
        assert!(script.contains(r#"const CACHE_NAME = "v\"2";"#));
    }

    #[test]
    fn waiting_is_kept_when_configured() {
        let config = OfflineConfig {
            skip_waiting_on_install: false,
            ..OfflineConfig::default()
        };
        let script = worker_script(&config);
        assert!(!script.contains("self.skipWaiting();\n});"));
        assert!(script.contains("'SKIP_WAITING'"));
    }
}
