//! Extension → content type lookup.

use std::collections::HashMap;
use std::path::Path;

/// Content type for files whose extension is not in the table.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Built-in extension table. Keys are lowercase and carry no leading dot.
pub const CONTENT_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("eot", "application/vnd.ms-fontobject"),
];

/// Immutable extension → content type map.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    map: HashMap<String, String>,
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self {
            map: CONTENT_TYPES
                .iter()
                .map(|(ext, mime)| ((*ext).to_string(), (*mime).to_string()))
                .collect(),
        }
    }
}

impl ContentTypes {
    /// Creates the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers extra mappings over the table. Extensions are matched case-insensitively
    /// and may be given with or without a leading dot.
    #[must_use]
    pub fn with_extra<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (ext, mime) in extra {
            let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
            self.map.insert(ext, mime.into());
        }
        self
    }

    /// Returns the content type for `path`, or [`DEFAULT_CONTENT_TYPE`].
    #[must_use]
    pub fn lookup(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.map.get(&ext.to_ascii_lowercase()))
            .map_or(DEFAULT_CONTENT_TYPE, String::as_str)
    }

    /// Number of known extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_lookups() {
        let types = ContentTypes::new();
        for (ext, mime) in CONTENT_TYPES {
            let name = format!("file.{ext}");
            assert_eq!(types.lookup(Path::new(&name)), *mime, "extension {ext}");
        }
        assert_eq!(types.len(), CONTENT_TYPES.len());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let types = ContentTypes::new();
        assert_eq!(types.lookup(Path::new("INDEX.HTML")), "text/html");
        assert_eq!(types.lookup(Path::new("photo.JpG")), "image/jpeg");
    }

    #[test]
    fn unknown_and_missing_extensions_are_binary() {
        let types = ContentTypes::new();
        assert_eq!(types.lookup(Path::new("archive.zip")), DEFAULT_CONTENT_TYPE);
        assert_eq!(types.lookup(Path::new("README")), DEFAULT_CONTENT_TYPE);
        assert_eq!(types.lookup(Path::new(".hidden")), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn only_last_extension_counts() {
        let types = ContentTypes::new();
        assert_eq!(types.lookup(Path::new("style.css.map")), DEFAULT_CONTENT_TYPE);
        assert_eq!(types.lookup(Path::new("dir.html/app.js")), "text/javascript");
    }

    #[test]
    fn extra_mappings_extend_and_override() {
        let types = ContentTypes::new().with_extra([(".WEBP", "image/webp"), ("js", "application/javascript")]);
        assert_eq!(types.lookup(Path::new("a.webp")), "image/webp");
        assert_eq!(types.lookup(Path::new("a.js")), "application/javascript");
        assert_eq!(types.len(), CONTENT_TYPES.len() + 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn unknown_extensions_default(ext in "[a-z]{5,8}") {
                prop_assume!(!CONTENT_TYPES.iter().any(|(known, _)| *known == ext));
                let types = ContentTypes::new();
                let name = format!("file.{ext}");
                prop_assert_eq!(types.lookup(Path::new(&name)), DEFAULT_CONTENT_TYPE);
            }

            #[test]
            fn lookup_never_panics(name in "\\PC{0,40}") {
                let _ = ContentTypes::new().lookup(Path::new(&name));
            }
        }
    }
}
