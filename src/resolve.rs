//! Request target → content root path resolution.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Percent-decodes a request target and strips everything from the first `?`.
#[must_use]
pub fn request_path(target: &str) -> String {
    let decoded = percent_decode_str(target).decode_utf8_lossy();
    decoded
        .split_once('?')
        .map_or_else(|| decoded.to_string(), |(path, _)| path.to_string())
}

/// Resolves a decoded request path under `root`.
///
/// An empty path or `/` maps to `default_document`. Returns `None` when the
/// path would leave the root: parent-directory components, absolute
/// components, or drive prefixes.
#[must_use]
pub fn resolve(root: &Path, path: &str, default_document: &str) -> Option<PathBuf> {
    let relative = path.trim_start_matches('/');
    let relative = if relative.is_empty() {
        default_document
    } else {
        relative
    };

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/srv/site";

    fn resolve_target(target: &str) -> Option<PathBuf> {
        resolve(Path::new(ROOT), &request_path(target), "index.html")
    }

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(request_path("/class%20trip.html"), "/class trip.html");
        assert_eq!(request_path("/%D1%84%D0%BE%D1%80%D1%82.html"), "/форт.html");
    }

    #[test]
    fn strips_query_string() {
        assert_eq!(request_path("/style.css?v=3"), "/style.css");
        assert_eq!(request_path("/?utm_source=mail"), "/");
        assert_eq!(request_path("/a%3Fb"), "/a");
    }

    #[test]
    fn root_maps_to_default_document() {
        let index = Some(PathBuf::from("/srv/site/index.html"));
        assert_eq!(resolve_target("/"), index);
        assert_eq!(resolve_target(""), index);
        assert_eq!(resolve_target("/?x=1"), index);
        assert_eq!(resolve_target("/index.html"), index);
    }

    #[test]
    fn nested_paths_resolve_under_root() {
        assert_eq!(
            resolve_target("/img/gallery/photo.jpg"),
            Some(PathBuf::from("/srv/site/img/gallery/photo.jpg"))
        );
        assert_eq!(
            resolve_target("/./img//photo.jpg"),
            Some(PathBuf::from("/srv/site/img/photo.jpg"))
        );
    }

    #[test]
    fn rejects_parent_traversal() {
        assert_eq!(resolve_target("/../etc/passwd"), None);
        assert_eq!(resolve_target("/img/../../etc/passwd"), None);
        assert_eq!(resolve_target("/%2e%2e/etc/passwd"), None);
        assert_eq!(resolve_target("/img/%2E%2E/index.html"), None);
    }

    #[test]
    fn custom_default_document() {
        assert_eq!(
            resolve(Path::new(ROOT), "/", "home.html"),
            Some(PathBuf::from("/srv/site/home.html"))
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolved_paths_stay_under_root(target in "[a-z./%2eE?=]{0,40}") {
                if let Some(path) = resolve_target(&target) {
                    prop_assert!(path.starts_with(ROOT));
                    prop_assert!(!path.components().any(|c| c == Component::ParentDir));
                }
            }

            #[test]
            fn request_path_never_panics(target in "\\PC{0,60}") {
                let _ = request_path(&target);
            }
        }
    }
}
