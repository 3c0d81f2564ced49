//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for("/blog/", "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about/") // -> "https://example.com/blog/about/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(&config.root, path))
}

/// Site URL of a page with the given slug
pub fn page_url(root: &str, slug: &str) -> String {
    url_for(root, &format!("{}/", slug))
}

/// Site URL of an asset stored at `path` (relative to the content root)
pub fn asset_url(root: &str, path: &Path) -> String {
    let encoded: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .map(|s| utf8_percent_encode(s, PATH_SEGMENT).to_string())
        .collect();
    url_for(root, &encoded.join("/"))
}

/// True for URLs with a scheme (`https:`, `mailto:`, `data:`) or protocol-relative URLs
pub fn is_external(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.find(':') {
        Some(pos) => {
            let scheme = &url[..pos];
            scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Resolve `target` against `base` (both relative to the content root).
///
/// A leading `/` resolves against the root itself. Returns `None` when the
/// result is empty or climbs above the root.
pub fn resolve_relative(base: &Path, target: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();

    if !target.starts_with('/') {
        for component in base.components() {
            match component {
                Component::Normal(s) => parts.push(s.to_str()?),
                Component::ParentDir => {
                    parts.pop()?;
                }
                _ => {}
            }
        }
    }

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.iter().collect())
    }
}
