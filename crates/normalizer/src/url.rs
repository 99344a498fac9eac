//! URL normalization (§4.3.2). Never touches the query or path content of
//! an absolute URL — only decides what, if anything, to prefix.

/// Absolute URLs pass through untouched; a leading `/` is resolved against
/// `portal_base_url`; anything else (already-relative paths without a
/// leading slash, empty strings) passes through untouched too.
pub fn normalize_url(raw: &str, portal_base_url: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    if let Some(path) = raw.strip_prefix('/') {
        let base = portal_base_url.trim_end_matches('/');
        return format!("{base}/{path}");
    }
    raw.to_string()
}
