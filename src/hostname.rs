//! Hostname normalization and block matching.
//!
//! Matching is deliberately substring-based: a hostname is blocked when any
//! block-list entry occurs anywhere inside it. Blocking `example.com`
//! therefore also blocks `sub.example.com` and `notexample.com.evil.org`.
//! This over-broad policy is what students and administrators already rely
//! on; keep it.

use crate::error::ApiError;
use url::Url;

/// Reduce a user-entered URL or bare domain to its hostname.
///
/// Input with a scheme is parsed as-is; bare input such as `example.com/path`
/// is parsed as `http://example.com/path`. Input without a host is rejected.
pub fn normalize_hostname(input: &str) -> Result<String, ApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidUrl(input.to_string()));
    }

    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{}", trimmed))
    }
    .map_err(|_| ApiError::InvalidUrl(input.to_string()))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(ApiError::InvalidUrl(input.to_string())),
    }
}

/// Hostname of a navigated page URL, or `None` for URLs without a host
/// (`about:blank`, `data:` and the like).
pub fn page_hostname(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Whether `hostname` is blocked by any entry of `blocked_sites`.
pub fn is_blocked<S: AsRef<str>>(hostname: &str, blocked_sites: &[S]) -> bool {
    matching_entry(hostname, blocked_sites).is_some()
}

/// First block-list entry matching `hostname`, if any.
pub fn matching_entry<'a, S: AsRef<str>>(hostname: &str, blocked_sites: &'a [S]) -> Option<&'a str> {
    if hostname.is_empty() {
        return None;
    }
    blocked_sites
        .iter()
        .map(AsRef::as_ref)
        .find(|site| !site.is_empty() && hostname.contains(*site))
}
