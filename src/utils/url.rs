// src/utils/url.rs

//! URL normalization.
//!
//! Article identity is the URL reduced to scheme, host and path. The same
//! function is used when seeding the duplicate index from the store and when
//! keying freshly scraped links, so both sides always agree.

use url::{Position, Url};

use crate::models::CanonicalUrl;

/// Reduce a URL to `scheme://host[:port]/path` without trailing slashes.
///
/// Query string and fragment are discarded. Input that is not an absolute
/// URL is cut at the first `?` or `#` instead, so the function never fails
/// and `canonicalize(canonicalize(u)) == canonicalize(u)`.
///
/// # Examples
/// ```
/// use harvester::utils::url::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://x.com/a?b=1#c").as_str(),
///     "https://x.com/a"
/// );
/// ```
pub fn canonicalize(raw: &str) -> CanonicalUrl {
    let raw = raw.trim();
    let normalized = match Url::parse(raw) {
        Ok(url) if url.has_host() => url[..Position::AfterPath].trim_end_matches('/').to_string(),
        _ => strip_query_and_fragment(raw),
    };
    CanonicalUrl::from_normalized(normalized)
}

/// Resolve `href` against `base` and canonicalize the result.
///
/// Returns `None` when the href cannot be resolved to a URL.
pub fn canonicalize_href(base: &Url, href: &str) -> Option<CanonicalUrl> {
    base.join(href.trim()).ok().map(|url| canonicalize(url.as_str()))
}

fn strip_query_and_fragment(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    raw[..end].trim_end_matches('/').to_string()
}
