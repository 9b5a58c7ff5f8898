// Redirect tracking and tracking-token URL helpers.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Url;
use tracing::debug;

use crate::config::PATH_ID_PARAM;

/// Records the most recent URL in a redirect chain carrying a `pathid` key.
///
/// Cloned into the transport's redirect hook; every clone shares one slot.
/// Later observations overwrite earlier ones.
#[derive(Clone, Default)]
pub struct PathIdTracker {
    last: Arc<Mutex<Option<Url>>>,
}

impl PathIdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url` if it carries a path-id. Returns whether it was recorded.
    pub fn observe(&self, url: &Url) -> bool {
        if !has_path_id(url) {
            return false;
        }
        debug!("redirect with pathid url={}", url);
        *self.last.lock() = Some(url.clone());
        true
    }

    pub fn last_url(&self) -> Option<Url> {
        self.last.lock().clone()
    }
}

fn is_path_id_key(key: &str) -> bool {
    key.eq_ignore_ascii_case(PATH_ID_PARAM)
}

pub fn has_path_id(url: &Url) -> bool {
    url.query_pairs().any(|(k, _)| is_path_id_key(&k))
}

/// Value of the first `pathid` query parameter (key matched case-insensitively).
pub fn extract_path_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(k, _)| is_path_id_key(k))
        .map(|(_, v)| v.into_owned());
    value
}

/// Remove every `pathid` query parameter; an emptied query is dropped.
/// Unparseable input is returned unchanged.
pub fn strip_path_id(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return url.to_string(),
    };
    if !has_path_id(&parsed) {
        return url.to_string();
    }

    // Raw segments, so the remaining parameters keep their original encoding.
    let kept: Vec<&str> = parsed
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|segment| {
            let key = segment.split('=').next().unwrap_or("");
            !segment.is_empty() && !is_path_id_key(key)
        })
        .collect();
    let query = kept.join("&");

    if query.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.set_query(Some(&query));
    }
    parsed.to_string()
}

/// Append `key=value` to the query of `url`.
pub fn append_query_param(url: &str, key: &str, value: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.query_pairs_mut().append_pair(key, value);
    Some(parsed.to_string())
}

pub fn append_path_id(url: &str, path_id: &str) -> Option<String> {
    append_query_param(url, PATH_ID_PARAM, path_id)
}

/// Last two dot-separated labels of `host` (`cdn.example.com` → `example.com`).
pub fn base_domain(host: &str) -> String {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2..].join(".")
    } else {
        host.to_string()
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Whether `candidate` may be persisted as the saved content source.
///
/// Only URLs that leave the source's base domain are saved. When either
/// host cannot be determined, saving is allowed.
pub fn is_saving_allowed(candidate: &str, source: &str) -> bool {
    let Some(candidate_host) = host_of(candidate) else {
        return true;
    };
    let Some(source_host) = host_of(source) else {
        return true;
    };
    base_domain(&candidate_host) != base_domain(&source_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_tracker_last_seen_wins() {
        let tracker = PathIdTracker::new();
        assert!(!tracker.observe(&url("https://a.com/start")));
        assert!(tracker.observe(&url("https://b.com/?pathid=1")));
        assert!(tracker.observe(&url("https://c.com/?PathId=2")));
        assert!(!tracker.observe(&url("https://d.com/final")));

        let last = tracker.last_url().unwrap();
        assert_eq!(extract_path_id(last.as_str()).as_deref(), Some("2"));
    }

    #[test]
    fn test_tracker_shared_between_clones() {
        let tracker = PathIdTracker::new();
        let hook = tracker.clone();
        hook.observe(&url("https://b.com/?pathid=42"));
        assert!(tracker.last_url().is_some());
    }

    #[test]
    fn test_extract_path_id_case_insensitive() {
        assert_eq!(
            extract_path_id("https://ex.com/go?a=1&PATHID=9").as_deref(),
            Some("9")
        );
        assert_eq!(extract_path_id("https://ex.com/go?a=1"), None);
        assert_eq!(extract_path_id("not a url"), None);
    }

    #[test]
    fn test_strip_path_id() {
        assert_eq!(
            strip_path_id("https://cdn.example/page?pathid=9"),
            "https://cdn.example/page"
        );
        assert_eq!(
            strip_path_id("https://cdn.example/page?a=1&pathid=9&b=2"),
            "https://cdn.example/page?a=1&b=2"
        );
        assert_eq!(
            strip_path_id("https://cdn.example/page?a=1"),
            "https://cdn.example/page?a=1"
        );
        assert_eq!(strip_path_id("::garbage"), "::garbage");
    }

    #[test]
    fn test_strip_path_id_keeps_other_encoding() {
        assert_eq!(
            strip_path_id("https://cdn.example/p?q=a%20b&t=x~y&pathid=1"),
            "https://cdn.example/p?q=a%20b&t=x~y"
        );
        assert_eq!(
            strip_path_id("https://cdn.example/p?PathID=1&flag&q=a+b"),
            "https://cdn.example/p?flag&q=a+b"
        );
    }

    #[test]
    fn test_append_path_id() {
        assert_eq!(
            append_path_id("https://ex.com/go", "9").as_deref(),
            Some("https://ex.com/go?pathid=9")
        );
        assert_eq!(
            append_path_id("https://ex.com/go?push_id=abc", "9").as_deref(),
            Some("https://ex.com/go?push_id=abc&pathid=9")
        );
        assert_eq!(append_path_id("", "9"), None);
    }

    #[test]
    fn test_base_domain() {
        assert_eq!(base_domain("cdn.example.com"), "example.com");
        assert_eq!(base_domain("example.com"), "example.com");
        assert_eq!(base_domain("localhost"), "localhost");
    }

    #[test]
    fn test_saving_guard() {
        assert!(!is_saving_allowed(
            "https://www.ex.com/landing",
            "https://go.ex.com/start"
        ));
        assert!(is_saving_allowed(
            "https://cdn.example/page",
            "https://ex.com/go"
        ));
        assert!(is_saving_allowed("relative/path", "https://ex.com/go"));
    }
}
