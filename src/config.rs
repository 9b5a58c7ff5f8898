use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// Timeout applied to every probe request, in seconds.
pub const NETWORK_TIMEOUT_SECS: u64 = 25;

/// Minimum splash-screen dwell before a decision is published (1.5 s).
pub const SPLASH_DWELL_MILLIS: u64 = 1_500;

/// Delay between the qualifying access and the store-review request.
pub const REVIEW_PROMPT_DELAY_MILLIS: u64 = 2_000;

/// Post-increment access count that triggers the one-time review request.
pub const REVIEW_PROMPT_ACCESS_COUNT: i64 = 2;

/// Redirect hops followed before a resolution is abandoned.
pub const DEFAULT_REDIRECT_LIMIT: usize = 10;

/// Host resolved by the default reachability check.
pub const REACHABILITY_PROBE_HOST: &str = "one.one.one.one:443";

/// Query parameter carrying the tracking token.
pub const PATH_ID_PARAM: &str = "pathid";

/// Query parameter carrying the per-install user token.
pub const PUSH_ID_PARAM: &str = "push_id";

// Persisted keys.
pub const SAVED_CONTENT_SOURCE_KEY: &str = "saved_content_source";
pub const CLASSIC_PATH_ID_KEY: &str = "classic_path_id";
pub const PRIVACY_PATH_ID_KEY: &str = "privacy_path_id";
pub const PRIMARY_MODE_SHOWN_KEY: &str = "primary_mode_shown";
pub const DROPBOX_FAILED_KEY: &str = "dropbox_failed_once";
pub const DROPBOX_WEBVIEW_TRIED_KEY: &str = "dropbox_webview_tried";
/// Last dropbox page that loaded; kept apart from the saved source.
pub const DROPBOX_LOADED_SOURCE_KEY: &str = "saved_content_source_dropbox";
pub const ACCESS_COUNT_KEY: &str = "enhanced_access_count";
pub const INSTALL_ID_KEY: &str = "user_unique_identifier";

/// How the content source URL is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentMode {
    /// Fixed source URL, token-augmented and redirect-resolved.
    Classic,
    /// Same resolution as `Classic` without the user token.
    ClassicNoToken,
    /// Source URL serves a JSON manifest whose `url` is the real content.
    Dropbox,
    /// Like `Classic`, but a final URL containing `identifier` forces basic.
    Privacy { identifier: String },
}

impl ContentMode {
    /// Store key holding the last tracking token for this mode.
    /// `None` for `Dropbox`, which never walks a redirect chain.
    pub fn path_id_key(&self) -> Option<&'static str> {
        match self {
            ContentMode::Classic | ContentMode::ClassicNoToken => Some(CLASSIC_PATH_ID_KEY),
            ContentMode::Privacy { .. } => Some(PRIVACY_PATH_ID_KEY),
            ContentMode::Dropbox => None,
        }
    }

    pub fn is_dropbox(&self) -> bool {
        matches!(self, ContentMode::Dropbox)
    }

    /// Identifier whose presence in a resolved URL trips the privacy gate.
    pub fn privacy_identifier(&self) -> Option<&str> {
        match self {
            ContentMode::Privacy { identifier } => Some(identifier.as_str()),
            _ => None,
        }
    }

    /// Whether the per-install user token is appended to the source URL.
    pub fn wants_user_token(&self) -> bool {
        matches!(self, ContentMode::Classic | ContentMode::Privacy { .. })
    }
}

/// Calendar day before which only the basic experience is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReleaseDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl ReleaseDate {
    /// `None` when the components do not name a real day.
    pub fn to_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl Default for ReleaseDate {
    fn default() -> Self {
        Self {
            year: 2025,
            month: 1,
            day: 1,
        }
    }
}

fn default_network_timeout_secs() -> u64 {
    NETWORK_TIMEOUT_SECS
}

fn default_splash_dwell_ms() -> u64 {
    SPLASH_DWELL_MILLIS
}

fn default_review_prompt_delay_ms() -> u64 {
    REVIEW_PROMPT_DELAY_MILLIS
}

fn default_redirect_limit() -> usize {
    DEFAULT_REDIRECT_LIMIT
}

fn default_tablet_markers() -> Vec<String> {
    vec!["iPad".to_string()]
}

fn default_reachability_host() -> String {
    REACHABILITY_PROBE_HOST.to_string()
}

/// Top-level configuration for a content router.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    pub content_mode: ContentMode,
    /// Starting URL (manifest URL in `Dropbox` mode).
    pub source_url: String,
    #[serde(default)]
    pub release_date: ReleaseDate,
    /// Accent color for the loading UI, passed through untouched.
    #[serde(default)]
    pub progress_color: Option<String>,
    #[serde(default = "default_network_timeout_secs")]
    pub network_timeout_secs: u64,
    #[serde(default = "default_splash_dwell_ms")]
    pub splash_dwell_ms: u64,
    #[serde(default = "default_review_prompt_delay_ms")]
    pub review_prompt_delay_ms: u64,
    #[serde(default = "default_redirect_limit")]
    pub redirect_limit: usize,
    /// Substrings of the device model or name that classify it as a tablet.
    #[serde(default = "default_tablet_markers")]
    pub tablet_markers: Vec<String>,
    /// `host:port` resolved by the default reachability check.
    #[serde(default = "default_reachability_host")]
    pub reachability_host: String,
}

impl RouterConfig {
    pub fn new(content_mode: ContentMode, source_url: impl Into<String>) -> Self {
        Self {
            content_mode,
            source_url: source_url.into(),
            release_date: ReleaseDate::default(),
            progress_color: None,
            network_timeout_secs: NETWORK_TIMEOUT_SECS,
            splash_dwell_ms: SPLASH_DWELL_MILLIS,
            review_prompt_delay_ms: REVIEW_PROMPT_DELAY_MILLIS,
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            tablet_markers: default_tablet_markers(),
            reachability_host: default_reachability_host(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| anyhow!("invalid router config: {}", e))
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn splash_dwell(&self) -> Duration {
        Duration::from_millis(self.splash_dwell_ms)
    }

    pub fn review_prompt_delay(&self) -> Duration {
        Duration::from_millis(self.review_prompt_delay_ms)
    }
}

/// Status accepted when re-validating a saved source or refreshing by path-id.
pub fn is_reachable_status(status: u16) -> bool {
    (200..=403).contains(&status) || status == 405
}

/// Status accepted for the first resolution of an install (no saved source).
pub fn is_first_resolution_status(status: u16) -> bool {
    (200..=403).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ranges() {
        assert!(is_reachable_status(200));
        assert!(is_reachable_status(302));
        assert!(is_reachable_status(403));
        assert!(is_reachable_status(405));
        assert!(!is_reachable_status(404));
        assert!(!is_reachable_status(199));
        assert!(!is_reachable_status(500));
        assert!(!is_reachable_status(0));

        assert!(is_first_resolution_status(403));
        assert!(!is_first_resolution_status(405));
    }

    #[test]
    fn test_config_from_json_defaults() {
        let cfg = RouterConfig::from_json(
            r#"{"content_mode":{"type":"privacy","identifier":"id123"},"source_url":"https://ex.com/go"}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.content_mode,
            ContentMode::Privacy {
                identifier: "id123".to_string()
            }
        );
        assert_eq!(cfg.network_timeout(), Duration::from_secs(25));
        assert_eq!(cfg.splash_dwell(), Duration::from_millis(1_500));
        assert_eq!(cfg.redirect_limit, 10);
        assert_eq!(cfg.tablet_markers, vec!["iPad".to_string()]);
        assert_eq!(cfg.release_date.to_date(), NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    #[test]
    fn test_config_rejects_unknown_mode() {
        assert!(RouterConfig::from_json(
            r#"{"content_mode":{"type":"ftp"},"source_url":"https://ex.com"}"#
        )
        .is_err());
    }

    #[test]
    fn test_path_id_keys() {
        assert_eq!(ContentMode::Classic.path_id_key(), Some(CLASSIC_PATH_ID_KEY));
        assert_eq!(ContentMode::ClassicNoToken.path_id_key(), Some(CLASSIC_PATH_ID_KEY));
        assert_eq!(
            ContentMode::Privacy {
                identifier: "x".into()
            }
            .path_id_key(),
            Some(PRIVACY_PATH_ID_KEY)
        );
        assert_eq!(ContentMode::Dropbox.path_id_key(), None);
    }

    #[test]
    fn test_invalid_release_date() {
        let date = ReleaseDate {
            year: 2025,
            month: 2,
            day: 30,
        };
        assert!(date.to_date().is_none());
    }
}
