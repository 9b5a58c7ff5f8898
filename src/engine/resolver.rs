// Content source resolution: decides basic vs enhanced once per run and persists the outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::access::AccessTracker;
use super::publisher::{DisplayMode, DisplayPublisher};
use crate::config::{
    is_first_resolution_status, is_reachable_status, ContentMode, RouterConfig,
    DROPBOX_FAILED_KEY, DROPBOX_LOADED_SOURCE_KEY, DROPBOX_WEBVIEW_TRIED_KEY, PRIMARY_MODE_SHOWN_KEY,
    SAVED_CONTENT_SOURCE_KEY,
};
use crate::platform::clock::{Clock, SystemClock};
use crate::platform::device::DeviceProfile;
use crate::platform::hooks::{EventSink, LaunchEvent, NoopEventSink, NoopPrompter, ReviewPrompter};
use crate::platform::network::{check_reachability, HostLookupMonitor, PathMonitor};
use crate::source::http_source::HttpProbe;
use crate::source::manifest::Manifest;
use crate::source::redirect::{append_path_id, is_saving_allowed, strip_path_id};
use crate::source::traits::{ContentProbe, ResolvedTarget};
use crate::store::traits::KeyValueStore;

/// Everything the engine talks to outside its own state.
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub probe: Arc<dyn ContentProbe>,
    pub device: DeviceProfile,
    pub clock: Arc<dyn Clock>,
    pub network: Arc<dyn PathMonitor>,
    pub reviews: Arc<dyn ReviewPrompter>,
    pub events: Arc<dyn EventSink>,
}

impl Collaborators {
    /// Production wiring: `reqwest` probes, system clock, DNS reachability,
    /// no review or analytics hooks.
    pub fn with_defaults(
        config: &RouterConfig,
        store: Arc<dyn KeyValueStore>,
        device: DeviceProfile,
    ) -> Result<Self> {
        let probe = HttpProbe::new(config.network_timeout(), config.redirect_limit)?;
        Ok(Self {
            store,
            probe: Arc::new(probe),
            device,
            clock: Arc::new(SystemClock),
            network: Arc::new(HostLookupMonitor::new(
                config.reachability_host.clone(),
                config.network_timeout(),
            )),
            reviews: Arc::new(NoopPrompter),
            events: Arc::new(NoopEventSink),
        })
    }
}

#[derive(Debug)]
enum Decision {
    Basic(&'static str),
    /// `recorded` is false for degraded displays that are neither counted
    /// as an access nor saved.
    Enhanced { url: String, recorded: bool },
}

impl Decision {
    fn enhanced(url: String) -> Self {
        Decision::Enhanced {
            url,
            recorded: true,
        }
    }

    fn unrecorded(url: String) -> Self {
        Decision::Enhanced {
            url,
            recorded: false,
        }
    }
}

pub struct ResolutionEngine {
    mode: ContentMode,
    source_url: RwLock<String>,
    release_date: Option<NaiveDate>,
    tablet_markers: Vec<String>,
    splash_dwell: Duration,
    store: Arc<dyn KeyValueStore>,
    probe: Arc<dyn ContentProbe>,
    device: DeviceProfile,
    clock: Arc<dyn Clock>,
    network: Arc<dyn PathMonitor>,
    events: Arc<dyn EventSink>,
    access: AccessTracker,
    publisher: DisplayPublisher,
    /// Serializes resolution runs.
    run_lock: Mutex<()>,
    /// Set once the rendering layer has forced basic after a 404.
    basic_switch_triggered: AtomicBool,
}

impl ResolutionEngine {
    /// Build an engine in the `Loading` state without starting a run.
    pub fn new(config: &RouterConfig, deps: Collaborators) -> Self {
        let release_date = config.release_date.to_date();
        if release_date.is_none() {
            warn!(
                "release date {:?} is not a calendar day, gate disabled",
                config.release_date
            );
        }
        let access = AccessTracker::new(
            deps.store.clone(),
            deps.reviews.clone(),
            config.review_prompt_delay(),
        );
        Self {
            mode: config.content_mode.clone(),
            source_url: RwLock::new(config.source_url.clone()),
            release_date,
            tablet_markers: config.tablet_markers.clone(),
            splash_dwell: config.splash_dwell(),
            store: deps.store,
            probe: deps.probe,
            device: deps.device,
            clock: deps.clock,
            network: deps.network,
            events: deps.events,
            access,
            publisher: DisplayPublisher::new(),
            run_lock: Mutex::new(()),
            basic_switch_triggered: AtomicBool::new(false),
        }
    }

    /// Build an engine and start its first resolution run in the background.
    pub fn create(config: &RouterConfig, deps: Collaborators) -> Arc<Self> {
        let engine = Arc::new(Self::new(config, deps));
        engine.spawn_resolution();
        engine
    }

    /// Replace the provisional source URL and start a fresh run against it.
    pub fn rebind(self: &Arc<Self>, source_url: String) {
        info!("rebinding content source url={}", source_url);
        *self.source_url.write() = source_url;
        // Waiters must not see the previous run's decision.
        self.publisher.begin();
        self.spawn_resolution();
    }

    fn spawn_resolution(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.resolve().await;
        });
    }

    /// Run one full resolution and publish its decision.
    ///
    /// Never fails: every network or parse error ends in a terminal mode.
    pub async fn resolve(&self) -> DisplayMode {
        let _guard = self.run_lock.lock().await;
        self.publisher.begin();

        let source = self.current_source_url();
        info!("resolution start mode={:?} source={}", self.mode, source);

        let decision = match self.entry_gate(&source).await {
            Some(reason) => Decision::Basic(reason),
            None => match self.mode.path_id_key() {
                None => self.resolve_dropbox(&source).await,
                Some(key) => self.resolve_unified(&source, key).await,
            },
        };
        debug!("resolution decided {:?}", decision);

        tokio::time::sleep(self.splash_dwell).await;
        self.apply(decision)
    }

    async fn entry_gate(&self, source: &str) -> Option<&'static str> {
        if source.trim().is_empty() {
            return Some("empty source url");
        }
        if self.device.is_tablet_like(&self.tablet_markers) {
            return Some("tablet device");
        }
        if let Some(release) = self.release_date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            if self.clock.now() < release {
                return Some("release date in future");
            }
        }
        if !check_reachability(self.network.as_ref()).await {
            return Some("network unavailable");
        }
        None
    }

    async fn resolve_dropbox(&self, source: &str) -> Decision {
        if self.store.get_bool(DROPBOX_FAILED_KEY) {
            return Decision::Basic("dropbox failed before");
        }
        if let Some(saved) = self.saved_source() {
            info!("dropbox using saved source url={}", saved);
            return Decision::enhanced(saved);
        }
        match self.load_manifest(source).await {
            Ok(manifest) => {
                info!("dropbox manifest resolved url={}", manifest.url);
                Decision::enhanced(manifest.url)
            }
            Err(e) => {
                warn!("dropbox manifest failed, remembering: {}", e);
                self.store.set_bool(DROPBOX_FAILED_KEY, true);
                Decision::Basic("dropbox manifest unavailable")
            }
        }
    }

    async fn load_manifest(&self, source: &str) -> Result<Manifest> {
        let doc = self.probe.get(source).await?;
        if doc.status != 200 {
            return Err(anyhow!("manifest request failed: HTTP {}", doc.status));
        }
        Manifest::parse(&doc.body)
    }

    async fn resolve_unified(&self, source: &str, path_id_key: &'static str) -> Decision {
        if self.store.get_bool(PRIMARY_MODE_SHOWN_KEY) {
            return Decision::Basic("basic shown before");
        }
        match self.saved_source() {
            Some(saved) => self.revalidate_saved(source, saved, path_id_key).await,
            None => self.first_resolution(source, path_id_key).await,
        }
    }

    async fn revalidate_saved(&self, source: &str, saved: String, path_id_key: &str) -> Decision {
        let status = match self.probe.head(&saved).await {
            Ok(status) => status,
            Err(e) => {
                warn!("saved source probe failed url={}: {}", saved, e);
                0
            }
        };
        info!("saved source url={} status={}", saved, status);
        if is_reachable_status(status) {
            return Decision::enhanced(saved);
        }

        let Some(path_id) = self.store.get_string(path_id_key) else {
            warn!("saved source rejected and no pathid on record");
            return Decision::unrecorded(saved);
        };

        if let Some(target) = self.refresh_by_path_id(source, &path_id).await {
            if is_reachable_status(target.status) {
                self.persist_resolved(source, &target.final_url);
                return Decision::enhanced(target.final_url);
            }
            warn!(
                "refresh rejected url={} status={}",
                target.final_url, target.status
            );
        }

        match append_path_id(source, &path_id) {
            Some(fallback) => {
                info!("opening unrecorded fallback url={}", fallback);
                Decision::unrecorded(fallback)
            }
            None => Decision::unrecorded(saved),
        }
    }

    /// Re-walk the source with the stored path-id appended.
    async fn refresh_by_path_id(&self, source: &str, path_id: &str) -> Option<ResolvedTarget> {
        let start = append_path_id(source, path_id)?;
        info!("refresh start url={}", start);
        match self.probe.follow(&start).await {
            Ok(target) => {
                info!("refresh final url={} status={}", target.final_url, target.status);
                Some(target)
            }
            Err(e) => {
                warn!("refresh failed url={}: {}", start, e);
                None
            }
        }
    }

    async fn first_resolution(&self, source: &str, path_id_key: &str) -> Decision {
        let target = match self.probe.follow(source).await {
            Ok(target) => target,
            Err(e) => {
                warn!("source unresolved url={}: {}", source, e);
                return Decision::Basic("source unresolved");
            }
        };

        if let Some(path_id) = target.path_id() {
            info!("pathid saved key={} value={}", path_id_key, path_id);
            self.store.set_string(path_id_key, &path_id);
        }

        if let Some(identifier) = self.mode.privacy_identifier() {
            if !identifier.is_empty() && target.final_url.contains(identifier) {
                return Decision::Basic("privacy identifier in final url");
            }
        }

        info!(
            "first resolution final={} status={}",
            target.final_url, target.status
        );
        if is_first_resolution_status(target.status) {
            self.persist_resolved(source, &target.final_url);
            Decision::enhanced(target.final_url)
        } else {
            Decision::Basic("source rejected")
        }
    }

    /// Save `resolved` (without its pathid) unless it stays on the source's base domain.
    fn persist_resolved(&self, source: &str, resolved: &str) {
        let stripped = strip_path_id(resolved);
        if is_saving_allowed(&stripped, source) {
            info!("saved content source url={}", stripped);
            self.store.set_string(SAVED_CONTENT_SOURCE_KEY, &stripped);
        } else {
            debug!("skip save, same base domain url={}", stripped);
        }
    }

    fn saved_source(&self) -> Option<String> {
        self.store
            .get_string(SAVED_CONTENT_SOURCE_KEY)
            .filter(|s| !s.is_empty())
    }

    fn apply(&self, decision: Decision) -> DisplayMode {
        match decision {
            Decision::Basic(reason) => {
                info!("activating basic reason={}", reason);
                self.activate_basic();
                DisplayMode::Basic
            }
            Decision::Enhanced { url, recorded } => {
                info!("activating enhanced url={} recorded={}", url, recorded);
                if recorded {
                    self.access.record();
                }
                let mode = DisplayMode::Enhanced(url);
                self.publisher.publish(mode.clone());
                self.events.track(LaunchEvent::EnhancedLaunch);
                mode
            }
        }
    }

    fn activate_basic(&self) {
        // Dropbox users never saw remote content, so the sticky flag stays clear.
        if !self.mode.is_dropbox() {
            self.store.set_bool(PRIMARY_MODE_SHOWN_KEY, true);
        }
        self.publisher.publish(DisplayMode::Basic);
        self.events.track(LaunchEvent::OnboardingLaunch);
    }

    /// Status callback from the content-rendering layer.
    ///
    /// Only a 404 observed while showing dropbox content matters, and only
    /// when that content has never loaded successfully before.
    pub fn notify_http_status(&self, url: &str, status: u16) {
        if !self.mode.is_dropbox() || status != 404 {
            return;
        }
        if !matches!(self.publisher.current(), DisplayMode::Enhanced(_)) {
            return;
        }
        if self.saved_source().is_some() {
            info!("HTTP 404 tolerated, content loaded before url={}", url);
            return;
        }
        if self.basic_switch_triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!("HTTP 404 in dropbox content url={}, switching to basic", url);
        self.handle_404_error();
    }

    /// Force basic immediately, bypassing the entry gates.
    pub fn handle_404_error(&self) {
        if self.mode.is_dropbox() && !self.store.get_bool(DROPBOX_WEBVIEW_TRIED_KEY) {
            self.store.set_bool(DROPBOX_WEBVIEW_TRIED_KEY, true);
            self.store.set_bool(DROPBOX_FAILED_KEY, true);
            info!("dropbox failed flag set on first content error");
        }
        self.activate_basic();
    }

    /// Page-load callback from the content-rendering layer. In dropbox mode
    /// the loaded page is remembered under its own key, so the 404 check
    /// above still fires on an install that never saved a source.
    pub fn notify_page_loaded(&self, url: &str) {
        if !self.mode.is_dropbox() || url.trim().is_empty() {
            return;
        }
        let stripped = strip_path_id(url);
        debug!("dropbox page loaded url={}", stripped);
        self.store.set_string(DROPBOX_LOADED_SOURCE_KEY, &stripped);
    }

    /// Last page loaded in dropbox mode, if any.
    pub fn dropbox_loaded_source(&self) -> Option<String> {
        self.store
            .get_string(DROPBOX_LOADED_SOURCE_KEY)
            .filter(|s| !s.is_empty())
    }

    pub fn current_mode(&self) -> DisplayMode {
        self.publisher.current()
    }

    pub fn current_source_url(&self) -> String {
        self.source_url.read().clone()
    }

    pub fn content_mode(&self) -> &ContentMode {
        &self.mode
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayMode> {
        self.publisher.subscribe()
    }

    pub async fn wait_for_decision(&self) -> DisplayMode {
        self.publisher.wait_for_decision().await
    }
}
