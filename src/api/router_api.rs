use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use tracing::info;

use crate::config::RouterConfig;
use crate::engine::publisher::DisplayMode;
use crate::engine::resolver::{Collaborators, ResolutionEngine};
use crate::identity::{augment_source_url, install_identifier};
use crate::platform::device::DeviceProfile;
use crate::store::file::JsonFileStore;
use crate::store::traits::KeyValueStore;

type RouterMap = RwLock<HashMap<String, Arc<ResolutionEngine>>>;

// Handle table for the Dart side; engines keep no global state of their own.
static ROUTERS: LazyLock<RouterMap> = LazyLock::new(|| RwLock::new(HashMap::new()));
static NEXT_ROUTER_ID: AtomicU64 = AtomicU64::new(1);

/// Information about a started router.
#[derive(Debug, Clone)]
pub struct RouterInfo {
    pub router_id: String,
    /// Source URL after user-token augmentation.
    pub source_url: String,
}

fn router(router_id: &str) -> Result<Arc<ResolutionEngine>> {
    ROUTERS
        .read()
        .get(router_id)
        .cloned()
        .ok_or_else(|| anyhow!("unknown router id {}", router_id))
}

/// Load config, open the store at `storage_path`, and start resolving.
pub async fn start_router(
    config_json: String,
    storage_path: String,
    device: DeviceProfile,
) -> Result<RouterInfo> {
    let mut config = RouterConfig::from_json(&config_json)?;
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(Path::new(&storage_path))?);

    let install_id = install_identifier(store.as_ref());
    config.source_url = augment_source_url(&config.source_url, &config.content_mode, &install_id);

    let deps = Collaborators::with_defaults(&config, store, device)?;
    let engine = ResolutionEngine::create(&config, deps);

    let router_id = format!("router-{}", NEXT_ROUTER_ID.fetch_add(1, Ordering::Relaxed));
    ROUTERS.write().insert(router_id.clone(), engine);
    info!(
        "router started id={} mode={:?} source={}",
        router_id, config.content_mode, config.source_url
    );

    Ok(RouterInfo {
        router_id,
        source_url: config.source_url,
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn current_mode(router_id: String) -> Result<DisplayMode> {
    Ok(router(&router_id)?.current_mode())
}

/// Wait for the running resolution to publish its decision.
pub async fn wait_for_decision(router_id: String) -> Result<DisplayMode> {
    let engine = router(&router_id)?;
    Ok(engine.wait_for_decision().await)
}

/// Rebind the source once an asynchronous augmentation step has finished.
pub async fn rebind_source(router_id: String, source_url: String) -> Result<()> {
    router(&router_id)?.rebind(source_url);
    Ok(())
}

#[flutter_rust_bridge::frb(sync)]
pub fn notify_http_status(router_id: String, url: String, status: u16) -> Result<()> {
    router(&router_id)?.notify_http_status(&url, status);
    Ok(())
}

#[flutter_rust_bridge::frb(sync)]
pub fn notify_page_loaded(router_id: String, url: String) -> Result<()> {
    router(&router_id)?.notify_page_loaded(&url);
    Ok(())
}

/// Drop the handle. Returns whether it existed.
#[flutter_rust_bridge::frb(sync)]
pub fn stop_router(router_id: String) -> bool {
    ROUTERS.write().remove(&router_id).is_some()
}
