// One-shot reachability: register a listener, take the first update, then deregister.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Satisfied,
    Unsatisfied,
}

/// Source of network-path updates.
pub trait PathMonitor: Send + Sync {
    /// Register a transient listener. Dropping the receiver deregisters it.
    fn start(&self) -> mpsc::Receiver<PathStatus>;
}

/// Resolve on the first path update, then cancel the listener.
/// A monitor that closes without reporting counts as unreachable.
pub async fn check_reachability(monitor: &dyn PathMonitor) -> bool {
    let mut updates = monitor.start();
    let status = updates.recv().await;
    drop(updates);
    debug!("reachability status={:?}", status);
    matches!(status, Some(PathStatus::Satisfied))
}

/// Reports `Satisfied` when `target` (`host:port`) resolves via DNS in time.
pub struct HostLookupMonitor {
    target: String,
    timeout: Duration,
}

impl HostLookupMonitor {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

impl PathMonitor for HostLookupMonitor {
    fn start(&self) -> mpsc::Receiver<PathStatus> {
        let (tx, rx) = mpsc::channel(1);
        let target = self.target.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let status = match tokio::time::timeout(timeout, tokio::net::lookup_host(target.as_str())).await {
                Ok(Ok(mut addrs)) => {
                    if addrs.next().is_some() {
                        PathStatus::Satisfied
                    } else {
                        PathStatus::Unsatisfied
                    }
                }
                Ok(Err(e)) => {
                    debug!("reachability lookup failed target={}: {}", target, e);
                    PathStatus::Unsatisfied
                }
                Err(_) => {
                    debug!("reachability lookup timed out target={}", target);
                    PathStatus::Unsatisfied
                }
            };
            // Receiver may already be gone.
            let _ = tx.send(status).await;
        });
        rx
    }
}

/// Reports a fixed status. Remembers its latest listener so callers can
/// confirm that it was released.
pub struct StaticPathMonitor {
    status: PathStatus,
    listener: Mutex<Option<mpsc::Sender<PathStatus>>>,
}

impl StaticPathMonitor {
    pub fn new(status: PathStatus) -> Self {
        Self {
            status,
            listener: Mutex::new(None),
        }
    }

    pub fn satisfied() -> Self {
        Self::new(PathStatus::Satisfied)
    }

    pub fn unsatisfied() -> Self {
        Self::new(PathStatus::Unsatisfied)
    }

    /// Whether a listener is still registered.
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }
}

impl PathMonitor for StaticPathMonitor {
    fn start(&self) -> mpsc::Receiver<PathStatus> {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(self.status);
        *self.listener.lock() = Some(tx);
        rx
    }
}
