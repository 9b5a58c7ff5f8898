// Single-writer display decision observed by the presentation layer.

use tokio::sync::watch;
use tracing::debug;

/// What the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMode {
    Loading,
    Basic,
    Enhanced(String),
}

impl DisplayMode {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DisplayMode::Loading)
    }
}

/// Owned by the engine; observers hold receivers from [`DisplayPublisher::subscribe`].
pub struct DisplayPublisher {
    tx: watch::Sender<DisplayMode>,
}

impl DisplayPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DisplayMode::Loading);
        Self { tx }
    }

    /// Start a fresh resolution run.
    pub(crate) fn begin(&self) {
        self.tx.send_replace(DisplayMode::Loading);
    }

    /// Publish a terminal decision. `Loading` is never accepted here.
    pub(crate) fn publish(&self, mode: DisplayMode) {
        if !mode.is_terminal() {
            debug!("ignoring attempt to publish loading as a decision");
            return;
        }
        debug!("display mode published mode={:?}", mode);
        self.tx.send_replace(mode);
    }

    pub fn current(&self) -> DisplayMode {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayMode> {
        self.tx.subscribe()
    }

    /// Wait until the current run reaches a terminal decision.
    pub async fn wait_for_decision(&self) -> DisplayMode {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let decision = match rx.wait_for(DisplayMode::is_terminal).await {
            Ok(mode) => mode.clone(),
            Err(_) => self.current(),
        };
        decision
    }
}

impl Default for DisplayPublisher {
    fn default() -> Self {
        Self::new()
    }
}
