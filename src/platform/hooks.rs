use tracing::debug;

/// Launch events reported to the analytics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchEvent {
    /// The basic experience was activated.
    OnboardingLaunch,
    /// Enhanced content was published.
    EnhancedLaunch,
}

pub trait EventSink: Send + Sync {
    fn track(&self, event: LaunchEvent);
}

/// Requests the platform's store-review prompt.
pub trait ReviewPrompter: Send + Sync {
    fn request_review(&self);
}

pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn track(&self, event: LaunchEvent) {
        debug!("analytics disabled, dropping event={:?}", event);
    }
}

pub struct NoopPrompter;

impl ReviewPrompter for NoopPrompter {
    fn request_review(&self) {
        debug!("review prompt requested with no prompter attached");
    }
}
