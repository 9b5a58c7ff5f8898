use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{ACCESS_COUNT_KEY, REVIEW_PROMPT_ACCESS_COUNT};
use crate::platform::hooks::ReviewPrompter;
use crate::store::traits::KeyValueStore;

/// Counts enhanced activations and schedules the one-time review request.
pub struct AccessTracker {
    store: Arc<dyn KeyValueStore>,
    prompter: Arc<dyn ReviewPrompter>,
    prompt_delay: Duration,
}

impl AccessTracker {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        prompter: Arc<dyn ReviewPrompter>,
        prompt_delay: Duration,
    ) -> Self {
        Self {
            store,
            prompter,
            prompt_delay,
        }
    }

    /// Increment the access count and return the new value. The call that
    /// moves the count to exactly 2 schedules the review request after the
    /// prompt delay; no other call does.
    pub fn record(&self) -> i64 {
        let count = self.store.get_int(ACCESS_COUNT_KEY) + 1;
        self.store.set_int(ACCESS_COUNT_KEY, count);
        info!("enhanced access count={}", count);

        if count == REVIEW_PROMPT_ACCESS_COUNT {
            info!("scheduling review prompt access={}", count);
            let prompter = self.prompter.clone();
            let delay = self.prompt_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                prompter.request_review();
            });
        }
        count
    }
}
