//! Sequential pacing for bulk calls against rate-limited external services.
//!
//! Bulk operations that fan out to a per-tenant-limited service (for
//! example resetting many users' credentials with an identity provider)
//! must not run in parallel. They run one call at a time with a growing
//! pause between calls: start small, add a fixed step after each call,
//! never exceed the cap.

use log::debug;
use std::time::Duration;

/// Pause schedule between consecutive calls of one bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialBackoff {
    /// Pause after the first call.
    pub initial_delay: Duration,
    /// Added to the pause after every call.
    pub increment: Duration,
    /// Upper bound for any single pause.
    pub max_delay: Duration,
}

impl Default for SequentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            increment: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl SequentialBackoff {
    /// Pause to wait after the call at zero-based position `call_index`.
    pub fn delay_after(&self, call_index: u32) -> Duration {
        self.increment
            .checked_mul(call_index)
            .and_then(|step| self.initial_delay.checked_add(step))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Runs `call` once per item, strictly in order, sleeping between
    /// calls. Failures do not stop the run; every outcome is returned in
    /// item order.
    pub fn run<I, R, E>(
        &self,
        items: impl IntoIterator<Item = I>,
        call: impl FnMut(I) -> Result<R, E>,
    ) -> Vec<Result<R, E>> {
        self.run_with_sleep(items, call, std::thread::sleep)
    }

    /// Same as [`SequentialBackoff::run`] with an injectable sleeper.
    pub fn run_with_sleep<I, R, E>(
        &self,
        items: impl IntoIterator<Item = I>,
        mut call: impl FnMut(I) -> Result<R, E>,
        mut sleep: impl FnMut(Duration),
    ) -> Vec<Result<R, E>> {
        let mut outcomes = Vec::new();
        let mut call_index: u32 = 0;
        for item in items {
            if call_index > 0 {
                let delay = self.delay_after(call_index - 1);
                debug!(
                    "event=throttle_wait module=throttle status=ok call_index={} delay_ms={}",
                    call_index,
                    delay.as_millis()
                );
                sleep(delay);
            }
            outcomes.push(call(item));
            call_index = call_index.saturating_add(1);
        }
        outcomes
    }
}
