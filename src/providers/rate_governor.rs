use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::utils::clock::Clock;

/// Outcome of asking the governor for a request slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Go ahead after waiting `wait`
    Proceed { wait: Duration },
    /// The window quota is used up
    Exhausted,
}

struct GovernorState {
    last_request: Option<DateTime<Utc>>,
    window_start: DateTime<Utc>,
    count: u32,
}

/// Keeps REST price calls under the upstream free-tier quota
///
/// Two rules: consecutive requests are spaced by at least `min_interval`,
/// and at most `max_requests` are admitted per `window`.
pub struct RateGovernor {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    max_requests: u32,
    window: Duration,
    state: Mutex<GovernorState>,
}

impl RateGovernor {
    pub fn new(clock: Arc<dyn Clock>, min_interval: Duration, max_requests: u32, window: Duration) -> Self {
        let now = clock.now();
        Self {
            clock,
            min_interval,
            max_requests,
            window,
            state: Mutex::new(GovernorState {
                last_request: None,
                window_start: now,
                count: 0,
            }),
        }
    }

    /// 1.1s spacing, 100 requests per minute
    pub fn free_tier(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Duration::from_millis(1100), 100, Duration::from_secs(60))
    }

    /// Keyed plans allow 500 requests per minute, so slots are 120ms apart
    pub fn keyed(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Duration::from_millis(120), 500, Duration::from_secs(60))
    }

    /// Quota matching the configured upstream plan
    pub fn for_plan(clock: Arc<dyn Clock>, has_api_key: bool) -> Self {
        if has_api_key {
            Self::keyed(clock)
        } else {
            Self::free_tier(clock)
        }
    }

    /// Reserve a request slot
    pub fn admit(&self) -> Admission {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let window = chrono::Duration::from_std(self.window).unwrap_or_else(|_| chrono::Duration::days(365));
        if now - state.window_start >= window {
            state.window_start = now;
            state.count = 0;
        }

        if state.count >= self.max_requests {
            return Admission::Exhausted;
        }
        state.count += 1;

        // a queued slot may already lie in the future
        let spacing = chrono::Duration::from_std(self.min_interval).unwrap_or_else(|_| chrono::Duration::zero());
        let starts_at = state.last_request.map_or(now, |last| (last + spacing).max(now));
        let wait = (starts_at - now).to_std().unwrap_or(Duration::ZERO);
        state.last_request = Some(starts_at);

        Admission::Proceed { wait }
    }

    /// Requests left in the current window
    pub fn remaining(&self) -> u32 {
        let state = self.state.lock();
        self.max_requests.saturating_sub(state.count)
    }
}
