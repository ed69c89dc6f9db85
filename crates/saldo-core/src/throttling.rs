//! Request-rate throttle for the REST adapter.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared request throttle honoring a `quota_limit` requests per
/// `quota_window` budget, with bursts up to the full budget.
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Arc<DirectRateLimiter>,
}

impl RequestThrottle {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota(quota_window, quota_limit))),
        }
    }

    /// Whether budget is available right now, without consuming it on failure.
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait until rate budget is available, then consume one cell.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

fn quota(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit is non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .expect("period is always greater than zero")
        .allow_burst(burst)
}
