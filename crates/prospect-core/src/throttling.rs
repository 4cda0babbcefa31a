use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::source_policy::SourcePolicy;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Minimum spacing between successive calls to one source.
///
/// Calls to different sources are never serialized against each other; each
/// source owns its throttle. A zero spacing disables throttling.
#[derive(Clone)]
pub struct Throttle {
    limiter: Option<Arc<DirectRateLimiter>>,
    min_spacing: Duration,
}

impl Throttle {
    pub fn new(min_spacing: Duration) -> Self {
        let limiter =
            quota_for_spacing(min_spacing).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self {
            limiter,
            min_spacing,
        }
    }

    pub fn from_policy(policy: &SourcePolicy) -> Self {
        Self::new(policy.min_spacing())
    }

    /// Waits until the next call slot is available.
    pub async fn until_ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("min_spacing", &self.min_spacing)
            .finish()
    }
}

fn quota_for_spacing(min_spacing: Duration) -> Option<Quota> {
    let burst = NonZeroU32::new(1)?;
    Quota::with_period(min_spacing).map(|quota| quota.allow_burst(burst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn zero_spacing_never_blocks() {
        let throttle = Throttle::new(Duration::ZERO);
        let started = Instant::now();

        for _ in 0..100 {
            throttle.until_ready().await;
        }

        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn until_ready_enforces_spacing() {
        let throttle = Throttle::new(Duration::from_millis(40));
        let started = Instant::now();

        throttle.until_ready().await;
        throttle.until_ready().await;
        throttle.until_ready().await;

        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn clones_share_the_same_slot() {
        let throttle = Throttle::new(Duration::from_millis(60));
        let clone = throttle.clone();
        let started = Instant::now();

        throttle.until_ready().await;
        clone.until_ready().await;

        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
