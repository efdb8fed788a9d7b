//! Rate limiter for the Jikan API.
//!
//! Enforces both per-second and per-minute sliding windows, plus a cool-down
//! deadline that is set whenever the server answers with HTTP 429.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use yamal_shared::config::RateLimitConfig;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);

/// Admission policy for a [`RateLimiter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum calls admitted in any trailing second
    pub per_second: u32,
    /// Maximum calls admitted in any trailing minute
    pub per_minute: u32,
    /// Cool-down used when a 429 carries no Retry-After
    pub fallback_cooldown: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            per_second: 3,
            per_minute: 60,
            fallback_cooldown: Duration::from_secs(5),
        }
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            per_second: config.requests_per_second.max(1),
            per_minute: config.requests_per_minute.max(1),
            fallback_cooldown: Duration::from_secs(config.cooldown_seconds),
        }
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    /// Admission timestamps of the last minute, oldest first
    recent: VecDeque<Instant>,
    /// No admissions before this instant
    cooldown_until: Option<Instant>,
    /// Calls admitted since creation
    admitted: u64,
}

impl LimiterState {
    fn prune(&mut self, now: Instant) {
        while self
            .recent
            .front()
            .is_some_and(|&t| now.duration_since(t) >= MINUTE)
        {
            self.recent.pop_front();
        }
    }

    fn count_within(&self, now: Instant, window: Duration) -> usize {
        self.recent
            .iter()
            .rev()
            .take_while(|&&t| now.duration_since(t) < window)
            .count()
    }

    /// Time until one more call fits every constraint, `None` if it fits now
    fn wait_time(&self, now: Instant, policy: &RateLimitPolicy) -> Option<Duration> {
        let cooldown = self
            .cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default();

        let wait = [
            Some(cooldown),
            self.window_wait(now, SECOND, policy.per_second),
            self.window_wait(now, MINUTE, policy.per_minute),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or_default();

        (!wait.is_zero()).then_some(wait)
    }

    fn window_wait(&self, now: Instant, window: Duration, limit: u32) -> Option<Duration> {
        let limit = limit as usize;
        let count = self.count_within(now, window);
        if count < limit {
            return None;
        }

        // Admission needs `count - limit + 1` entries to leave the window;
        // the last of those sits `limit` places from the back.
        let blocker = self.recent[self.recent.len() - limit];
        Some(window.saturating_sub(now.duration_since(blocker)))
    }
}

/// Rate limiter with dual constraints (per-second and per-minute) and a
/// server-driven cool-down.
///
/// Shared between tasks behind an `Arc`; every mutation happens under one
/// lock that is never held across a sleep, so dropping a pending
/// [`acquire`](Self::acquire) leaves no trace.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// Zero limits are raised to one call per window.
    pub fn new(policy: RateLimitPolicy) -> Self {
        let policy = RateLimitPolicy {
            per_second: policy.per_second.max(1),
            per_minute: policy.per_minute.max(1),
            ..policy
        };

        Self {
            policy,
            state: Mutex::new(LimiterState {
                recent: VecDeque::with_capacity(policy.per_minute as usize),
                ..LimiterState::default()
            }),
        }
    }

    /// The policy this limiter enforces
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Wait until a request can be made, respecting both windows and any cool-down
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                state.prune(now);

                match state.wait_time(now, &self.policy) {
                    None => {
                        state.recent.push_back(now);
                        state.admitted += 1;
                        return;
                    }
                    Some(wait) => wait,
                }
            };

            debug!(wait_ms = wait.as_millis() as u64, "Rate limit: waiting");
            sleep(wait).await;
        }
    }

    /// Record an HTTP 429 from upstream.
    ///
    /// Blocks admissions for `retry_after_seconds`, or the policy fallback
    /// when the server gave none. An earlier, longer deadline is kept.
    pub async fn report_rate_limited(&self, retry_after_seconds: Option<u64>) {
        let backoff = retry_after_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.policy.fallback_cooldown);

        let mut state = self.state.lock().await;
        let deadline = Instant::now() + backoff;
        if state.cooldown_until.map_or(true, |current| deadline > current) {
            state.cooldown_until = Some(deadline);
        }

        warn!(
            backoff_ms = backoff.as_millis() as u64,
            "Rate limited by server, cooling down"
        );
    }

    /// Remaining cool-down, zero when none is active
    pub async fn cooldown_remaining(&self) -> Duration {
        let state = self.state.lock().await;
        state
            .cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    /// Get the current number of requests in the last second
    pub async fn current_second_count(&self) -> usize {
        let state = self.state.lock().await;
        state.count_within(Instant::now(), SECOND)
    }

    /// Get the current number of requests in the last minute
    pub async fn current_minute_count(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.prune(now);
        state.recent.len()
    }

    /// Total calls admitted since creation
    pub async fn total_admitted(&self) -> u64 {
        self.state.lock().await.admitted
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}
