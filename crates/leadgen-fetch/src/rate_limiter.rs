use crate::host::normalize_host;
use leadgen_core::RateLimitConfig;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Per-host minimum-interval limiter.
///
/// `acquire` reserves the next free slot for a host while holding the table
/// lock and only then sleeps, so concurrent callers for one host are granted
/// slots that are always at least `min_interval` apart.
#[derive(Debug)]
pub struct HostRateLimiter {
    min_interval: Duration,
    idle_ttl: Duration,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    last_grant: HashMap<String, Instant>,
    last_sweep: Instant,
}

impl LimiterState {
    fn sweep(&mut self, now: Instant, idle_ttl: Duration) {
        if now.saturating_duration_since(self.last_sweep) < idle_ttl {
            return;
        }
        let before = self.last_grant.len();
        self.last_grant
            .retain(|_, last| now.saturating_duration_since(*last) < idle_ttl);
        self.last_sweep = now;
        let evicted = before - self.last_grant.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.last_grant.len(), "evicted idle hosts");
        }
    }
}

impl HostRateLimiter {
    pub fn new(min_interval: Duration, idle_ttl: Duration) -> Self {
        Self {
            min_interval,
            idle_ttl,
            state: Mutex::new(LimiterState {
                last_grant: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_interval_ms),
            Duration::from_secs(config.idle_eviction_secs),
        )
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request to `host` is allowed, then return the granted instant.
    pub async fn acquire(&self, host: &str) -> Instant {
        let key = normalize_host(host);
        let grant = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            state.sweep(now, self.idle_ttl);

            let grant = match state.last_grant.get(&key) {
                Some(last) => (*last + self.min_interval).max(now),
                None => now,
            };
            state.last_grant.insert(key.clone(), grant);
            grant
        };

        let now = Instant::now();
        if grant > now {
            tracing::debug!(
                host = %key,
                wait_ms = u64::try_from((grant - now).as_millis()).unwrap_or(u64::MAX),
                "throttling request"
            );
            tokio::time::sleep_until(grant).await;
        }
        grant
    }

    /// Number of hosts currently tracked.
    pub async fn tracked_hosts(&self) -> usize {
        self.state.lock().await.last_grant.len()
    }
}

impl Default for HostRateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
